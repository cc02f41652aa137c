//! Query specifications passed through to drivers.
//!
//! A [`Query`] is a filter expression plus sort keys. Paging is not part of
//! the query; it is supplied to `find_limit` directly. Drivers translate the
//! expression tree with a [`QueryVisitor`], and [`Expr::Raw`] lets callers hand
//! a backend-native query through untouched.
//!
//! # Example
//!
//! ```ignore
//! use docmodel::query::{Query, Field, SortDirection};
//!
//! let query = Query::builder()
//!     .filter(Field::new("status").eq("active").and(Field::new("age").gte(18)))
//!     .sort("created_at", SortDirection::Desc)
//!     .build();
//! ```

use bson::Bson;

use crate::error::DocumentError;

/// Sort direction for query results and index keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// One sort key.
#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

/// Field comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    /// String contains substring, or array contains element.
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    /// Field value (or any of its elements) is one of the given values.
    AnyOf,
    /// Field value (and all of its elements) is none of the given values.
    NoneOf,
}

/// A filter expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    /// Field presence check; `true` matches records that have the field.
    Exists(String, bool),
    Field {
        field: String,
        op: FieldOp,
        value: Bson,
    },
    /// A backend-native query passed to the driver verbatim.
    Raw(Bson),
}

impl Expr {
    /// Combines with `other` using logical AND, flattening nested ANDs.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut list) => {
                list.push(other);
                Expr::And(list)
            }
            _ => Expr::And(vec![self, other]),
        }
    }

    /// Combines with `other` using logical OR, flattening nested ORs.
    pub fn or(self, other: Expr) -> Self {
        match self {
            Expr::Or(mut list) => {
                list.push(other);
                Expr::Or(list)
            }
            _ => Expr::Or(vec![self, other]),
        }
    }

    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }

    pub fn all(exprs: impl IntoIterator<Item = Expr>) -> Self {
        Expr::And(exprs.into_iter().collect())
    }

    pub fn any(exprs: impl IntoIterator<Item = Expr>) -> Self {
        Expr::Or(exprs.into_iter().collect())
    }

    pub fn raw(query: impl Into<Bson>) -> Self {
        Expr::Raw(query.into())
    }
}

/// Builds field expressions: `Field::new("age").gt(18)`.
///
/// Dotted names address nested fields (`address.city`).
#[derive(Debug, Clone)]
pub struct Field(String);

impl Field {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    fn op(self, op: FieldOp, value: impl Into<Bson>) -> Expr {
        Expr::Field { field: self.0, op, value: value.into() }
    }

    pub fn eq(self, value: impl Into<Bson>) -> Expr {
        self.op(FieldOp::Eq, value)
    }

    pub fn ne(self, value: impl Into<Bson>) -> Expr {
        self.op(FieldOp::Ne, value)
    }

    pub fn gt(self, value: impl Into<Bson>) -> Expr {
        self.op(FieldOp::Gt, value)
    }

    pub fn gte(self, value: impl Into<Bson>) -> Expr {
        self.op(FieldOp::Gte, value)
    }

    pub fn lt(self, value: impl Into<Bson>) -> Expr {
        self.op(FieldOp::Lt, value)
    }

    pub fn lte(self, value: impl Into<Bson>) -> Expr {
        self.op(FieldOp::Lte, value)
    }

    pub fn contains(self, value: impl Into<Bson>) -> Expr {
        self.op(FieldOp::Contains, value)
    }

    pub fn not_contains(self, value: impl Into<Bson>) -> Expr {
        self.op(FieldOp::NotContains, value)
    }

    pub fn starts_with(self, value: impl Into<String>) -> Expr {
        self.op(FieldOp::StartsWith, value.into())
    }

    pub fn ends_with(self, value: impl Into<String>) -> Expr {
        self.op(FieldOp::EndsWith, value.into())
    }

    pub fn any_of<V: Into<Bson>>(self, values: impl IntoIterator<Item = V>) -> Expr {
        self.op(FieldOp::AnyOf, collect_array(values))
    }

    pub fn none_of<V: Into<Bson>>(self, values: impl IntoIterator<Item = V>) -> Expr {
        self.op(FieldOp::NoneOf, collect_array(values))
    }

    pub fn exists(self) -> Expr {
        Expr::Exists(self.0, true)
    }

    pub fn missing(self) -> Expr {
        Expr::Exists(self.0, false)
    }
}

fn collect_array<V: Into<Bson>>(values: impl IntoIterator<Item = V>) -> Bson {
    Bson::Array(values.into_iter().map(Into::into).collect())
}

/// A filter plus sort keys. An empty query matches every record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filter: Option<Expr>,
    pub sort: Vec<Sort>,
}

impl Query {
    /// Matches every record.
    pub fn all() -> Self {
        Self::default()
    }

    /// Matches records satisfying `filter`.
    pub fn filter(filter: Expr) -> Self {
        Self { filter: Some(filter), sort: Vec::new() }
    }

    pub fn builder() -> QueryBuilder {
        QueryBuilder::default()
    }
}

impl From<Expr> for Query {
    fn from(filter: Expr) -> Self {
        Query::filter(filter)
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    /// Sets the filter, AND-ing it with any filter already present.
    pub fn filter(mut self, filter: Expr) -> Self {
        self.query.filter = Some(match self.query.filter.take() {
            Some(existing) => existing.and(filter),
            None => filter,
        });
        self
    }

    /// Appends a sort key. Earlier keys take precedence.
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.query.sort.push(Sort { field: field.into(), direction });
        self
    }

    pub fn build(self) -> Query {
        self.query
    }
}

/// Translation seam for drivers: walks an [`Expr`] tree and produces a
/// backend-specific output (a native query document, a match result, ...).
pub trait QueryVisitor {
    type Output;
    type Error: Into<DocumentError>;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error>;
    fn visit_exists(
        &mut self,
        field: &str,
        should_exist: bool,
    ) -> Result<Self::Output, Self::Error>;
    fn visit_field(
        &mut self,
        field: &str,
        op: FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error>;
    fn visit_raw(&mut self, query: &Bson) -> Result<Self::Output, Self::Error>;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::Or(exprs) => self.visit_or(exprs),
            Expr::Not(expr) => self.visit_not(expr),
            Expr::Exists(field, should_exist) => self.visit_exists(field, *should_exist),
            Expr::Field { field, op, value } => self.visit_field(field, *op, value),
            Expr::Raw(query) => self.visit_raw(query),
        }
    }
}
