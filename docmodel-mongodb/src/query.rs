//! Query translation from docmodel expressions to MongoDB query syntax.
//!
//! This module translates docmodel's abstract query expressions into
//! MongoDB BSON documents for execution by the MongoDB query engine.

use bson::{Bson, Document, doc};

use docmodel_core::{
    error::DocumentError,
    query::{Expr, FieldOp, QueryVisitor, Sort, SortDirection},
};

use crate::escape::KeyEscaper;

/// Translates docmodel query expressions into MongoDB filter documents.
pub(crate) struct MongoQueryTranslator;

impl MongoQueryTranslator {
    /// The filter document for an optional expression; no expression matches everything.
    pub(crate) fn filter(expr: Option<&Expr>) -> Result<Document, DocumentError> {
        match expr {
            Some(expr) => MongoQueryTranslator.visit_expr(expr),
            None => Ok(doc! {}),
        }
    }

    /// The sort document, or `None` when no sort keys are given.
    pub(crate) fn sort(sort: &[Sort]) -> Option<Document> {
        if sort.is_empty() {
            return None;
        }

        Some(
            sort.iter()
                .map(|key| {
                    let direction = match key.direction {
                        SortDirection::Asc => 1,
                        SortDirection::Desc => -1,
                    };
                    (KeyEscaper::escape_path(&key.field), Bson::Int32(direction))
                })
                .collect(),
        )
    }
}

/// Escapes regex metacharacters so a literal string can be embedded in a pattern.
fn escape_regex(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if "\\.^$|?*+()[]{}".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn as_array(value: &Bson) -> Bson {
    match value {
        Bson::Array(_) => value.clone(),
        other => Bson::Array(vec![other.clone()]),
    }
}

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = DocumentError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$and": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$or": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    // `$not` only applies to field operators; `$nor` negates whole expressions.
    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        let inner = self.visit_expr(expr)?;

        Ok(doc! {
            "$nor": [inner],
        })
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        let path = KeyEscaper::escape_path(field);

        Ok(doc! {
            path: { "$exists": should_exist },
        })
    }

    fn visit_field(&mut self, field: &str, op: FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let condition = match op {
            FieldOp::Eq => doc! { "$eq": value.clone() },
            FieldOp::Ne => doc! { "$ne": value.clone() },
            FieldOp::Gt => doc! { "$gt": value.clone() },
            FieldOp::Gte => doc! { "$gte": value.clone() },
            FieldOp::Lt => doc! { "$lt": value.clone() },
            FieldOp::Lte => doc! { "$lte": value.clone() },
            FieldOp::Contains => match value {
                Bson::String(s) => doc! { "$regex": escape_regex(s) },
                other => doc! { "$elemMatch": { "$eq": other.clone() } },
            },
            FieldOp::NotContains => match value {
                Bson::String(s) => doc! { "$not": { "$regex": escape_regex(s) } },
                other => doc! { "$not": { "$elemMatch": { "$eq": other.clone() } } },
            },
            FieldOp::StartsWith => match value {
                Bson::String(s) => doc! { "$regex": format!("^{}", escape_regex(s)) },
                _ => {
                    return Err(DocumentError::UnsupportedQuery(
                        "StartsWith operator requires a string value".to_string(),
                    ));
                }
            },
            FieldOp::EndsWith => match value {
                Bson::String(s) => doc! { "$regex": format!("{}$", escape_regex(s)) },
                _ => {
                    return Err(DocumentError::UnsupportedQuery(
                        "EndsWith operator requires a string value".to_string(),
                    ));
                }
            },
            FieldOp::AnyOf => doc! { "$in": as_array(value) },
            FieldOp::NoneOf => doc! { "$nin": as_array(value) },
        };

        let path = KeyEscaper::escape_path(field);

        Ok(doc! {
            path: condition,
        })
    }

    fn visit_raw(&mut self, query: &Bson) -> Result<Self::Output, Self::Error> {
        match query {
            Bson::Document(doc) => Ok(doc.clone()),
            other => Err(DocumentError::UnsupportedQuery(format!(
                "raw MongoDB queries must be documents, got {other}"
            ))),
        }
    }
}
