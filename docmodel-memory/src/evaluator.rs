//! Query expression evaluation for in-memory record filtering.
//!
//! This module provides the evaluation engine for query expressions,
//! enabling filtering and comparison operations on records held in memory.

use std::{cmp::Ordering, collections::HashMap};

use bson::{Bson, datetime::DateTime};

use docmodel_core::{
    document::RawRecord,
    error::{DocumentError, DocumentResult},
    query::{Expr, FieldOp, QueryVisitor, Sort, SortDirection},
};

/// Type-erased, comparable representation of BSON values.
///
/// Numeric types are normalized to f64 so that `Int32(3)` equals `Double(3.0)`.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    DateTime(DateTime),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(f64::from(*value)),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(arr) => Comparable::Array(arr.iter().map(Comparable::from).collect()),
            Bson::Document(doc) => Comparable::Map(
                doc.iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect(),
            ),
            // Other types are not comparable
            _ => Comparable::Null,
        }
    }
}

impl PartialEq for Comparable<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for Comparable<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Resolves a dotted path (`address.city`, `items.0.sku`) inside a record.
pub(crate) fn lookup<'a>(record: &'a RawRecord, path: &str) -> Option<&'a Bson> {
    if let Some(value) = record.get(path) {
        return Some(value);
    }

    let mut segments = path.split('.');
    let mut current = record.get(segments.next()?)?;

    for segment in segments {
        current = match current {
            Bson::Document(doc) => doc.get(segment)?,
            Bson::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

/// Orders two records by the given sort keys. Records missing a sort field
/// come first in ascending order.
pub(crate) fn compare_records(left: &RawRecord, right: &RawRecord, sort: &[Sort]) -> Ordering {
    for key in sort {
        let ordering = match (lookup(left, &key.field), lookup(right, &key.field)) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => Comparable::from(a)
                .partial_cmp(&Comparable::from(b))
                .unwrap_or(Ordering::Equal),
        };

        let ordering = match key.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };

        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}

pub(crate) struct RecordEvaluator<'a> {
    record: &'a RawRecord,
}

impl<'a> RecordEvaluator<'a> {
    pub fn new(record: &'a RawRecord) -> Self {
        Self { record }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> DocumentResult<bool> {
        self.visit_expr(expr)
    }

    /// True when `record` satisfies `filter`; an absent filter matches everything.
    pub fn matches(record: &RawRecord, filter: Option<&Expr>) -> DocumentResult<bool> {
        match filter {
            Some(expr) => RecordEvaluator::new(record).evaluate(expr),
            None => Ok(true),
        }
    }
}

/// Applies a string test to `value`, or to each string element when
/// `value` is an array.
fn matches_text<'a>(value: &Comparable<'a>, needle: &Comparable<'a>, test: fn(&str, &str) -> bool) -> bool {
    match (value, needle) {
        (Comparable::Array(items), Comparable::String(_)) => items
            .iter()
            .any(|item| matches_text(item, needle, test)),
        (Comparable::String(left), Comparable::String(right)) => test(left, right),
        _ => false,
    }
}

/// Substring match for string needles, element equality otherwise.
fn contains<'a>(haystack: &Comparable<'a>, needle: &Comparable<'a>) -> bool {
    match (haystack, needle) {
        (_, Comparable::String(_)) => matches_text(haystack, needle, |left, right| left.contains(right)),
        (Comparable::Array(items), needle) => items.iter().any(|item| item == needle),
        _ => false,
    }
}

fn any_of<'a>(field_value: &Comparable<'a>, values: &Comparable<'a>) -> bool {
    match (field_value, values) {
        (Comparable::Array(items), Comparable::Array(values)) => {
            values.iter().any(|value| items.contains(value))
        }
        (Comparable::Array(items), single) => items.contains(single),
        (single, Comparable::Array(values)) => values.contains(single),
        (left, right) => left == right,
    }
}

impl QueryVisitor for RecordEvaluator<'_> {
    type Output = bool;
    type Error = DocumentError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if self.visit_expr(expr)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_expr(expr)?)
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(lookup(self.record, field).is_some() == should_exist)
    }

    fn visit_field(&mut self, field: &str, op: FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let Some(field_value) = lookup(self.record, field) else {
            // Negative operators match records that lack the field.
            return Ok(matches!(op, FieldOp::Ne | FieldOp::NotContains | FieldOp::NoneOf));
        };

        let left = Comparable::from(field_value);
        let right = Comparable::from(value);

        Ok(match op {
            FieldOp::Eq => left == right,
            FieldOp::Ne => left != right,
            FieldOp::Gt => left.partial_cmp(&right) == Some(Ordering::Greater),
            FieldOp::Gte => matches!(left.partial_cmp(&right), Some(Ordering::Greater | Ordering::Equal)),
            FieldOp::Lt => left.partial_cmp(&right) == Some(Ordering::Less),
            FieldOp::Lte => matches!(left.partial_cmp(&right), Some(Ordering::Less | Ordering::Equal)),
            FieldOp::Contains => contains(&left, &right),
            FieldOp::NotContains => !contains(&left, &right),
            FieldOp::StartsWith => matches_text(&left, &right, |left, right| left.starts_with(right)),
            FieldOp::EndsWith => matches_text(&left, &right, |left, right| left.ends_with(right)),
            FieldOp::AnyOf => any_of(&left, &right),
            FieldOp::NoneOf => !any_of(&left, &right),
        })
    }

    fn visit_raw(&mut self, _query: &Bson) -> Result<Self::Output, Self::Error> {
        Err(DocumentError::UnsupportedQuery(
            "raw queries are not supported by the in-memory driver".to_string(),
        ))
    }
}
