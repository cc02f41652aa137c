//! Convenient re-exports of commonly used types from docmodel.
//!
//! ```ignore
//! use docmodel::prelude::*;
//! ```

pub use docmodel_core::{
    diff::{ChangeSet, ChangeStatus, FieldChange},
    document::{Document, RawRecord},
    driver::{Bucket, Driver, DriverBuilder, IndexSpec, Key, StoredRecord},
    error::{DocumentError, DocumentResult, ValidationErrors},
    model::{DynamicField, Hooks, Model, ModelBuilder},
    page::Page,
    query::{Expr, Field, FieldOp, Query, QueryBuilder, QueryVisitor, Sort, SortDirection},
    schema::{FieldConstraint, FieldType, Schema, SchemaBuilder, Transformer},
};
