//! Error types and result types for document operations.
//!
//! Every fallible operation in the workspace returns [`DocumentResult<T>`].
//! Field-access and validation errors are raised locally before any I/O;
//! driver failures carry the backend's own message verbatim.

use std::{collections::BTreeMap, fmt};

use bson::error::Error as BsonError;
use serde::Serialize;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors raised by documents, models and drivers.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// A field outside the schema (and outside the model's dynamic fields) was read or written.
    #[error("Field `{0}` is not declared")]
    FieldNotDeclared(String),
    /// The record failed schema validation. Carries one reason per offending field.
    #[error("Validation failed: {0}")]
    ValidationFailed(ValidationErrors),
    /// The requested record does not exist.
    /// The first argument is the key, the second is the bucket name.
    #[error("Document {0} not found in bucket {1}")]
    NotFound(String, String),
    /// A record with the given key already exists in the bucket.
    #[error("Document {0} already exists in bucket {1}")]
    AlreadyExists(String, String),
    /// The operation needs a persisted document but no key is assigned.
    #[error("Document has no primary key")]
    MissingPrimaryKey,
    /// The primary-key field was overwritten in memory on a persisted document.
    #[error("Primary key field `{0}` cannot be modified")]
    PrimaryKeyModified(String),
    /// The document was deleted and can no longer be used.
    #[error("Document has been deleted")]
    Detached,
    /// A computed field was written to.
    #[error("Field `{0}` is read-only")]
    ReadOnlyField(String),
    /// A lifecycle hook refused the operation.
    #[error("Hook aborted operation: {0}")]
    Hook(String),
    /// The schema or model definition is inconsistent.
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),
    /// The driver cannot execute the given query.
    #[error("Unsupported query: {0}")]
    UnsupportedQuery(String),
    /// An error reported by the backing store.
    #[error("Driver error: {0}")]
    DriverFailure(String),
    /// Serialization/deserialization error when converting between BSON, JSON and Rust types.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during driver initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
}

/// A specialized `Result` type for document operations.
pub type DocumentResult<T> = Result<T, DocumentError>;

impl From<BsonError> for DocumentError {
    fn from(err: BsonError) -> Self {
        DocumentError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentError::Serialization(err.to_string())
    }
}

impl From<ValidationErrors> for DocumentError {
    fn from(errors: ValidationErrors) -> Self {
        DocumentError::ValidationFailed(errors)
    }
}

/// Field-indexed validation failures.
///
/// Nested fields are addressed with dotted paths (`address.city`, `items.0.sku`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Records a reason for `field`. The first reason recorded for a field wins.
    pub fn insert(&mut self, field: impl Into<String>, reason: impl Into<String>) {
        self.0
            .entry(field.into())
            .or_insert_with(|| reason.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .map(|(field, reason)| (field.as_str(), reason.as_str()))
    }

    /// Drops the reason recorded for `field`, returning it.
    pub fn remove(&mut self, field: &str) -> Option<String> {
        self.0.remove(field)
    }

    /// Converts into `Ok(())` when empty, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, reason) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {reason}")?;
            first = false;
        }
        Ok(())
    }
}

impl FromIterator<(String, String)> for ValidationErrors {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut errors = ValidationErrors::new();
        for (field, reason) in iter {
            errors.insert(field, reason);
        }
        errors
    }
}
