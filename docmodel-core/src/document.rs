//! Schema-bound documents and their persistence lifecycle.
//!
//! A [`Document`] wraps an open [`RawRecord`] and guards access to it through
//! the schema of the [`Model`] it came from. It keeps two copies of the
//! record: `current`, which accessors read and write, and `original`, the
//! last version the store confirmed. Saving sends only the difference
//! between the two, so fields nobody touched are never overwritten.
//!
//! Fields the schema does not declare are still carried in the record. They
//! are unreachable through [`Document::get`] and [`Document::set`], but they
//! are preserved across loads and saves and reachable through
//! [`Document::raw`].
//!
//! # Example
//!
//! ```ignore
//! let mut user = users.create();
//! user.set("name", "Marco")?;
//! user.set("email", "marco@example.com")?;
//! user.save().await?;
//!
//! user.set("name", "Marco P.")?;
//! assert_eq!(user.changes().len(), 1);
//! user.save().await?; // sends only `name`
//! ```

use bson::{Bson, de::deserialize_from_bson};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::{
    diff::{ChangeSet, diff},
    driver::Key,
    error::{DocumentError, DocumentResult, ValidationErrors},
    model::{DynamicField, Model},
};

/// The open record type shared by documents and drivers.
///
/// Field order is preserved, and values are arbitrary BSON, including
/// nested documents and arrays.
pub type RawRecord = bson::Document;

/// A single record bound to a model.
#[derive(Debug, Clone)]
pub struct Document {
    model: Model,
    current: RawRecord,
    original: RawRecord,
    key: Option<Key>,
    detached: bool,
}

impl Document {
    /// An unsaved document. `original` starts empty.
    pub(crate) fn new(model: Model, record: RawRecord) -> Self {
        Self {
            model,
            current: record,
            original: RawRecord::new(),
            key: None,
            detached: false,
        }
    }

    /// A document loaded from the store under `key`.
    pub(crate) fn loaded(model: Model, key: Key, record: RawRecord) -> Self {
        Self {
            model,
            original: record.clone(),
            current: record,
            key: Some(key),
            detached: false,
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// The key assigned by the store, once the document has been saved or loaded.
    pub fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    /// True until the first successful save.
    pub fn is_new(&self) -> bool {
        self.key.is_none() && !self.detached
    }

    /// True after a successful [`Document::delete`].
    pub fn is_detached(&self) -> bool {
        self.detached
    }

    /// True when a save would reach the store.
    pub fn is_dirty(&self) -> bool {
        !self.detached && (self.key.is_none() || !self.changes().is_empty())
    }

    /// Difference between the last confirmed version and the in-memory one.
    pub fn changes(&self) -> ChangeSet {
        diff(&self.original, &self.current, self.model.bucket().primary_key())
    }

    /// The in-memory record, including undeclared fields.
    pub fn raw(&self) -> &RawRecord {
        &self.current
    }

    /// Mutable access to the in-memory record. Nothing is validated until
    /// the next save.
    pub fn raw_mut(&mut self) -> &mut RawRecord {
        &mut self.current
    }

    /// The last version the store confirmed. Empty for new documents.
    pub fn original(&self) -> &RawRecord {
        &self.original
    }

    fn ensure_attached(&self) -> DocumentResult<()> {
        if self.detached {
            Err(DocumentError::Detached)
        } else {
            Ok(())
        }
    }

    /// Validates `current` against the schema.
    ///
    /// A new document without a primary-key value passes the key field's
    /// checks, since the store assigns the key on the first save.
    fn validate(&self) -> DocumentResult<()> {
        let schema = self.model.schema();
        let Err(mut errors) = schema.validate(&self.current) else {
            return Ok(());
        };

        if self.key.is_none() {
            if let Some(primary_key) = schema.primary_key() {
                if !self.current.contains_key(primary_key) {
                    errors.remove(primary_key);
                }
            }
        }

        Ok(errors.into_result()?)
    }

    /// Reads a declared field, with its get transform applied.
    ///
    /// Returns `Ok(None)` when the field is declared but absent.
    pub fn get(&self, field: &str) -> DocumentResult<Option<Bson>> {
        self.ensure_attached()?;

        if let Some(dynamic) = self.model.dynamic_field(field) {
            return Ok(match dynamic {
                DynamicField::Stored(transformer) => self
                    .current
                    .get(field)
                    .map(|value| transformer.apply_get(value)),
                DynamicField::Validated(_) => self.current.get(field).cloned(),
                DynamicField::Computed(compute) => Some(compute(&self.current)),
            });
        }

        let schema = self.model.schema();
        if !schema.is_declared(field) {
            return Err(DocumentError::FieldNotDeclared(field.to_string()));
        }

        Ok(self
            .current
            .get(field)
            .map(|value| schema.apply_get_transform(field, value)))
    }

    /// Reads a declared field and deserializes it into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, field: &str) -> DocumentResult<Option<T>> {
        match self.get(field)? {
            Some(value) => Ok(Some(deserialize_from_bson(value)?)),
            None => Ok(None),
        }
    }

    /// Writes a declared field.
    ///
    /// The set transform runs first, then the field's constraints. On any
    /// error the record is left as it was.
    pub fn set(&mut self, field: &str, value: impl Into<Bson>) -> DocumentResult<()> {
        self.ensure_attached()?;
        let value = value.into();

        let stored = match self.model.dynamic_field(field) {
            Some(DynamicField::Stored(transformer)) => transformer.apply_set(value),
            Some(DynamicField::Validated(check)) => check(value).map_err(|reason| {
                let mut errors = ValidationErrors::new();
                errors.insert(field, reason);
                DocumentError::ValidationFailed(errors)
            })?,
            Some(DynamicField::Computed(_)) => {
                return Err(DocumentError::ReadOnlyField(field.to_string()));
            }
            None => {
                let schema = self.model.schema();
                if !schema.is_declared(field) {
                    return Err(DocumentError::FieldNotDeclared(field.to_string()));
                }

                let stored = schema.apply_set_transform(field, value);
                schema.validate_field(field, &stored)?;
                stored
            }
        };

        self.current.insert(field.to_string(), stored);
        Ok(())
    }

    /// Removes a declared field from the record and returns its stored value.
    pub fn unset(&mut self, field: &str) -> DocumentResult<Option<Bson>> {
        self.ensure_attached()?;

        match self.model.dynamic_field(field) {
            Some(DynamicField::Computed(_)) => {
                return Err(DocumentError::ReadOnlyField(field.to_string()));
            }
            Some(DynamicField::Stored(_) | DynamicField::Validated(_)) => {}
            None if self.model.schema().is_declared(field) => {}
            None => return Err(DocumentError::FieldNotDeclared(field.to_string())),
        }

        Ok(self.current.remove(field))
    }

    /// Declared fields with get transforms applied, followed by dynamic fields.
    pub fn view(&self) -> RawRecord {
        let schema = self.model.schema();
        let mut view = RawRecord::new();

        for field in schema.field_names() {
            if let Some(value) = self.current.get(field) {
                view.insert(field, schema.apply_get_transform(field, value));
            }
        }

        for (field, dynamic) in self.model.dynamic_fields() {
            match dynamic {
                DynamicField::Stored(transformer) => {
                    if let Some(value) = self.current.get(field) {
                        view.insert(field, transformer.apply_get(value));
                    }
                }
                DynamicField::Validated(_) => {
                    if let Some(value) = self.current.get(field) {
                        view.insert(field, value.clone());
                    }
                }
                DynamicField::Computed(compute) => {
                    view.insert(field, compute(&self.current));
                }
            }
        }

        view
    }

    /// Maps [`Document::view`] onto a serde type.
    pub fn deserialize<T: DeserializeOwned>(&self) -> DocumentResult<T> {
        Ok(deserialize_from_bson(Bson::Document(self.view()))?)
    }

    /// [`Document::view`] as JSON.
    pub fn to_json(&self) -> DocumentResult<Value> {
        Ok(serde_json::to_value(self.view())?)
    }

    /// Validates and persists the document.
    ///
    /// A new document is posted whole and adopts the key the store assigns.
    /// A persisted document sends only its changes; with no changes, the
    /// store is not contacted. `original` moves forward only once the store
    /// has confirmed the write, so a failed save can simply be retried.
    pub async fn save(&mut self) -> DocumentResult<()> {
        self.ensure_attached()?;
        let model = self.model.clone();

        for hook in model.hooks() {
            hook.will_save(self)?;
        }

        self.validate()?;

        let bucket = model.bucket();
        match self.key.clone() {
            None => {
                let key = model.driver().post(bucket, self.current.clone()).await?;

                debug!(bucket = bucket.name(), key = %key, "posted new document");

                if bucket.key_of(&self.current).is_none() {
                    bucket.inject_key(&mut self.current, &key);
                }
                self.key = Some(key);
                self.original = self.current.clone();
            }
            Some(key) => {
                let changes = self.changes();

                if changes.touches_primary_key() {
                    return Err(DocumentError::PrimaryKeyModified(
                        bucket.primary_key().unwrap_or_default().to_string(),
                    ));
                }

                if changes.is_empty() {
                    debug!(bucket = bucket.name(), key = %key, "no changes to save");
                } else {
                    model.driver().put(bucket, &key, &changes).await?;

                    debug!(bucket = bucket.name(), key = %key, fields = changes.len(), "updated document");

                    self.original = self.current.clone();
                }
            }
        }

        for hook in model.hooks() {
            hook.did_save(self)?;
        }

        Ok(())
    }

    /// Removes the document from the store and detaches it.
    ///
    /// Every later read, write or persistence call on this document fails
    /// with [`DocumentError::Detached`].
    pub async fn delete(&mut self) -> DocumentResult<()> {
        self.ensure_attached()?;
        let key = self.key.clone().ok_or(DocumentError::MissingPrimaryKey)?;

        self.model.driver().del(self.model.bucket(), &key).await?;

        debug!(bucket = self.model.bucket().name(), key = %key, "deleted document");

        self.key = None;
        self.detached = true;
        Ok(())
    }

    /// Applies an external patch and saves.
    ///
    /// Only fields on the model's updatable list are taken from `patch`;
    /// the rest are ignored. Either every accepted field is set or none is.
    pub async fn update(&mut self, patch: RawRecord) -> DocumentResult<()> {
        self.ensure_attached()?;
        let model = self.model.clone();
        let mut patch = patch;

        for hook in model.hooks() {
            hook.will_update(self, &mut patch)?;
        }

        let staged = self.current.clone();
        for (field, value) in patch {
            if !model.is_updatable(&field) {
                debug!(bucket = model.bucket().name(), field = %field, "ignoring non-updatable field");
                continue;
            }

            if let Err(err) = self.set(&field, value) {
                self.current = staged;
                return Err(err);
            }
        }

        self.save().await?;

        for hook in model.hooks() {
            hook.did_update(self)?;
        }

        Ok(())
    }
}
