//! Models bind a schema, a bucket and a driver, and produce documents.
//!
//! A [`Model`] is a cheap, cloneable handle. One model typically serves many
//! documents; every document keeps a clone of the model it came from and
//! routes its persistence calls through the model's driver.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use docmodel::{prelude::*, memory::InMemoryDriver};
//!
//! let driver = Arc::new(InMemoryDriver::new());
//! let users = Model::builder(schema, "users", driver)
//!     .updatable(["name", "email"])
//!     .build()?;
//!
//! let mut user = users.create();
//! user.set("name", "Marco")?;
//! user.save().await?;
//!
//! let loaded = users.get(user.key().unwrap().clone()).await?;
//! ```

use std::{
    collections::{BTreeMap, HashSet},
    fmt,
    sync::Arc,
};

use bson::Bson;
use tracing::debug;

use crate::{
    document::{Document, RawRecord},
    driver::{Bucket, Driver, IndexSpec, Key},
    error::{DocumentError, DocumentResult},
    page::Page,
    query::Query,
    schema::{Schema, Transformer},
};

/// Read-only field computed from the record on every access.
pub type ComputeFn = Arc<dyn Fn(&RawRecord) -> Bson + Send + Sync>;

/// Checks an assigned value and returns the value to store, or the reason
/// it was rejected.
pub type ValidateFn = Arc<dyn Fn(Bson) -> Result<Bson, String> + Send + Sync>;

/// Lifecycle callbacks invoked around document writes.
///
/// Every method defaults to a no-op. Returning an error aborts the
/// operation; `will_*` errors abort before any store call.
pub trait Hooks: Send + Sync {
    fn will_save(&self, _document: &mut Document) -> DocumentResult<()> {
        Ok(())
    }

    fn did_save(&self, _document: &Document) -> DocumentResult<()> {
        Ok(())
    }

    /// May rewrite `patch` before it is applied.
    fn will_update(&self, _document: &mut Document, _patch: &mut RawRecord) -> DocumentResult<()> {
        Ok(())
    }

    fn did_update(&self, _document: &Document) -> DocumentResult<()> {
        Ok(())
    }
}

/// A field granted by the model on top of the schema.
#[derive(Clone)]
pub enum DynamicField {
    /// Stored in the record like a schema field, but not validated.
    Stored(Transformer),
    /// Stored in the record; every assignment goes through the validator.
    Validated(ValidateFn),
    /// Derived from the record; cannot be written.
    Computed(ComputeFn),
}

impl DynamicField {
    pub fn stored() -> Self {
        DynamicField::Stored(Transformer::new())
    }

    pub fn validated(f: impl Fn(Bson) -> Result<Bson, String> + Send + Sync + 'static) -> Self {
        DynamicField::Validated(Arc::new(f))
    }

    pub fn computed(f: impl Fn(&RawRecord) -> Bson + Send + Sync + 'static) -> Self {
        DynamicField::Computed(Arc::new(f))
    }
}

impl fmt::Debug for DynamicField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DynamicField::Stored(transformer) => f.debug_tuple("Stored").field(transformer).finish(),
            DynamicField::Validated(_) => f.write_str("Validated"),
            DynamicField::Computed(_) => f.write_str("Computed"),
        }
    }
}

struct ModelInner {
    schema: Schema,
    bucket: Bucket,
    driver: Arc<dyn Driver>,
    updatable: HashSet<String>,
    dynamic_fields: BTreeMap<String, DynamicField>,
    hooks: Vec<Arc<dyn Hooks>>,
}

/// Binding of a schema, a bucket and a driver.
#[derive(Clone)]
pub struct Model {
    inner: Arc<ModelInner>,
}

impl Model {
    pub fn builder(schema: Schema, bucket: impl Into<String>, driver: Arc<dyn Driver>) -> ModelBuilder {
        ModelBuilder::new(schema, bucket, driver)
    }

    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    pub fn bucket(&self) -> &Bucket {
        &self.inner.bucket
    }

    pub fn driver(&self) -> &dyn Driver {
        self.inner.driver.as_ref()
    }

    /// True for schema fields and model-granted dynamic fields.
    pub fn is_declared(&self, field: &str) -> bool {
        self.inner.schema.is_declared(field) || self.inner.dynamic_fields.contains_key(field)
    }

    /// True when `update` may write `field` from an external patch.
    pub fn is_updatable(&self, field: &str) -> bool {
        self.inner.updatable.contains(field)
    }

    pub fn dynamic_field(&self, field: &str) -> Option<&DynamicField> {
        self.inner.dynamic_fields.get(field)
    }

    pub fn dynamic_fields(&self) -> impl Iterator<Item = (&str, &DynamicField)> {
        self.inner
            .dynamic_fields
            .iter()
            .map(|(name, field)| (name.as_str(), field))
    }

    pub(crate) fn hooks(&self) -> &[Arc<dyn Hooks>] {
        &self.inner.hooks
    }

    /// A new, unsaved document holding the driver's initial record and the
    /// schema's defaults.
    pub fn create(&self) -> Document {
        let mut record = self.inner.driver.create(&self.inner.bucket);
        for (field, value) in self.inner.schema.defaults() {
            if !record.contains_key(&field) {
                record.insert(field, value);
            }
        }

        Document::new(self.clone(), record)
    }

    /// A new, unsaved document with `values` assigned field by field.
    ///
    /// Fails on the first undeclared or invalid field.
    pub fn create_with(&self, values: RawRecord) -> DocumentResult<Document> {
        let mut document = self.create();
        for (field, value) in values {
            document.set(&field, value)?;
        }

        Ok(document)
    }

    /// Loads the document stored under `key`.
    pub async fn get(&self, key: impl Into<Key>) -> DocumentResult<Document> {
        let key = key.into();
        let bucket = &self.inner.bucket;

        debug!(bucket = bucket.name(), key = %key, driver = self.inner.driver.name(), "loading document");

        match self.inner.driver.get(bucket, &key).await? {
            Some(record) => Ok(Document::loaded(self.clone(), key, record)),
            None => Err(DocumentError::NotFound(key.into_string(), bucket.name().to_string())),
        }
    }

    pub async fn find(&self, query: impl Into<Query>) -> DocumentResult<Vec<Document>> {
        let query = query.into();
        let records = self.inner.driver.find(&self.inner.bucket, &query).await?;

        debug!(bucket = self.inner.bucket.name(), matches = records.len(), "find");

        Ok(records
            .into_iter()
            .map(|stored| Document::loaded(self.clone(), stored.key, stored.record))
            .collect())
    }

    /// The first matching document. No match is reported as `NotFound`.
    pub async fn find_one(&self, query: impl Into<Query>) -> DocumentResult<Document> {
        let query = query.into();

        match self.inner.driver.find_one(&self.inner.bucket, &query).await? {
            Some(stored) => Ok(Document::loaded(self.clone(), stored.key, stored.record)),
            None => Err(DocumentError::NotFound(
                "matching query".to_string(),
                self.inner.bucket.name().to_string(),
            )),
        }
    }

    pub async fn find_limit(
        &self,
        query: impl Into<Query>,
        offset: usize,
        limit: usize,
    ) -> DocumentResult<Page<Document>> {
        let query = query.into();
        let page = self
            .inner
            .driver
            .find_limit(&self.inner.bucket, &query, offset, limit)
            .await?;

        debug!(
            bucket = self.inner.bucket.name(),
            offset,
            limit,
            total = page.count,
            "find_limit"
        );

        Ok(page.map(|stored| Document::loaded(self.clone(), stored.key, stored.record)))
    }

    pub async fn count(&self, query: impl Into<Query>) -> DocumentResult<u64> {
        self.inner
            .driver
            .count(&self.inner.bucket, &query.into())
            .await
    }

    pub async fn create_indices(&self, indices: &[IndexSpec]) -> DocumentResult<()> {
        self.inner
            .driver
            .create_indices(&self.inner.bucket, indices)
            .await
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("bucket", &self.inner.bucket)
            .field("driver", &self.inner.driver.name())
            .field("schema", &self.inner.schema)
            .field("updatable", &self.inner.updatable)
            .field("dynamic_fields", &self.inner.dynamic_fields)
            .field("hooks", &self.inner.hooks.len())
            .finish()
    }
}

/// Builder for [`Model`].
pub struct ModelBuilder {
    schema: Schema,
    bucket: String,
    driver: Arc<dyn Driver>,
    updatable: HashSet<String>,
    dynamic_fields: BTreeMap<String, DynamicField>,
    hooks: Vec<Arc<dyn Hooks>>,
}

impl ModelBuilder {
    pub fn new(schema: Schema, bucket: impl Into<String>, driver: Arc<dyn Driver>) -> Self {
        Self {
            schema,
            bucket: bucket.into(),
            driver,
            updatable: HashSet::new(),
            dynamic_fields: BTreeMap::new(),
            hooks: Vec::new(),
        }
    }

    /// Fields `Document::update` may write from an external patch.
    pub fn updatable<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.updatable
            .extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn dynamic_field(mut self, name: impl Into<String>, field: DynamicField) -> Self {
        self.dynamic_fields.insert(name.into(), field);
        self
    }

    pub fn hooks(mut self, hooks: Arc<dyn Hooks>) -> Self {
        self.hooks.push(hooks);
        self
    }

    pub fn build(self) -> DocumentResult<Model> {
        if let Some(name) = self
            .dynamic_fields
            .keys()
            .find(|name| self.schema.is_declared(name))
        {
            return Err(DocumentError::InvalidSchema(format!(
                "dynamic field `{name}` shadows a schema field"
            )));
        }

        if let Some(name) = self.updatable.iter().find(|name| {
            !self.schema.is_declared(name) && !self.dynamic_fields.contains_key(*name)
        }) {
            return Err(DocumentError::InvalidSchema(format!(
                "updatable field `{name}` is not declared"
            )));
        }

        let mut bucket = Bucket::new(self.bucket);
        if let Some(primary_key) = self.schema.primary_key() {
            bucket = bucket.with_primary_key(primary_key);
        }

        Ok(Model {
            inner: Arc::new(ModelInner {
                schema: self.schema,
                bucket,
                driver: self.driver,
                updatable: self.updatable,
                dynamic_fields: self.dynamic_fields,
                hooks: self.hooks,
            }),
        })
    }
}
