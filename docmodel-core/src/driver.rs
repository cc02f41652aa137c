//! Driver contract implemented by every backing-store adapter.
//!
//! A [`Driver`] turns the uniform document operations (get, post, put, del,
//! find, count, index creation) into calls against one kind of store. Models
//! only ever hold an `Arc<dyn Driver>`, so adapters are interchangeable at
//! runtime.
//!
//! # Consistency
//!
//! `post`, `put` and `del` must not resolve until the write is durable and
//! visible at the adapter's configured consistency level: a `get` issued
//! after the future completes has to observe the write.
//!
//! # Example
//!
//! ```ignore
//! use docmodel::driver::{Bucket, Driver};
//! use bson::doc;
//!
//! let bucket = Bucket::new("users").with_primary_key("id");
//! let key = driver.post(&bucket, doc! { "name": "Alice" }).await?;
//! let stored = driver.get(&bucket, &key).await?;
//! ```

use std::fmt;

use async_trait::async_trait;
use bson::Bson;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    diff::ChangeSet,
    document::RawRecord,
    error::DocumentResult,
    page::Page,
    query::{Query, SortDirection},
};

/// Identifier of a stored record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Key(String);

impl Key {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// A fresh random key for stores that do not assign their own.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Reads a key out of a field value. Strings are taken as-is and
    /// integers are rendered in decimal; other values carry no key.
    pub fn from_bson(value: &Bson) -> Option<Self> {
        match value {
            Bson::String(s) if !s.is_empty() => Some(Self(s.clone())),
            Bson::Int32(n) => Some(Self(n.to_string())),
            Bson::Int64(n) => Some(Self(n.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<Uuid> for Key {
    fn from(value: Uuid) -> Self {
        Self(value.simple().to_string())
    }
}

impl From<Key> for Bson {
    fn from(key: Key) -> Self {
        Bson::String(key.0)
    }
}

/// The logical namespace a model targets, plus the field its keys live under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    name: String,
    primary_key: Option<String>,
}

impl Bucket {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), primary_key: None }
    }

    pub fn with_primary_key(mut self, field: impl Into<String>) -> Self {
        self.primary_key = Some(field.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn primary_key(&self) -> Option<&str> {
        self.primary_key.as_deref()
    }

    /// The key carried by `record` under the primary-key field, if any.
    pub fn key_of(&self, record: &RawRecord) -> Option<Key> {
        self.primary_key
            .as_deref()
            .and_then(|field| record.get(field))
            .and_then(Key::from_bson)
    }

    /// Writes `key` under the primary-key field, replacing any value there.
    pub fn inject_key(&self, record: &mut RawRecord, key: &Key) {
        if let Some(field) = &self.primary_key {
            record.insert(field.clone(), Bson::String(key.as_str().to_string()));
        }
    }

    /// Removes the primary-key field so the key is only stored as the
    /// record's identity.
    pub fn strip_key(&self, record: &mut RawRecord) -> Option<Bson> {
        self.primary_key
            .as_deref()
            .and_then(|field| record.remove(field))
    }
}

/// A record returned by a query, paired with its identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub key: Key,
    /// The record, with the key injected under the primary-key field.
    pub record: RawRecord,
}

/// Describes an index to provision on a bucket.
#[derive(Debug, Clone)]
pub struct IndexSpec {
    pub name: Option<String>,
    pub fields: Vec<(String, SortDirection)>,
    pub unique: bool,
}

impl IndexSpec {
    /// An ascending index on a single field.
    pub fn on(field: impl Into<String>) -> Self {
        Self {
            name: None,
            fields: vec![(field.into(), SortDirection::Asc)],
            unique: false,
        }
    }

    /// Adds another field to a compound index.
    pub fn then(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.fields.push((field.into(), direction));
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// The explicit name, or one derived from the indexed fields.
    pub fn index_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self
                .fields
                .iter()
                .map(|(field, direction)| match direction {
                    SortDirection::Asc => format!("{field}_1"),
                    SortDirection::Desc => format!("{field}_-1"),
                })
                .collect::<Vec<_>>()
                .join("_"),
        }
    }
}

/// Uniform persistence contract for a backing store.
///
/// # Thread Safety
///
/// Implementations are shared between models and tasks through `Arc`, so
/// they must be `Send + Sync`.
///
/// # Error Handling
///
/// Store errors are reported as
/// [`DocumentError::DriverFailure`](crate::error::DocumentError::DriverFailure)
/// with the backend's message attached. Drivers never retry on their own.
#[async_trait]
pub trait Driver: Send + Sync + fmt::Debug {
    /// Short adapter name used in log output.
    fn name(&self) -> &str;

    /// Provisions indices on a bucket. Idempotent where the backend allows.
    async fn create_indices(&self, bucket: &Bucket, indices: &[IndexSpec]) -> DocumentResult<()>;

    /// A freshly initialized record for a new document.
    fn create(&self, _bucket: &Bucket) -> RawRecord {
        RawRecord::new()
    }

    /// Fetches one record by key, with the key injected under the bucket's
    /// primary-key field. Returns `Ok(None)` when the key does not exist.
    async fn get(&self, bucket: &Bucket, key: &Key) -> DocumentResult<Option<RawRecord>>;

    /// Stores a new record and returns its key.
    ///
    /// A key already present under the primary-key field is used as-is;
    /// otherwise the driver assigns one.
    async fn post(&self, bucket: &Bucket, record: RawRecord) -> DocumentResult<Key>;

    /// Applies a partial update: changed and added fields are written,
    /// removed fields are unset, and every other stored field is left alone.
    async fn put(&self, bucket: &Bucket, key: &Key, changes: &ChangeSet) -> DocumentResult<()>;

    /// Removes a record. Removing a key that does not exist succeeds.
    async fn del(&self, bucket: &Bucket, key: &Key) -> DocumentResult<()>;

    /// The first matching record, or `Ok(None)`.
    async fn find_one(&self, bucket: &Bucket, query: &Query) -> DocumentResult<Option<StoredRecord>>;

    /// Every matching record.
    async fn find(&self, bucket: &Bucket, query: &Query) -> DocumentResult<Vec<StoredRecord>>;

    /// One page of matching records along with the total match count.
    async fn find_limit(
        &self,
        bucket: &Bucket,
        query: &Query,
        offset: usize,
        limit: usize,
    ) -> DocumentResult<Page<StoredRecord>>;

    /// Number of matching records.
    async fn count(&self, bucket: &Bucket, query: &Query) -> DocumentResult<u64>;

    /// Releases connections and other resources held by the driver.
    async fn shutdown(self) -> DocumentResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// Async factory for driver instances.
#[async_trait]
pub trait DriverBuilder {
    type Driver: Driver;

    async fn build(self) -> DocumentResult<Self::Driver>;
}
