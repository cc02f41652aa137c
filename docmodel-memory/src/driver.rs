//! In-memory driver implementation.
//!
//! This module provides a simple but complete driver that keeps records in
//! maps behind a single async-safe read-write lock. Every write holds the
//! lock for its whole duration, so operations are linearizable.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    sync::Arc,
};

use async_trait::async_trait;
use mea::rwlock::RwLock;
use tracing::debug;

use docmodel_core::{
    diff::{ChangeSet, values_equal},
    document::RawRecord,
    driver::{Bucket, Driver, DriverBuilder, IndexSpec, Key, StoredRecord},
    error::{DocumentError, DocumentResult},
    page::Page,
    query::Query,
};

use crate::evaluator::{RecordEvaluator, compare_records, lookup};

/// Ordered by key, so unsorted queries return records in key order.
type BucketMap = BTreeMap<Key, RawRecord>;

#[derive(Default, Debug)]
struct State {
    /// bucket name -> (key -> record)
    buckets: HashMap<String, BucketMap>,
    /// bucket name -> provisioned indices
    indices: HashMap<String, Vec<IndexSpec>>,
}

impl State {
    /// Fails when `record` collides with another record on a unique index.
    fn check_unique(&self, bucket: &str, key: &Key, record: &RawRecord) -> DocumentResult<()> {
        let (Some(indices), Some(records)) = (self.indices.get(bucket), self.buckets.get(bucket)) else {
            return Ok(());
        };

        for index in indices.iter().filter(|index| index.unique) {
            if let Some(existing) = records
                .iter()
                .filter(|(other, _)| *other != key)
                .find(|(_, other)| same_index_values(index, record, other))
            {
                return Err(DocumentError::DriverFailure(format!(
                    "duplicate value for unique index `{}` in bucket `{bucket}` (conflicts with {})",
                    index.index_name(),
                    existing.0,
                )));
            }
        }

        Ok(())
    }

    fn insert(&mut self, bucket: &Bucket, mut record: RawRecord) -> DocumentResult<Key> {
        let key = bucket.key_of(&record).unwrap_or_else(Key::generate);

        if self
            .buckets
            .get(bucket.name())
            .is_some_and(|records| records.contains_key(&key))
        {
            return Err(DocumentError::AlreadyExists(key.into_string(), bucket.name().to_string()));
        }

        self.check_unique(bucket.name(), &key, &record)?;

        if bucket.key_of(&record).is_none() {
            bucket.inject_key(&mut record, &key);
        }

        self.buckets
            .entry(bucket.name().to_string())
            .or_default()
            .insert(key.clone(), record);

        Ok(key)
    }

    fn matching(&self, bucket: &Bucket, query: &Query) -> DocumentResult<Vec<StoredRecord>> {
        let Some(records) = self.buckets.get(bucket.name()) else {
            return Ok(vec![]);
        };

        let mut matches = Vec::new();
        for (key, record) in records {
            if RecordEvaluator::matches(record, query.filter.as_ref())? {
                matches.push(StoredRecord { key: key.clone(), record: record.clone() });
            }
        }

        if !query.sort.is_empty() {
            matches.sort_by(|a, b| compare_records(&a.record, &b.record, &query.sort));
        }

        Ok(matches)
    }
}

/// Two records collide on an index when every indexed field holds equal
/// values. Records lacking all of the indexed fields never collide.
fn same_index_values(index: &IndexSpec, left: &RawRecord, right: &RawRecord) -> bool {
    let mut any_present = false;

    for (field, _) in &index.fields {
        match (lookup(left, field), lookup(right, field)) {
            (Some(a), Some(b)) if values_equal(a, b) => any_present = true,
            (None, None) => {}
            _ => return false,
        }
    }

    any_present
}

/// Thread-safe in-memory driver.
///
/// `InMemoryDriver` is cloneable and uses an `Arc`-wrapped internal state,
/// so clones share the same underlying data. Queries scan every record in
/// the bucket; indices are only used to enforce uniqueness.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use docmodel_memory::InMemoryDriver;
///
/// let driver = Arc::new(InMemoryDriver::new());
/// let users = Model::builder(schema, "users", driver).build()?;
/// ```
#[derive(Default, Clone)]
pub struct InMemoryDriver {
    state: Arc<RwLock<State>>,
}

impl InMemoryDriver {
    /// Creates a new, empty driver.
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(State::default())),
        }
    }

    /// Creates a builder for seeding the driver with records.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use docmodel_memory::InMemoryDriver;
    /// use docmodel_core::driver::{Bucket, DriverBuilder};
    ///
    /// let driver = InMemoryDriver::builder()
    ///     .with_records(Bucket::new("users").with_primary_key("id"), vec![doc! { "id": "u1" }])
    ///     .build()
    ///     .await?;
    /// ```
    pub fn builder() -> InMemoryDriverBuilder {
        InMemoryDriverBuilder::default()
    }

    /// Number of records held in a bucket.
    pub async fn record_count(&self, bucket: &str) -> usize {
        self.state
            .read()
            .await
            .buckets
            .get(bucket)
            .map_or(0, BTreeMap::len)
    }
}

impl fmt::Debug for InMemoryDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryDriver").finish_non_exhaustive()
    }
}

#[async_trait]
impl Driver for InMemoryDriver {
    fn name(&self) -> &str {
        "memory"
    }

    async fn create_indices(&self, bucket: &Bucket, indices: &[IndexSpec]) -> DocumentResult<()> {
        let mut state = self.state.write().await;

        for index in indices {
            if index.unique {
                let records = state
                    .buckets
                    .get(bucket.name())
                    .map(|records| records.values().collect::<Vec<_>>())
                    .unwrap_or_default();

                for (position, record) in records.iter().enumerate() {
                    if records[position + 1..]
                        .iter()
                        .any(|other| same_index_values(index, record, other))
                    {
                        return Err(DocumentError::DriverFailure(format!(
                            "cannot create unique index `{}` in bucket `{}`: existing records collide",
                            index.index_name(),
                            bucket.name(),
                        )));
                    }
                }
            }

            let provisioned = state.indices.entry(bucket.name().to_string()).or_default();
            let name = index.index_name();
            provisioned.retain(|existing| existing.index_name() != name);
            provisioned.push(index.clone());

            debug!(bucket = bucket.name(), index = %name, unique = index.unique, "created index");
        }

        Ok(())
    }

    async fn get(&self, bucket: &Bucket, key: &Key) -> DocumentResult<Option<RawRecord>> {
        Ok(self
            .state
            .read()
            .await
            .buckets
            .get(bucket.name())
            .and_then(|records| records.get(key))
            .cloned())
    }

    async fn post(&self, bucket: &Bucket, record: RawRecord) -> DocumentResult<Key> {
        let key = self.state.write().await.insert(bucket, record)?;

        debug!(bucket = bucket.name(), key = %key, "inserted record");

        Ok(key)
    }

    async fn put(&self, bucket: &Bucket, key: &Key, changes: &ChangeSet) -> DocumentResult<()> {
        let mut state = self.state.write().await;

        let mut updated = state
            .buckets
            .get(bucket.name())
            .and_then(|records| records.get(key))
            .cloned()
            .ok_or_else(|| DocumentError::NotFound(key.to_string(), bucket.name().to_string()))?;

        changes.apply_to(&mut updated);
        state.check_unique(bucket.name(), key, &updated)?;

        state
            .buckets
            .entry(bucket.name().to_string())
            .or_default()
            .insert(key.clone(), updated);

        debug!(bucket = bucket.name(), key = %key, fields = changes.len(), "updated record");

        Ok(())
    }

    async fn del(&self, bucket: &Bucket, key: &Key) -> DocumentResult<()> {
        let removed = self
            .state
            .write()
            .await
            .buckets
            .get_mut(bucket.name())
            .and_then(|records| records.remove(key))
            .is_some();

        debug!(bucket = bucket.name(), key = %key, removed, "deleted record");

        Ok(())
    }

    async fn find_one(&self, bucket: &Bucket, query: &Query) -> DocumentResult<Option<StoredRecord>> {
        Ok(self
            .state
            .read()
            .await
            .matching(bucket, query)?
            .into_iter()
            .next())
    }

    async fn find(&self, bucket: &Bucket, query: &Query) -> DocumentResult<Vec<StoredRecord>> {
        self.state.read().await.matching(bucket, query)
    }

    async fn find_limit(
        &self,
        bucket: &Bucket,
        query: &Query,
        offset: usize,
        limit: usize,
    ) -> DocumentResult<Page<StoredRecord>> {
        let matches = self.state.read().await.matching(bucket, query)?;

        Ok(Page::slice(matches, offset, limit))
    }

    async fn count(&self, bucket: &Bucket, query: &Query) -> DocumentResult<u64> {
        let state = self.state.read().await;
        let Some(records) = state.buckets.get(bucket.name()) else {
            return Ok(0);
        };

        let mut count = 0;
        for record in records.values() {
            if RecordEvaluator::matches(record, query.filter.as_ref())? {
                count += 1;
            }
        }

        Ok(count)
    }
}

/// Builder for constructing [`InMemoryDriver`] instances, optionally
/// pre-populated with records.
#[derive(Default)]
pub struct InMemoryDriverBuilder {
    seed: Vec<(Bucket, Vec<RawRecord>)>,
}

impl InMemoryDriverBuilder {
    /// Seeds `bucket` with `records`. Records without a primary-key value
    /// are assigned a generated key.
    pub fn with_records(mut self, bucket: Bucket, records: impl IntoIterator<Item = RawRecord>) -> Self {
        self.seed.push((bucket, records.into_iter().collect()));
        self
    }
}

#[async_trait]
impl DriverBuilder for InMemoryDriverBuilder {
    type Driver = InMemoryDriver;

    /// Fails with `AlreadyExists` when two seeded records share a key.
    async fn build(self) -> DocumentResult<Self::Driver> {
        let mut state = State::default();

        for (bucket, records) in self.seed {
            state.buckets.entry(bucket.name().to_string()).or_default();
            for record in records {
                state.insert(&bucket, record)?;
            }
        }

        Ok(InMemoryDriver {
            state: Arc::new(RwLock::new(state)),
        })
    }
}
