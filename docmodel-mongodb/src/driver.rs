use async_trait::async_trait;
use bson::{Bson, Document, doc, oid::ObjectId};
use futures::TryStreamExt;
use mongodb::{
    Client, Collection, Database, IndexModel,
    error::{ErrorKind, WriteFailure},
    options::{
        Acknowledgment, ClientOptions, DatabaseOptions, IndexOptions, ReadConcern, WriteConcern,
    },
};
use tracing::{debug, warn};

use docmodel_core::{
    diff::ChangeSet,
    document::RawRecord,
    driver::{Bucket, Driver, DriverBuilder, IndexSpec, Key, StoredRecord},
    error::{DocumentError, DocumentResult},
    page::Page,
    query::{Query, SortDirection},
};

use crate::{escape::KeyEscaper, query::MongoQueryTranslator};

/// Server error code for duplicate keys.
const DUPLICATE_KEY: i32 = 11000;

/// Filter addressing the record stored under `key`.
///
/// Keys read from ObjectId `_id` values are their hex form, so a key that
/// parses as an ObjectId matches either representation.
fn key_filter(key: &Key) -> Document {
    let id = key.as_str();
    match ObjectId::parse_str(id) {
        Ok(oid) => doc! { "_id": { "$in": [oid, id] } },
        Err(_) => doc! { "_id": id },
    }
}

/// Write and read guarantees requested from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Consistency {
    /// Whatever the deployment is configured with.
    ServerDefault,
    /// Writes acknowledged by a majority of the replica set; reads see only
    /// majority-committed data.
    #[default]
    Quorum,
}

#[derive(Debug)]
pub struct MongoDbDriver {
    client: Client,
    database: Database,
}

impl MongoDbDriver {
    pub fn new(client: Client, database: Database) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbDriverBuilder {
        MongoDbDriverBuilder::new(dsn, database)
    }

    fn collection(&self, bucket: &Bucket) -> Collection<Document> {
        self.database
            .collection(&KeyEscaper::escape_key(bucket.name()))
    }

    fn prepare_record(&self, bucket: &Bucket, key: &Key, record: &RawRecord) -> Document {
        let mut prepared = KeyEscaper::escape_record(record);
        prepared.insert("_id", key.as_str());

        if let Some(field) = bucket.primary_key() {
            if !record.contains_key(field) {
                prepared.insert(KeyEscaper::escape_key(field), key.as_str());
            }
        }

        prepared
    }

    fn restore_record(&self, bucket: &Bucket, mut stored: Document) -> DocumentResult<StoredRecord> {
        let key = match stored.get("_id") {
            Some(Bson::ObjectId(id)) => {
                warn!(bucket = bucket.name(), id = %id, "record has an ObjectId key, reading it as hex");
                Key::new(id.to_hex())
            }
            Some(value) => Key::from_bson(value)
                .ok_or_else(|| DocumentError::DriverFailure(format!("unsupported _id value {value}")))?,
            None => return Err(DocumentError::DriverFailure("record without _id".to_string())),
        };

        if bucket.primary_key() != Some("_id") {
            stored.remove("_id");
        }

        let mut record = KeyEscaper::restore_record(&stored);
        if bucket.key_of(&record).is_none() {
            bucket.inject_key(&mut record, &key);
        }

        Ok(StoredRecord { key, record })
    }

    async fn shutdown(self) -> DocumentResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

#[async_trait]
impl Driver for MongoDbDriver {
    fn name(&self) -> &str {
        "mongodb"
    }

    async fn create_indices(&self, bucket: &Bucket, indices: &[IndexSpec]) -> DocumentResult<()> {
        if indices.is_empty() {
            return Ok(());
        }

        let models = indices
            .iter()
            .map(|index| {
                IndexModel::builder()
                    .keys(
                        index
                            .fields
                            .iter()
                            .map(|(field, direction)| {
                                let direction = match direction {
                                    SortDirection::Asc => 1,
                                    SortDirection::Desc => -1,
                                };
                                (KeyEscaper::escape_path(field), Bson::Int32(direction))
                            })
                            .collect::<Document>(),
                    )
                    .options(
                        IndexOptions::builder()
                            .unique(index.unique)
                            .name(index.index_name())
                            .build(),
                    )
                    .build()
            })
            .collect::<Vec<_>>();

        self.collection(bucket)
            .create_indexes(models)
            .await
            .map_err(|e| DocumentError::DriverFailure(e.to_string()))?;

        debug!(bucket = bucket.name(), count = indices.len(), "created indices");

        Ok(())
    }

    async fn get(&self, bucket: &Bucket, key: &Key) -> DocumentResult<Option<RawRecord>> {
        self.collection(bucket)
            .find_one(key_filter(key))
            .await
            .map_err(|e| DocumentError::DriverFailure(e.to_string()))?
            .map(|stored| self.restore_record(bucket, stored).map(|stored| stored.record))
            .transpose()
    }

    async fn post(&self, bucket: &Bucket, record: RawRecord) -> DocumentResult<Key> {
        let key = bucket.key_of(&record).unwrap_or_else(Key::generate);

        self.collection(bucket)
            .insert_one(self.prepare_record(bucket, &key, &record))
            .await
            .map_err(|e| match e.kind.as_ref() {
                ErrorKind::Write(WriteFailure::WriteError(failure))
                    if failure.code == DUPLICATE_KEY && failure.message.contains("_id_") =>
                {
                    DocumentError::AlreadyExists(key.to_string(), bucket.name().to_string())
                }
                _ => DocumentError::DriverFailure(e.to_string()),
            })?;

        debug!(bucket = bucket.name(), key = %key, "inserted record");

        Ok(key)
    }

    async fn put(&self, bucket: &Bucket, key: &Key, changes: &ChangeSet) -> DocumentResult<()> {
        let set = KeyEscaper::escape_record(&changes.set_fields());
        let unset = changes
            .unset_fields()
            .into_iter()
            .map(|field| (KeyEscaper::escape_key(field), Bson::String(String::new())))
            .collect::<Document>();

        let mut update = Document::new();
        if !set.is_empty() {
            update.insert("$set", set);
        }
        if !unset.is_empty() {
            update.insert("$unset", unset);
        }
        if update.is_empty() {
            return Ok(());
        }

        let result = self
            .collection(bucket)
            .update_one(key_filter(key), update)
            .await
            .map_err(|e| DocumentError::DriverFailure(e.to_string()))?;

        if result.matched_count == 0 {
            return Err(DocumentError::NotFound(key.to_string(), bucket.name().to_string()));
        }

        debug!(bucket = bucket.name(), key = %key, fields = changes.len(), "updated record");

        Ok(())
    }

    async fn del(&self, bucket: &Bucket, key: &Key) -> DocumentResult<()> {
        let result = self
            .collection(bucket)
            .delete_one(key_filter(key))
            .await
            .map_err(|e| DocumentError::DriverFailure(e.to_string()))?;

        debug!(bucket = bucket.name(), key = %key, removed = result.deleted_count, "deleted record");

        Ok(())
    }

    async fn find_one(&self, bucket: &Bucket, query: &Query) -> DocumentResult<Option<StoredRecord>> {
        let collection = self.collection(bucket);
        let mut action = collection.find_one(MongoQueryTranslator::filter(query.filter.as_ref())?);

        if let Some(sort) = MongoQueryTranslator::sort(&query.sort) {
            action = action.sort(sort);
        }

        action
            .await
            .map_err(|e| DocumentError::DriverFailure(e.to_string()))?
            .map(|stored| self.restore_record(bucket, stored))
            .transpose()
    }

    async fn find(&self, bucket: &Bucket, query: &Query) -> DocumentResult<Vec<StoredRecord>> {
        let collection = self.collection(bucket);
        let mut action = collection.find(MongoQueryTranslator::filter(query.filter.as_ref())?);

        if let Some(sort) = MongoQueryTranslator::sort(&query.sort) {
            action = action.sort(sort);
        }

        action
            .await
            .map_err(|e| DocumentError::DriverFailure(e.to_string()))?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(|e| DocumentError::DriverFailure(e.to_string()))?
            .into_iter()
            .map(|stored| self.restore_record(bucket, stored))
            .collect()
    }

    async fn find_limit(
        &self,
        bucket: &Bucket,
        query: &Query,
        offset: usize,
        limit: usize,
    ) -> DocumentResult<Page<StoredRecord>> {
        let filter = MongoQueryTranslator::filter(query.filter.as_ref())?;
        let collection = self.collection(bucket);

        let count = collection
            .count_documents(filter.clone())
            .await
            .map_err(|e| DocumentError::DriverFailure(e.to_string()))?;

        // A zero limit means "no limit" to the server.
        let items = if limit == 0 {
            Vec::new()
        } else {
            let mut action = collection
                .find(filter)
                .skip(offset as u64)
                .limit(i64::try_from(limit).unwrap_or(i64::MAX));

            if let Some(sort) = MongoQueryTranslator::sort(&query.sort) {
                action = action.sort(sort);
            }

            action
                .await
                .map_err(|e| DocumentError::DriverFailure(e.to_string()))?
                .try_collect::<Vec<Document>>()
                .await
                .map_err(|e| DocumentError::DriverFailure(e.to_string()))?
                .into_iter()
                .map(|stored| self.restore_record(bucket, stored))
                .collect::<DocumentResult<Vec<_>>>()?
        };

        Ok(Page::builder(items)
            .with_count(count as usize)
            .with_offset(offset)
            .with_limit(limit)
            .build())
    }

    async fn count(&self, bucket: &Bucket, query: &Query) -> DocumentResult<u64> {
        self.collection(bucket)
            .count_documents(MongoQueryTranslator::filter(query.filter.as_ref())?)
            .await
            .map_err(|e| DocumentError::DriverFailure(e.to_string()))
    }

    async fn shutdown(self) -> DocumentResult<()> {
        self.shutdown().await
    }
}

pub struct MongoDbDriverBuilder {
    dsn: String,
    database: String,
    consistency: Consistency,
    journal: bool,
}

impl MongoDbDriverBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
            consistency: Consistency::default(),
            journal: true,
        }
    }

    pub fn with_consistency(mut self, consistency: Consistency) -> Self {
        self.consistency = consistency;
        self
    }

    /// Whether writes wait for the on-disk journal.
    pub fn with_journal(mut self, journal: bool) -> Self {
        self.journal = journal;
        self
    }

    fn database_options(&self) -> DatabaseOptions {
        match self.consistency {
            Consistency::Quorum => DatabaseOptions::builder()
                .write_concern(
                    WriteConcern::builder()
                        .w(Acknowledgment::Majority)
                        .journal(self.journal)
                        .build(),
                )
                .read_concern(ReadConcern::majority())
                .build(),
            Consistency::ServerDefault => DatabaseOptions::builder()
                .write_concern(WriteConcern::builder().journal(self.journal).build())
                .build(),
        }
    }
}

#[async_trait]
impl DriverBuilder for MongoDbDriverBuilder {
    type Driver = MongoDbDriver;

    async fn build(self) -> DocumentResult<Self::Driver> {
        let client = Client::with_options(
            ClientOptions::parse(&self.dsn)
                .await
                .map_err(|e| DocumentError::Initialization(e.to_string()))?,
        )
        .map_err(|e| DocumentError::Initialization(e.to_string()))?;

        let database = client.database_with_options(&self.database, self.database_options());

        debug!(database = %self.database, consistency = ?self.consistency, journal = self.journal, "connected to MongoDB");

        Ok(MongoDbDriver::new(client, database))
    }
}
