#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use docmodel::{
    async_trait,
    bson::doc,
    memory::InMemoryDriver,
    prelude::*,
};

/// Wraps the in-memory driver, counting store calls and optionally failing
/// the next `put`.
#[derive(Debug, Default)]
pub struct RecordingDriver {
    inner: InMemoryDriver,
    posts: AtomicUsize,
    puts: AtomicUsize,
    dels: AtomicUsize,
    fail_next_put: AtomicBool,
    put_log: Mutex<Vec<ChangeSet>>,
}

impl RecordingDriver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn posts(&self) -> usize {
        self.posts.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn dels(&self) -> usize {
        self.dels.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.posts() + self.puts() + self.dels()
    }

    pub fn fail_next_put(&self) {
        self.fail_next_put.store(true, Ordering::SeqCst);
    }

    /// Every change set passed to `put`, failed attempts included.
    pub fn put_log(&self) -> Vec<ChangeSet> {
        self.put_log.lock().unwrap().clone()
    }
}

#[async_trait]
impl Driver for RecordingDriver {
    fn name(&self) -> &str {
        "recording"
    }

    async fn create_indices(&self, bucket: &Bucket, indices: &[IndexSpec]) -> DocumentResult<()> {
        self.inner.create_indices(bucket, indices).await
    }

    async fn get(&self, bucket: &Bucket, key: &Key) -> DocumentResult<Option<RawRecord>> {
        self.inner.get(bucket, key).await
    }

    async fn post(&self, bucket: &Bucket, record: RawRecord) -> DocumentResult<Key> {
        self.posts.fetch_add(1, Ordering::SeqCst);
        self.inner.post(bucket, record).await
    }

    async fn put(&self, bucket: &Bucket, key: &Key, changes: &ChangeSet) -> DocumentResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.put_log.lock().unwrap().push(changes.clone());

        if self.fail_next_put.swap(false, Ordering::SeqCst) {
            return Err(DocumentError::DriverFailure("connection reset".to_string()));
        }

        self.inner.put(bucket, key, changes).await
    }

    async fn del(&self, bucket: &Bucket, key: &Key) -> DocumentResult<()> {
        self.dels.fetch_add(1, Ordering::SeqCst);
        self.inner.del(bucket, key).await
    }

    async fn find_one(&self, bucket: &Bucket, query: &Query) -> DocumentResult<Option<StoredRecord>> {
        self.inner.find_one(bucket, query).await
    }

    async fn find(&self, bucket: &Bucket, query: &Query) -> DocumentResult<Vec<StoredRecord>> {
        self.inner.find(bucket, query).await
    }

    async fn find_limit(
        &self,
        bucket: &Bucket,
        query: &Query,
        offset: usize,
        limit: usize,
    ) -> DocumentResult<Page<StoredRecord>> {
        self.inner.find_limit(bucket, query, offset, limit).await
    }

    async fn count(&self, bucket: &Bucket, query: &Query) -> DocumentResult<u64> {
        self.inner.count(bucket, query).await
    }
}

/// `id` (primary key), required `name` and `email`, optional `age`,
/// `status` with a default, and a nested `address`.
pub fn user_schema() -> Schema {
    Schema::builder()
        .field("id", FieldConstraint::string())
        .field("name", FieldConstraint::string().required().max_length(32))
        .field("email", FieldConstraint::string().required().format("email"))
        .field("age", FieldConstraint::integer())
        .field(
            "status",
            FieldConstraint::string()
                .one_of(["active", "suspended"])
                .default_value("active"),
        )
        .field(
            "address",
            FieldConstraint::object(
                Schema::builder()
                    .field("city", FieldConstraint::string().required())
                    .build()
                    .unwrap(),
            ),
        )
        .transformer(
            "email",
            Transformer::new().on_set(|value| match value {
                docmodel::bson::Bson::String(s) => docmodel::bson::Bson::String(s.to_lowercase()),
                other => other,
            }),
        )
        .primary_key("id")
        .build()
        .unwrap()
}

pub fn users(driver: Arc<dyn Driver>) -> Model {
    Model::builder(user_schema(), "users", driver)
        .updatable(["name", "age"])
        .build()
        .unwrap()
}

pub fn alice() -> RawRecord {
    doc! { "name": "Alice", "email": "alice@example.com" }
}
