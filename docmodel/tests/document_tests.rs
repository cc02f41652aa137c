mod common;

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use docmodel::{
    bson::{Bson, doc},
    memory::InMemoryDriver,
    prelude::*,
};
use pretty_assertions::assert_eq;
use serde::Deserialize;

use common::{RecordingDriver, alice, user_schema, users};

// ── Create, save, load ──────────────────────────────────────────

#[tokio::test]
async fn create_save_and_get_round_trip() {
    let driver = RecordingDriver::new();
    let users = users(driver.clone());

    let mut user = users.create();
    assert!(user.is_new());
    assert_eq!(user.get("status").unwrap(), Some(Bson::String("active".into())));

    user.set("name", "Alice").unwrap();
    user.set("email", "Alice@Example.com").unwrap();
    user.save().await.unwrap();

    let key = user.key().cloned().unwrap();
    assert!(!user.is_new());
    assert_eq!(user.original(), user.raw());
    assert_eq!(user.get("id").unwrap(), Some(Bson::String(key.to_string())));
    assert_eq!(driver.posts(), 1);

    let loaded = users.get(key.clone()).await.unwrap();
    assert_eq!(loaded.key(), Some(&key));
    assert_eq!(loaded.get("name").unwrap(), Some(Bson::String("Alice".into())));
    assert_eq!(loaded.get("email").unwrap(), Some(Bson::String("alice@example.com".into())));
    assert!(!loaded.is_dirty());
}

#[tokio::test]
async fn saving_without_changes_makes_no_store_call() {
    let driver = RecordingDriver::new();
    let users = users(driver.clone());

    let mut user = users.create_with(alice()).unwrap();
    user.save().await.unwrap();
    user.save().await.unwrap();

    let mut loaded = users.get(user.key().cloned().unwrap()).await.unwrap();
    loaded.set("name", "Alice").unwrap();
    loaded.save().await.unwrap();

    assert_eq!(driver.posts(), 1);
    assert_eq!(driver.puts(), 0);
}

#[tokio::test]
async fn save_sends_only_changed_fields() {
    let driver = RecordingDriver::new();
    let users = users(driver.clone());

    let mut user = users.create_with(alice()).unwrap();
    user.save().await.unwrap();

    user.set("age", 41).unwrap();
    user.unset("status").unwrap();
    assert_eq!(user.changes().len(), 2);
    user.save().await.unwrap();

    let sent = driver.put_log().pop().unwrap();
    assert_eq!(sent.set_fields(), doc! { "age": 41 });
    assert_eq!(sent.unset_fields(), vec!["status"]);

    let stored = users.get(user.key().cloned().unwrap()).await.unwrap();
    assert_eq!(stored.get("status").unwrap(), None);
    assert_eq!(stored.get_as::<i32>("age").unwrap(), Some(41));
}

// ── Field access ────────────────────────────────────────────────

#[tokio::test]
async fn undeclared_fields_are_rejected_and_leave_the_record_alone() {
    let users = users(RecordingDriver::new());
    let mut user = users.create_with(alice()).unwrap();
    let before = user.raw().clone();

    let err = user.set("nickname", "Al").unwrap_err();
    assert!(matches!(err, DocumentError::FieldNotDeclared(ref f) if f == "nickname"));
    assert!(matches!(user.get("nickname"), Err(DocumentError::FieldNotDeclared(_))));
    assert!(matches!(user.unset("nickname"), Err(DocumentError::FieldNotDeclared(_))));
    assert_eq!(user.raw(), &before);
}

#[tokio::test]
async fn invalid_values_are_rejected_on_set() {
    let users = users(RecordingDriver::new());
    let mut user = users.create_with(alice()).unwrap();
    let before = user.raw().clone();

    match user.set("email", "not-an-email").unwrap_err() {
        DocumentError::ValidationFailed(errors) => {
            assert_eq!(errors.get("email"), Some("is not a valid email"));
        }
        other => panic!("expected validation failure, got {other:?}"),
    }

    match user.set("address", doc! { "zip": "00100" }).unwrap_err() {
        DocumentError::ValidationFailed(errors) => {
            assert_eq!(errors.get("address.city"), Some("is required"));
        }
        other => panic!("expected validation failure, got {other:?}"),
    }

    assert!(user.set("status", "deleted").is_err());
    assert!(user.set("age", "forty").is_err());
    assert_eq!(user.raw(), &before);
}

#[tokio::test]
async fn missing_required_fields_fail_validation_without_a_store_call() {
    let driver = RecordingDriver::new();
    let users = users(driver.clone());

    let mut user = users.create();
    user.set("name", "Bob").unwrap();

    match user.save().await.unwrap_err() {
        DocumentError::ValidationFailed(errors) => {
            assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["email"]);
            assert_eq!(errors.get("email"), Some("is required"));
        }
        other => panic!("expected validation failure, got {other:?}"),
    }

    assert!(user.is_new());
    assert_eq!(driver.writes(), 0);
}

#[tokio::test]
async fn raw_writes_are_validated_at_save() {
    let driver = RecordingDriver::new();
    let users = users(driver.clone());

    let mut user = users.create_with(alice()).unwrap();
    user.raw_mut().insert("age", "old");

    assert!(matches!(user.save().await, Err(DocumentError::ValidationFailed(_))));
    assert_eq!(driver.writes(), 0);
}

// ── Undeclared data ─────────────────────────────────────────────

#[tokio::test]
async fn unknown_fields_survive_a_round_trip() {
    let bucket = Bucket::new("users").with_primary_key("id");
    let driver = Arc::new(
        InMemoryDriver::builder()
            .with_records(
                bucket.clone(),
                vec![doc! {
                    "id": "u1",
                    "name": "Old Name",
                    "email": "old@example.com",
                    "legacy": { "score": 7, "tags": ["a"] },
                }],
            )
            .build()
            .await
            .unwrap(),
    );
    let users = users(driver.clone());

    let mut user = users.get("u1").await.unwrap();
    assert!(user.get("legacy").is_err());
    assert_eq!(user.raw().get_document("legacy").unwrap(), &doc! { "score": 7, "tags": ["a"] });

    user.set("name", "New Name").unwrap();
    user.save().await.unwrap();

    let stored = driver.get(&bucket, &Key::from("u1")).await.unwrap().unwrap();
    assert_eq!(stored.get_str("name").unwrap(), "New Name");
    assert_eq!(stored.get_document("legacy").unwrap(), &doc! { "score": 7, "tags": ["a"] });
}

// ── Concurrency and failures ────────────────────────────────────

#[tokio::test]
async fn concurrent_saves_merge_per_field() {
    let users = users(RecordingDriver::new());
    let mut user = users.create_with(alice()).unwrap();
    user.save().await.unwrap();
    let key = user.key().cloned().unwrap();

    let mut first = users.get(key.clone()).await.unwrap();
    let mut second = users.get(key.clone()).await.unwrap();

    first.set("name", "Alicia").unwrap();
    second.set("age", 30).unwrap();

    let (a, b) = tokio::join!(first.save(), second.save());
    a.unwrap();
    b.unwrap();

    let merged = users.get(key).await.unwrap();
    assert_eq!(merged.get("name").unwrap(), Some(Bson::String("Alicia".into())));
    assert_eq!(merged.get("age").unwrap(), Some(Bson::Int32(30)));
}

#[tokio::test]
async fn failed_put_keeps_original_and_retry_sends_the_same_diff() {
    let driver = RecordingDriver::new();
    let users = users(driver.clone());

    let mut user = users.create_with(alice()).unwrap();
    user.save().await.unwrap();
    let confirmed = user.original().clone();

    user.set("name", "Alicia").unwrap();
    driver.fail_next_put();

    assert!(matches!(user.save().await, Err(DocumentError::DriverFailure(_))));
    assert_eq!(user.original(), &confirmed);
    assert!(user.is_dirty());

    user.save().await.unwrap();

    let log = driver.put_log();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0], log[1]);
    assert_eq!(user.original(), user.raw());
}

#[tokio::test]
async fn overwriting_the_primary_key_is_rejected() {
    let driver = RecordingDriver::new();
    let users = users(driver.clone());

    let mut user = users.create_with(alice()).unwrap();
    user.save().await.unwrap();

    user.set("id", "someone-else").unwrap();
    let err = user.save().await.unwrap_err();

    assert!(matches!(err, DocumentError::PrimaryKeyModified(ref f) if f == "id"));
    assert_eq!(driver.puts(), 0);
}

#[tokio::test]
async fn caller_supplied_keys_are_kept() {
    let users = users(RecordingDriver::new());

    let mut user = users.create_with(alice()).unwrap();
    user.set("id", "alice").unwrap();
    user.save().await.unwrap();

    assert_eq!(user.key(), Some(&Key::from("alice")));

    let mut clash = users.create_with(alice()).unwrap();
    clash.set("id", "alice").unwrap();
    assert!(matches!(clash.save().await, Err(DocumentError::AlreadyExists(..))));
    assert!(clash.is_new());
}

// ── Primary keys ────────────────────────────────────────────────

#[tokio::test]
async fn store_assigned_keys_satisfy_a_required_key_field() {
    let schema = Schema::builder()
        .field("id", FieldConstraint::string().required())
        .field("name", FieldConstraint::string())
        .primary_key("id")
        .build()
        .unwrap();
    let things = Model::builder(schema, "things", RecordingDriver::new())
        .build()
        .unwrap();

    let mut thing = things.create_with(doc! { "name": "a" }).unwrap();
    thing.save().await.unwrap();
    let key = thing.key().cloned().unwrap();
    assert_eq!(thing.get("id").unwrap(), Some(Bson::String(key.to_string())));

    thing.set("name", "b").unwrap();
    thing.save().await.unwrap();
    assert_eq!(things.get(key).await.unwrap().get("name").unwrap(), Some(Bson::String("b".into())));

    // Once persisted, the key field is checked like any other.
    thing.raw_mut().remove("id");
    match thing.save().await.unwrap_err() {
        DocumentError::ValidationFailed(errors) => assert_eq!(errors.get("id"), Some("is required")),
        other => panic!("expected validation failure, got {other:?}"),
    }
}

#[test]
fn primary_keys_must_be_string_fields() {
    let schema = Schema::builder()
        .field("id", FieldConstraint::integer())
        .field("name", FieldConstraint::string())
        .primary_key("id")
        .build();

    assert!(matches!(schema, Err(DocumentError::InvalidSchema(_))));
}

// ── Delete ──────────────────────────────────────────────────────

#[tokio::test]
async fn deleting_detaches_the_document() {
    let driver = RecordingDriver::new();
    let users = users(driver.clone());

    let mut unsaved = users.create_with(alice()).unwrap();
    assert!(matches!(unsaved.delete().await, Err(DocumentError::MissingPrimaryKey)));

    let mut user = users.create_with(alice()).unwrap();
    user.save().await.unwrap();
    let key = user.key().cloned().unwrap();

    user.delete().await.unwrap();
    assert!(user.is_detached());
    assert_eq!(user.key(), None);

    assert!(matches!(user.get("name"), Err(DocumentError::Detached)));
    assert!(matches!(user.set("name", "x"), Err(DocumentError::Detached)));
    assert!(matches!(user.save().await, Err(DocumentError::Detached)));
    assert!(matches!(user.update(doc! { "name": "x" }).await, Err(DocumentError::Detached)));
    assert!(matches!(user.delete().await, Err(DocumentError::Detached)));

    assert!(matches!(users.get(key).await, Err(DocumentError::NotFound(..))));
    assert_eq!(driver.dels(), 1);
}

// ── Update ──────────────────────────────────────────────────────

#[tokio::test]
async fn update_honours_the_whitelist() {
    let users = users(RecordingDriver::new());
    let mut user = users.create_with(alice()).unwrap();
    user.save().await.unwrap();

    user.update(doc! { "name": "Alicia", "email": "evil@example.com", "age": 29 })
        .await
        .unwrap();

    assert_eq!(user.get("name").unwrap(), Some(Bson::String("Alicia".into())));
    assert_eq!(user.get("email").unwrap(), Some(Bson::String("alice@example.com".into())));

    let stored = users.get(user.key().cloned().unwrap()).await.unwrap();
    assert_eq!(stored.get("age").unwrap(), Some(Bson::Int32(29)));
    assert_eq!(stored.get("email").unwrap(), Some(Bson::String("alice@example.com".into())));
}

#[tokio::test]
async fn update_is_all_or_nothing() {
    let driver = RecordingDriver::new();
    let users = users(driver.clone());
    let mut user = users.create_with(alice()).unwrap();
    user.save().await.unwrap();
    let before = user.raw().clone();

    let err = user
        .update(doc! { "name": "Alicia", "age": "not a number" })
        .await
        .unwrap_err();

    assert!(matches!(err, DocumentError::ValidationFailed(_)));
    assert_eq!(user.raw(), &before);
    assert_eq!(driver.puts(), 0);
}

// ── Hooks ───────────────────────────────────────────────────────

#[derive(Default)]
struct AuditHooks {
    saves: AtomicUsize,
    updates: AtomicUsize,
}

impl Hooks for AuditHooks {
    fn will_save(&self, document: &mut Document) -> DocumentResult<()> {
        if document.get("name")? == Some(Bson::String("forbidden".into())) {
            return Err(DocumentError::Hook("name is forbidden".to_string()));
        }
        Ok(())
    }

    fn did_save(&self, _document: &Document) -> DocumentResult<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn will_update(&self, _document: &mut Document, patch: &mut RawRecord) -> DocumentResult<()> {
        if let Ok(name) = patch.get_str("name") {
            let trimmed = name.trim().to_string();
            patch.insert("name", trimmed);
        }
        Ok(())
    }

    fn did_update(&self, _document: &Document) -> DocumentResult<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn hooks_run_around_writes_and_can_abort() {
    let driver = RecordingDriver::new();
    let hooks = Arc::new(AuditHooks::default());
    let users = Model::builder(user_schema(), "users", driver.clone())
        .updatable(["name"])
        .hooks(hooks.clone())
        .build()
        .unwrap();

    let mut user = users.create_with(alice()).unwrap();
    user.save().await.unwrap();
    assert_eq!(hooks.saves.load(Ordering::SeqCst), 1);

    user.update(doc! { "name": "  Alicia  " }).await.unwrap();
    assert_eq!(user.get("name").unwrap(), Some(Bson::String("Alicia".into())));
    assert_eq!(hooks.updates.load(Ordering::SeqCst), 1);
    assert_eq!(hooks.saves.load(Ordering::SeqCst), 2);

    user.set("name", "forbidden").unwrap();
    assert!(matches!(user.save().await, Err(DocumentError::Hook(_))));
    assert_eq!(driver.puts(), 1);
    assert_eq!(hooks.saves.load(Ordering::SeqCst), 2);
}

// ── Dynamic fields and projections ──────────────────────────────

#[derive(Debug, Deserialize, PartialEq)]
struct UserView {
    name: String,
    email: String,
    status: String,
    display: String,
}

fn users_with_dynamic_fields() -> Model {
    Model::builder(user_schema(), "users", RecordingDriver::new())
        .dynamic_field("notes", DynamicField::stored())
        .dynamic_field(
            "nickname",
            DynamicField::validated(|value| match value {
                Bson::String(s) if !s.trim().is_empty() => Ok(Bson::String(s.trim().to_string())),
                _ => Err("must be a non-empty string".to_string()),
            }),
        )
        .dynamic_field(
            "display",
            DynamicField::computed(|record| {
                let name = record.get_str("name").unwrap_or_default();
                let email = record.get_str("email").unwrap_or_default();
                Bson::String(format!("{name} <{email}>"))
            }),
        )
        .build()
        .unwrap()
}

#[tokio::test]
async fn dynamic_fields_are_stored_or_computed() {
    let users = users_with_dynamic_fields();
    let mut user = users.create_with(alice()).unwrap();

    user.set("notes", doc! { "free": "form" }).unwrap();
    assert_eq!(
        user.get("display").unwrap(),
        Some(Bson::String("Alice <alice@example.com>".into()))
    );
    assert!(matches!(user.set("display", "x"), Err(DocumentError::ReadOnlyField(_))));

    user.set("nickname", "  Al ").unwrap();
    assert_eq!(user.get("nickname").unwrap(), Some(Bson::String("Al".into())));

    let before = user.raw().clone();
    match user.set("nickname", 7).unwrap_err() {
        DocumentError::ValidationFailed(errors) => {
            assert_eq!(errors.get("nickname"), Some("must be a non-empty string"));
        }
        other => panic!("expected validation failure, got {other:?}"),
    }
    assert_eq!(user.raw(), &before);

    user.save().await.unwrap();
    let stored = users.get(user.key().cloned().unwrap()).await.unwrap();
    assert_eq!(stored.get("notes").unwrap(), Some(Bson::Document(doc! { "free": "form" })));
    assert!(stored.raw().get("display").is_none());
    assert_eq!(stored.get("nickname").unwrap(), Some(Bson::String("Al".into())));
}

#[tokio::test]
async fn views_deserialize_and_serialize() {
    let users = users_with_dynamic_fields();
    let user = users.create_with(alice()).unwrap();

    let view: UserView = user.deserialize().unwrap();
    assert_eq!(
        view,
        UserView {
            name: "Alice".into(),
            email: "alice@example.com".into(),
            status: "active".into(),
            display: "Alice <alice@example.com>".into(),
        }
    );

    let json = user.to_json().unwrap();
    assert_eq!(json["display"], serde_json::json!("Alice <alice@example.com>"));
    assert_eq!(json["status"], serde_json::json!("active"));
}

#[tokio::test]
async fn each_model_reads_through_its_own_driver() {
    let one = users(RecordingDriver::new());
    let two = users(RecordingDriver::new());

    let mut user = one.create_with(alice()).unwrap();
    user.save().await.unwrap();
    let key = user.key().cloned().unwrap();

    assert!(one.get(key.clone()).await.is_ok());
    assert!(matches!(two.get(key).await, Err(DocumentError::NotFound(..))));
}
