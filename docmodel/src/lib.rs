//! Main docmodel crate: schema-validated documents over pluggable stores.
//!
//! This crate is the primary entry point for users of the docmodel framework.
//! It re-exports the core types from the sub-crates and provides access to the
//! bundled drivers.
//!
//! # Features
//!
//! - **Declared schemas** - Field constraints, custom validators and transformers
//! - **Guarded access** - Only declared fields can be read or written; undeclared
//!   fields already in a record are preserved untouched
//! - **Partial saves** - Only fields that changed since the last load are written
//! - **Pluggable drivers** - In-memory and MongoDB drivers behind one trait
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use docmodel::{prelude::*, memory::InMemoryDriver};
//!
//! #[tokio::main]
//! async fn main() -> DocumentResult<()> {
//!     let schema = Schema::builder()
//!         .field("id", FieldConstraint::string())
//!         .field("name", FieldConstraint::string().required())
//!         .field("email", FieldConstraint::string().required().format("email"))
//!         .primary_key("id")
//!         .build()?;
//!
//!     let users = Model::builder(schema, "users", Arc::new(InMemoryDriver::new()))
//!         .updatable(["name"])
//!         .build()?;
//!
//!     // Create and save a document
//!     let mut user = users.create();
//!     user.set("name", "Alice")?;
//!     user.set("email", "alice@example.com")?;
//!     user.save().await?;
//!
//!     // Load it back and apply an external patch
//!     let mut loaded = users.get(user.key().cloned().unwrap()).await?;
//!     loaded.update(bson::doc! { "name": "Alicia", "email": "ignored@example.com" }).await?;
//!
//!     // Query
//!     let found = users.find(Field::new("name").eq("Alicia")).await?;
//!     println!("found {} users", found.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Drivers
//!
//! - [`memory`] - In-memory driver for development and testing
//! - [`mongodb`] - MongoDB driver (requires the `mongodb` feature)
//!
//! Custom drivers implement [`driver::Driver`]; the [`async_trait`] attribute
//! is re-exported for that purpose.

pub mod prelude;

pub use docmodel_core::{diff, document, driver, error, model, page, query, schema};

pub use async_trait::async_trait;

// Re-export BSON types for convenience
pub use bson;

/// In-memory driver implementations.
pub mod memory {
    pub use docmodel_memory::{InMemoryDriver, InMemoryDriverBuilder};
}

/// MongoDB driver implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docmodel_mongodb::{Consistency, MongoDbDriver, MongoDbDriverBuilder};
}
