//! In-memory driver for docmodel.
//!
//! This crate provides a thread-safe, in-memory implementation of the `Driver` trait.
//! It uses an async-aware read-write lock for concurrent access and is ideal for
//! development, testing, and small-scale deployments.
//!
//! # Features
//!
//! - **Linearizable writes** - Every operation runs under a single async-aware RwLock
//! - **Open records** - Records are kept as BSON documents, undeclared fields included
//! - **Query support** - Filtering on dotted paths, multi-key sorting and pagination
//! - **Unique indices** - `create_indices` enforces uniqueness on later writes
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use docmodel::{prelude::*, memory::InMemoryDriver};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let schema = Schema::builder()
//!         .field("id", FieldConstraint::string())
//!         .field("name", FieldConstraint::string().required())
//!         .primary_key("id")
//!         .build()?;
//!
//!     let users = Model::builder(schema, "users", Arc::new(InMemoryDriver::new())).build()?;
//!
//!     let mut user = users.create();
//!     user.set("name", "Alice")?;
//!     user.save().await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmodel_memory;

pub mod driver;
mod evaluator;

pub use driver::{InMemoryDriver, InMemoryDriverBuilder};
