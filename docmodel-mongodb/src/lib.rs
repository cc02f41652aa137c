//! MongoDB driver for docmodel.
//!
//! This crate provides a MongoDB-based implementation of the `Driver` trait,
//! persisting records as MongoDB documents and delegating filtering, sorting
//! and paging to the server's query engine.
//!
//! To use this driver, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docmodel = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Features
//!
//! - **Partial updates** - Saves become `$set`/`$unset` of the changed fields only
//! - **Majority consistency** - Writes default to `w: majority` with journaling,
//!   reads to `majority` read concern
//! - **Key escaping** - Field names containing `.` or `$` are stored safely
//! - **Raw queries** - `Expr::Raw` documents are passed to the server untouched
//!
//! # Keys
//!
//! A record's key is stored as the MongoDB `_id`. The primary-key field is
//! kept in the stored body as well, so the record reads back unchanged.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use docmodel::{driver::DriverBuilder, mongodb::{Consistency, MongoDbDriver}};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let driver = MongoDbDriver::builder("mongodb://localhost:27017", "my_database")
//!         .with_consistency(Consistency::Quorum)
//!         .build()
//!         .await?;
//!
//!     let users = Model::builder(schema, "users", Arc::new(driver)).build()?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmodel_mongodb;

pub mod driver;
mod escape;
mod query;

pub use driver::{Consistency, MongoDbDriver, MongoDbDriverBuilder};
