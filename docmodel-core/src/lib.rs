//! Schema-validated documents over pluggable backing stores.
//!
//! This crate is the core of the docmodel project and provides:
//!
//! - **Schemas** ([`schema`]) - Field constraints, validators, transformers and formats
//! - **Documents** ([`document`]) - Guarded field access and the save/delete/update lifecycle
//! - **Models** ([`model`]) - Factories binding a schema, a bucket and a driver
//! - **Change tracking** ([`diff`]) - Field-level diffs used for partial updates
//! - **Driver contract** ([`driver`]) - The trait every backing-store adapter implements
//! - **Query API** ([`query`]) - Filter expressions and sort keys passed to drivers
//! - **Pagination** ([`page`]) - Offset/limit result pages
//! - **Error handling** ([`error`]) - Error and validation result types
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use docmodel_core::{model::Model, schema::{Schema, FieldConstraint}};
//!
//! let schema = Schema::builder()
//!     .field("id", FieldConstraint::string())
//!     .field("name", FieldConstraint::string().required())
//!     .primary_key("id")
//!     .build()?;
//!
//! let users = Model::builder(schema, "users", driver).build()?;
//!
//! let mut user = users.create();
//! user.set("name", "Marco")?;
//! user.save().await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmodel_core;

pub mod diff;
pub mod document;
pub mod driver;
pub mod error;
pub mod model;
pub mod page;
pub mod query;
pub mod schema;
