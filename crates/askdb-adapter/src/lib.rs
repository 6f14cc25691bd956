//! # askdb-adapter
//!
//! Everything that touches an attached database:
//!
//! - [`Database`]: a pooled handle for PostgreSQL, MySQL or SQLite
//! - [`SchemaMapper`]: per-engine catalog readers producing a
//!   [`SchemaSnapshot`](askdb_core::SchemaSnapshot)
//! - [`ResultSet`]: query results materialized as JSON records

pub mod database;
pub mod engine;
pub mod error;
pub mod introspect;
pub mod records;

pub use database::Database;
pub use engine::Engine;
pub use error::AdapterError;
pub use introspect::{mapper_for, mapper_for_engine, SchemaMapper};
pub use records::{Record, ResultSet};
