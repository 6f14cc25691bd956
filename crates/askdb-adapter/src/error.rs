//! Error types for the adapter crate.

use crate::engine::Engine;
use thiserror::Error;

/// Errors raised while opening, introspecting or querying a database.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// No implementation exists for the engine tag.
    #[error("unsupported database engine: {tag}")]
    UnsupportedEngine { tag: String },

    /// The pool could not be opened.
    #[error("failed to connect to {engine} database: {source}")]
    Connect {
        engine: Engine,
        #[source]
        source: sqlx::Error,
    },

    /// Catalog metadata could not be read.
    #[error("failed to read database schema: {0}")]
    Introspection(#[source] sqlx::Error),

    /// An introspector was handed a handle for another engine.
    #[error("{mapper} introspector cannot read a {handle} database")]
    EngineMismatch { mapper: Engine, handle: Engine },

    /// A query failed at execution time.
    #[error("query execution failed: {0}")]
    Execution(#[source] sqlx::Error),
}
