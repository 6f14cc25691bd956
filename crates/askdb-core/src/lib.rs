//! # askdb-core
//!
//! Types shared by every askdb crate: the session protocol envelopes, the
//! generic schema snapshot and the configuration tree.

// Configuration types shared across all askdb crates
pub mod config;
pub mod protocol;
pub mod schema;

pub use config::{
    AskdbConfig, BackendsConfig, ConfigError, DatabaseConfig, GeminiConfig, GuardConfig,
    OllamaConfig, OpenAiConfig, ServerConfig, SessionConfig,
};
pub use protocol::{
    AskPayload, AttachDatabasePayload, InboundMessage, ProtocolError, Response, ResponseStatus,
};
pub use schema::{ColumnTypes, SchemaSnapshot};
