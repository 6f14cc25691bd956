//! # askdb-server
//!
//! WebSocket session server. Each connection becomes a [`Session`] that can
//! attach one database and answer natural-language questions about it.

pub mod config;
pub mod registry;
pub mod routes;
pub mod session;
pub mod state;

pub use registry::{SessionEntry, SessionId, SessionRegistry};
pub use routes::router;
pub use session::{Dispatcher, Session, SessionContext, SessionError};
pub use state::AppState;
