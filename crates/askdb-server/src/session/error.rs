use askdb_adapter::AdapterError;
use askdb_backend::BackendError;
use askdb_core::ProtocolError;
use askdb_guard::QueryRejection;
use askdb_runtime::{ConvertError, Stage};
use thiserror::Error;

/// Failures observed by a session.
///
/// Everything except `Connection` becomes an error response and the session
/// keeps running; `Connection` tears the session down.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    MalformedMessage(#[from] ProtocolError),

    #[error("database chat has not been initialized: send attach-database first")]
    NotInitialized,

    #[error("unknown backend: {0}")]
    UnknownBackend(String),

    #[error("{stage} generation failed: {source}")]
    Generation {
        stage: Stage,
        #[source]
        source: BackendError,
    },

    #[error("unsafe query rejected: {0}")]
    UnsafeQuery(#[source] QueryRejection),

    #[error(transparent)]
    Execution(AdapterError),

    #[error(transparent)]
    Introspection(AdapterError),

    #[error("connection error: {0}")]
    Connection(String),
}

impl From<ConvertError> for SessionError {
    fn from(err: ConvertError) -> Self {
        match err {
            ConvertError::UnknownBackend { name } => SessionError::UnknownBackend(name),
            ConvertError::Generation { stage, source } => SessionError::Generation { stage, source },
            ConvertError::UnsafeQuery(rejection) => SessionError::UnsafeQuery(rejection),
            ConvertError::Execution(err) => SessionError::Execution(err),
        }
    }
}
