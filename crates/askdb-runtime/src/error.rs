use askdb_adapter::AdapterError;
use askdb_backend::BackendError;
use askdb_guard::QueryRejection;
use thiserror::Error;

/// Pipeline step that called a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Query,
    Summary,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Query => f.write_str("query"),
            Stage::Summary => f.write_str("summary"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("unknown backend: {name}")]
    UnknownBackend { name: String },

    #[error("{stage} generation failed: {source}")]
    Generation {
        stage: Stage,
        #[source]
        source: BackendError,
    },

    /// The generated query failed the safety gate and was not executed.
    #[error("unsafe query rejected: {0}")]
    UnsafeQuery(#[source] QueryRejection),

    #[error(transparent)]
    Execution(AdapterError),
}
