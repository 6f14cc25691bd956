//! Error types for query-generation backends.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    /// The name matches no backend variant.
    #[error("unknown backend '{name}'. Valid values: llama, ollama, openai, gpt, gemini")]
    Unknown { name: String },

    /// The variant exists but its configuration cannot be used.
    #[error("{backend} backend is not configured: {reason}")]
    NotConfigured {
        backend: &'static str,
        reason: &'static str,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The upstream could not be reached or timed out.
    #[error("failed to contact {backend}: {source}")]
    Request {
        backend: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The upstream answered with a non-success status.
    #[error("{backend} error ({status}): {body}")]
    Status {
        backend: &'static str,
        status: u16,
        body: String,
    },

    #[error("failed to parse {backend} response: {source}")]
    Decode {
        backend: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{backend} returned an empty completion")]
    EmptyCompletion { backend: &'static str },
}
