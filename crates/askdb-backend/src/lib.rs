//! # askdb-backend
//!
//! Query-generation backends turn a question plus a schema snapshot into SQL,
//! and a result set plus the question into a conversational summary. Every
//! variant hides its upstream call contract behind [`QueryBackend`].
//!
//! | Names | Upstream |
//! |-------|----------|
//! | `llama`, `ollama` | Ollama `/api/generate` |
//! | `openai`, `gpt` | OpenAI `/v1/chat/completions` |
//! | `gemini` | Gemini `generateContent` |

pub mod error;
pub mod gemini;
mod http;
pub mod ollama;
pub mod openai;
pub mod prompt;

pub use error::BackendError;
pub use gemini::GeminiBackend;
pub use ollama::OllamaBackend;
pub use openai::OpenAiBackend;
pub use prompt::normalize_generated_sql;

use askdb_adapter::ResultSet;
use askdb_core::{BackendsConfig, SchemaSnapshot};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

/// A natural-language query and summary generator.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Produce a SQL query answering `question` against `schema`.
    async fn generate_query(
        &self,
        schema: &SchemaSnapshot,
        question: &str,
    ) -> Result<String, BackendError>;

    /// Produce a textual answer to `question` from query results.
    async fn generate_summary(
        &self,
        result: &ResultSet,
        question: &str,
    ) -> Result<String, BackendError>;
}

/// The closed set of backend variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Ollama,
    OpenAi,
    Gemini,
}

impl BackendKind {
    pub const ALL: [BackendKind; 3] = [BackendKind::Ollama, BackendKind::OpenAi, BackendKind::Gemini];

    /// Every name that selects this variant.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            BackendKind::Ollama => &["llama", "ollama"],
            BackendKind::OpenAi => &["openai", "gpt"],
            BackendKind::Gemini => &["gemini"],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::Ollama => "ollama",
            BackendKind::OpenAi => "openai",
            BackendKind::Gemini => "gemini",
        }
    }
}

impl FromStr for BackendKind {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        BackendKind::ALL
            .into_iter()
            .find(|kind| kind.aliases().contains(&name.as_str()))
            .ok_or(BackendError::Unknown { name })
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Backends available to the server, addressable by any of their names.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    backends: HashMap<String, Arc<dyn QueryBackend>>,
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("names", &self.names())
            .finish()
    }
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every backend whose configuration is usable.
    ///
    /// Variants missing required settings are skipped with a warning; the
    /// remaining ones share one HTTP client. The configured default must
    /// name a known variant.
    pub fn from_config(config: &BackendsConfig) -> Result<Self, BackendError> {
        let default: BackendKind = config.default.parse()?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(BackendError::Client)?;

        let mut registry = Self::new();

        if config.ollama.enabled {
            registry.register_kind(
                BackendKind::Ollama,
                Arc::new(OllamaBackend::new(client.clone(), &config.ollama)),
            );
        }

        match OpenAiBackend::new(client.clone(), &config.openai) {
            Ok(backend) => registry.register_kind(BackendKind::OpenAi, Arc::new(backend)),
            Err(e) => warn!(error = %e, "openai backend disabled"),
        }

        match GeminiBackend::new(client, &config.gemini) {
            Ok(backend) => registry.register_kind(BackendKind::Gemini, Arc::new(backend)),
            Err(e) => warn!(error = %e, "gemini backend disabled"),
        }

        if !registry.contains(&config.default) {
            warn!(
                backend = %default,
                available = ?registry.names(),
                "default backend is not configured; asks without a backend will fail"
            );
        }
        info!(backends = ?registry.names(), "backends registered");
        Ok(registry)
    }

    /// Register a backend under one name.
    pub fn register(&mut self, name: impl AsRef<str>, backend: Arc<dyn QueryBackend>) {
        self.backends
            .insert(name.as_ref().trim().to_lowercase(), backend);
    }

    /// Register a backend under every alias of its kind.
    pub fn register_kind(&mut self, kind: BackendKind, backend: Arc<dyn QueryBackend>) {
        for alias in kind.aliases() {
            self.register(alias, backend.clone());
        }
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<Arc<dyn QueryBackend>> {
        self.backends.get(&name.trim().to_lowercase()).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.backends.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}
