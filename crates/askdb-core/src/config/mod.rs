//! Configuration types for askdb.
//!
//! A single `AskdbConfig` is loaded from a TOML file (`askdb.toml` by default)
//! and optionally patched from the environment. Every section has serde
//! defaults, so an empty file is a valid configuration.
//!
//! # Sections
//!
//! - **server**: bind address and log level
//! - **session**: keepalive timings and queue capacities
//! - **guard**: restricted keywords for the SQL safety gate
//! - **database**: pool sizing and result limits for attached databases
//! - **backends**: default backend and per-backend upstream settings

pub mod backend;
pub mod database;
pub mod guard;
pub mod server;
pub mod session;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub use backend::{BackendsConfig, GeminiConfig, OllamaConfig, OpenAiConfig};
pub use database::DatabaseConfig;
pub use guard::GuardConfig;
pub use server::ServerConfig;
pub use session::SessionConfig;

/// Environment variable overriding `backends.openai.api_key`.
pub const OPENAI_API_KEY_ENV: &str = "ASKDB_OPENAI_API_KEY";

/// Environment variable overriding `backends.gemini.api_key`.
pub const GEMINI_API_KEY_ENV: &str = "ASKDB_GEMINI_API_KEY";

/// Complete askdb configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AskdbConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Per-connection session settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// SQL safety gate settings.
    #[serde(default)]
    pub guard: GuardConfig,

    /// Attached database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Query-generation backends.
    #[serde(default)]
    pub backends: BackendsConfig,
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AskdbConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML content.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::from)
    }

    /// Apply secrets supplied through the environment.
    ///
    /// Values found in the environment win over values from the file.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(OPENAI_API_KEY_ENV).filter(|k| !k.is_empty()) {
            self.backends.openai.api_key = Some(key);
        }
        if let Some(key) = lookup(GEMINI_API_KEY_ENV).filter(|k| !k.is_empty()) {
            self.backends.gemini.api_key = Some(key);
        }
    }

    /// Check cross-field invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let session = &self.session;
        if session.ping_interval_secs == 0 {
            return Err(ConfigError::Config(
                "session.ping_interval_secs must be greater than zero".to_string(),
            ));
        }
        if session.ping_interval_secs >= session.read_deadline_secs {
            return Err(ConfigError::Config(format!(
                "session.ping_interval_secs ({}) must be shorter than session.read_deadline_secs ({})",
                session.ping_interval_secs, session.read_deadline_secs
            )));
        }
        if session.inbound_capacity == 0 || session.outbound_capacity == 0 {
            return Err(ConfigError::Config(
                "session queue capacities must be greater than zero".to_string(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Config(
                "database.max_connections must be greater than zero".to_string(),
            ));
        }
        if self.database.max_result_rows == 0 {
            return Err(ConfigError::Config(
                "database.max_result_rows must be greater than zero".to_string(),
            ));
        }
        if self.backends.default.trim().is_empty() {
            return Err(ConfigError::Config(
                "backends.default must name a backend".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = AskdbConfig::from_toml("").unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(config.session.read_deadline_secs, 60);
        assert_eq!(config.session.ping_interval_secs, 50);
        assert_eq!(config.session.inbound_capacity, 256);
        assert_eq!(config.backends.default, "llama");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
bind = "127.0.0.1:9000"

[session]
read_deadline_secs = 30
ping_interval_secs = 20

[guard]
restricted_keywords = ["secret"]

[backends]
default = "openai"

[backends.openai]
model = "gpt-4o-mini"
"#
        )
        .unwrap();

        let config = AskdbConfig::from_file(file.path()).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:9000");
        assert_eq!(config.session.read_deadline_secs, 30);
        assert_eq!(config.guard.restricted_keywords, vec!["secret".to_string()]);
        assert_eq!(config.backends.default, "openai");
        assert_eq!(config.backends.openai.model, "gpt-4o-mini");
        // Untouched sections keep their defaults
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_ping_must_be_shorter_than_deadline() {
        let mut config = AskdbConfig::default();
        config.session.ping_interval_secs = 60;
        config.session.read_deadline_secs = 60;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("ping_interval_secs"));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut config = AskdbConfig::default();
        config.session.outbound_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_result_rows_rejected() {
        let config = AskdbConfig::from_toml("[database]\nmax_result_rows = 0").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_result_rows"));
        assert!(AskdbConfig::from_toml("[database]\nmax_result_rows = 1").unwrap().validate().is_ok());
    }

    #[test]
    fn test_env_overrides_api_keys() {
        let env: HashMap<&str, &str> = HashMap::from([
            (OPENAI_API_KEY_ENV, "sk-test"),
            (GEMINI_API_KEY_ENV, ""),
        ]);
        let mut config = AskdbConfig::default();
        config.backends.gemini.api_key = Some("from-file".to_string());

        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.backends.openai.api_key.as_deref(), Some("sk-test"));
        // Empty environment values do not clobber the file
        assert_eq!(config.backends.gemini.api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_invalid_toml() {
        let err = AskdbConfig::from_toml("[server\nbind=").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }
}
