//! Query-generation backend configuration.
//!
//! Each backend section describes how to reach one upstream model. API keys
//! should preferably come from the environment (see `ASKDB_OPENAI_API_KEY`
//! and `ASKDB_GEMINI_API_KEY`) rather than the config file.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backend selection and upstream settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendsConfig {
    /// Backend used when an `ask` message does not name one.
    #[serde(default = "default_backend")]
    pub default: String,

    /// Timeout applied to every upstream HTTP request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub ollama: OllamaConfig,

    #[serde(default)]
    pub openai: OpenAiConfig,

    #[serde(default)]
    pub gemini: GeminiConfig,
}

impl Default for BackendsConfig {
    fn default() -> Self {
        Self {
            default: default_backend(),
            request_timeout_secs: default_request_timeout_secs(),
            ollama: OllamaConfig::default(),
            openai: OpenAiConfig::default(),
            gemini: GeminiConfig::default(),
        }
    }
}

impl BackendsConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Local Ollama server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_ollama_url")]
    pub base_url: String,

    #[serde(default = "default_ollama_model")]
    pub model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_ollama_url(),
            model: default_ollama_model(),
        }
    }
}

/// OpenAI chat completions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default = "default_openai_url")]
    pub base_url: String,

    #[serde(default = "default_openai_model")]
    pub model: String,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Sent as `OpenAI-Organization` when set.
    #[serde(default)]
    pub org_id: Option<String>,

    /// Sent as `OpenAI-Project` when set.
    #[serde(default)]
    pub project_id: Option<String>,

    #[serde(default)]
    pub temperature: Option<f32>,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_url(),
            model: default_openai_model(),
            api_key: None,
            org_id: None,
            project_id: None,
            temperature: None,
        }
    }
}

/// Google Gemini `generateContent`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default = "default_gemini_url")]
    pub base_url: String,

    #[serde(default = "default_gemini_model")]
    pub model: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub temperature: Option<f32>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: default_gemini_url(),
            model: default_gemini_model(),
            api_key: None,
            temperature: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_backend() -> String {
    "llama".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3".to_string()
}

fn default_openai_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_gemini_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}
