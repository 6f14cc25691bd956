//! Google Gemini `generateContent`.

use crate::error::BackendError;
use crate::http::{endpoint, non_empty, read_json};
use crate::prompt::{self, Prompt};
use crate::QueryBackend;
use askdb_adapter::ResultSet;
use askdb_core::{GeminiConfig, SchemaSnapshot};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const NAME: &str = "gemini";

#[derive(Debug, Clone)]
pub struct GeminiBackend {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GeminiBackend {
    /// Fails with `NotConfigured` when no API key is set.
    pub fn new(client: Client, config: &GeminiConfig) -> Result<Self, BackendError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(BackendError::NotConfigured {
                backend: NAME,
                reason: "api_key is required",
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            api_key,
            temperature: config.temperature,
        })
    }

    async fn complete(&self, prompt: Prompt) -> Result<String, BackendError> {
        let body = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part { text: prompt.system }],
            },
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part { text: prompt.user }],
            }],
            generation_config: self
                .temperature
                .map(|temperature| GenerationConfig { temperature }),
        };

        let path = format!("v1beta/models/{}:generateContent", self.model);
        let response = self
            .client
            .post(endpoint(&self.base_url, &path))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|source| BackendError::Request {
                backend: NAME,
                source,
            })?;

        let parsed: GenerateContentResponse = read_json(NAME, response).await?;
        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default();
        non_empty(NAME, text)
    }
}

#[async_trait]
impl QueryBackend for GeminiBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn generate_query(
        &self,
        schema: &SchemaSnapshot,
        question: &str,
    ) -> Result<String, BackendError> {
        self.complete(prompt::query_prompt(schema, question)).await
    }

    async fn generate_summary(
        &self,
        result: &ResultSet,
        question: &str,
    ) -> Result<String, BackendError> {
        self.complete(prompt::summary_prompt(result, question)).await
    }
}
