//! Local Ollama server (`/api/generate`).

use crate::error::BackendError;
use crate::http::{endpoint, non_empty, read_json};
use crate::prompt::{self, Prompt};
use crate::QueryBackend;
use askdb_adapter::ResultSet;
use askdb_core::{OllamaConfig, SchemaSnapshot};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const NAME: &str = "ollama";

#[derive(Debug, Clone)]
pub struct OllamaBackend {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

impl OllamaBackend {
    pub fn new(client: Client, config: &OllamaConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
        }
    }

    async fn complete(&self, prompt: Prompt) -> Result<String, BackendError> {
        let body = GenerateRequest {
            model: &self.model,
            prompt: prompt.combined(),
            stream: false,
        };

        let response = self
            .client
            .post(endpoint(&self.base_url, "api/generate"))
            .json(&body)
            .send()
            .await
            .map_err(|source| BackendError::Request {
                backend: NAME,
                source,
            })?;

        let parsed: GenerateResponse = read_json(NAME, response).await?;
        non_empty(NAME, parsed.response)
    }
}

#[async_trait]
impl QueryBackend for OllamaBackend {
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
