//! OpenAI chat completions.

use crate::error::BackendError;
use crate::http::{endpoint, non_empty, read_json};
use crate::prompt::{self, Prompt};
use crate::QueryBackend;
use askdb_adapter::ResultSet;
use askdb_core::{OpenAiConfig, SchemaSnapshot};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const NAME: &str = "openai";

#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    org_id: Option<String>,
    project_id: Option<String>,
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

impl OpenAiBackend {
    /// Fails with `NotConfigured` when no API key is set.
    pub fn new(client: Client, config: &OpenAiConfig) -> Result<Self, BackendError> {
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
            org_id: config.org_id.clone(),
            project_id: config.project_id.clone(),
            temperature: config.temperature,
        })
    }

    async fn complete(&self, prompt: Prompt) -> Result<String, BackendError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: Some(prompt.system),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: Some(prompt.user),
                },
            ],
            temperature: self.temperature,
        };

        let mut request = self
            .client
            .post(endpoint(&self.base_url, "v1/chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&body);
        if let Some(org_id) = &self.org_id {
            request = request.header("OpenAI-Organization", org_id);
        }
        if let Some(project_id) = &self.project_id {
            request = request.header("OpenAI-Project", project_id);
        }

        let response = request.send().await.map_err(|source| BackendError::Request {
            backend: NAME,
            source,
        })?;

        let parsed: ChatResponse = read_json(NAME, response).await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        non_empty(NAME, content)
    }
}

#[async_trait]
impl QueryBackend for OpenAiBackend {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::{client, serve};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    fn config(base_url: String) -> OpenAiConfig {
        OpenAiConfig {
            base_url,
            api_key: Some("sk-test".to_string()),
            org_id: Some("org-1".to_string()),
            ..OpenAiConfig::default()
        }
    }

    #[test]
    fn test_requires_api_key() {
        let err = OpenAiBackend::new(client(), &OpenAiConfig::default()).unwrap_err();
        assert!(matches!(err, BackendError::NotConfigured { backend: "openai", .. }));

        let blank = OpenAiConfig {
            api_key: Some("  ".to_string()),
            ..OpenAiConfig::default()
        };
        assert!(OpenAiBackend::new(client(), &blank).is_err());
    }

    #[tokio::test]
    async fn test_chat_completion() {
        let seen: Arc<Mutex<Option<(HeaderMap, Value)>>> = Arc::default();
        let captured = seen.clone();
        let router = Router::new().route(
            "/v1/chat/completions",
            post(move |headers: HeaderMap, Json(body): Json<Value>| {
                let captured = captured.clone();
                async move {
                    *captured.lock().unwrap() = Some((headers, body));
                    Json(json!({
                        "id": "chatcmpl-1",
                        "choices": [{"index": 0, "message": {"role": "assistant", "content": "There are 2 accounts."}}]
                    }))
                }
            }),
        );
        let backend = OpenAiBackend::new(client(), &config(serve(router).await)).unwrap();

        let text = backend
            .generate_summary(&ResultSet::default(), "how many accounts exist?")
            .await
            .unwrap();
        assert_eq!(text, "There are 2 accounts.");

        let (headers, body) = seen.lock().unwrap().clone().unwrap();
        assert_eq!(headers["authorization"], "Bearer sk-test");
        assert_eq!(headers["openai-organization"], "org-1");
        assert!(headers.get("openai-project").is_none());
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert!(body.get("temperature").is_none());
    }

    #[tokio::test]
    async fn test_unauthorized() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async { (StatusCode::UNAUTHORIZED, r#"{"error":{"message":"bad key"}}"#) }),
        );
        let backend = OpenAiBackend::new(client(), &config(serve(router).await)).unwrap();

        let err = backend
            .generate_query(&SchemaSnapshot::new(), "q")
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Status { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_no_choices() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async { Json(json!({"choices": []})) }),
        );
        let backend = OpenAiBackend::new(client(), &config(serve(router).await)).unwrap();

        let err = backend
            .generate_query(&SchemaSnapshot::new(), "q")
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::EmptyCompletion { .. }));
    }
}
