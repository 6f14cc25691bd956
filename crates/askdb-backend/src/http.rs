//! Response handling shared by the HTTP backends.

use crate::error::BackendError;
use reqwest::Response;
use serde::de::DeserializeOwned;
use tracing::{debug, error};

/// Read the body of a response, failing on any non-2xx status.
pub(crate) async fn read_json<T: DeserializeOwned>(
    backend: &'static str,
    response: Response,
) -> Result<T, BackendError> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|source| BackendError::Request { backend, source })?;

    debug!(backend, status = %status, bytes = text.len(), "upstream responded");

    if !status.is_success() {
        error!(backend, status = %status, body = %text, "upstream error");
        return Err(BackendError::Status {
            backend,
            status: status.as_u16(),
            body: text,
        });
    }

    serde_json::from_str(&text).map_err(|source| BackendError::Decode { backend, source })
}

/// Reject completions that are empty after trimming.
pub(crate) fn non_empty(backend: &'static str, text: String) -> Result<String, BackendError> {
    if text.trim().is_empty() {
        return Err(BackendError::EmptyCompletion { backend });
    }
    Ok(text)
}

pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
pub(crate) mod testing {
    use axum::Router;

    /// Serve a router on an ephemeral local port and return its base URL.
    pub async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    pub fn client() -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(5))
            .build()
            .unwrap()
    }
}
