//! Shared reqwest plumbing for the API and segmentation clients.

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::config::ClientConfig;
use crate::error::KaleError;
use crate::notice::status_message;

/// Error bodies: the API server sends `message`, the segmentation service
/// (FastAPI) sends `detail`.
#[derive(Debug, Deserialize)]
struct ServerMessage {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    detail: Option<Value>,
}

/// Human-readable message from an error body, if there is one. Short
/// non-JSON bodies are used as-is.
fn server_message(body: &str) -> Option<String> {
    if let Ok(parsed) = serde_json::from_str::<ServerMessage>(body) {
        let detail = parsed
            .detail
            .and_then(|d| d.as_str().map(str::to_string));
        if let Some(message) = parsed.message.or(detail) {
            return Some(message);
        }
    }
    let trimmed = body.trim();
    (!trimmed.is_empty() && trimmed.len() < 200 && !trimmed.starts_with('{'))
        .then(|| trimmed.to_string())
}

/// Build the HTTP client for a config. The timeout only applies natively;
/// the browser's fetch has no per-client timeout.
pub fn build_client(config: &ClientConfig) -> Result<reqwest::Client, KaleError> {
    let builder = reqwest::Client::builder();

    #[cfg(not(target_arch = "wasm32"))]
    let builder = builder
        .user_agent(concat!("KaleCheck/", env!("CARGO_PKG_VERSION")))
        .timeout(std::time::Duration::from_secs(config.request_timeout_secs));

    #[cfg(target_arch = "wasm32")]
    let _ = config;

    builder
        .build()
        .map_err(|e| KaleError::Transport(format!("Failed to build HTTP client: {}", e)))
}

/// Turn a non-2xx response into a [`KaleError::Status`], reading the
/// server's `message` when the body is JSON.
pub async fn status_error(response: reqwest::Response) -> KaleError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let server_message = server_message(&body);

    warn!(
        "Request failed with {}: {}",
        status,
        server_message.as_deref().unwrap_or("<no message>")
    );

    KaleError::Status {
        code: status.as_u16(),
        message: status_message(
            status.as_u16(),
            server_message.as_deref(),
            status.canonical_reason(),
        ),
    }
}
