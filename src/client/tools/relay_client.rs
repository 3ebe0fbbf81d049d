//! How tool panels reach the relay: over HTTP, or in-process.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::ToolError;
use crate::relay::{KeyedRelay, RelayRequest};
use crate::server::RELAY_PATH;

/// Send a prompt to the relay and get the upstream JSON back.
#[async_trait]
pub trait PromptRelay: Send + Sync {
    async fn send(&self, request: &RelayRequest) -> Result<serde_json::Value, ToolError>;
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

/// HTTP client for the relay endpoint.
pub struct RelayClient {
    client: reqwest::Client,
    endpoint: String,
}

impl RelayClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}{RELAY_PATH}", base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl PromptRelay for RelayClient {
    async fn send(&self, request: &RelayRequest) -> Result<serde_json::Value, ToolError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| ToolError::Relay(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|b| b.error)
                .and_then(|d| d.message)
                .unwrap_or_else(|| format!("Proxy Error: {status}"));
            return Err(ToolError::Relay(message));
        }

        resp.json()
            .await
            .map_err(|e| ToolError::Relay(e.to_string()))
    }
}

#[async_trait]
impl PromptRelay for KeyedRelay {
    async fn send(&self, request: &RelayRequest) -> Result<serde_json::Value, ToolError> {
        self.relay(request)
            .await
            .map_err(|e| ToolError::Relay(e.to_string()))
    }
}
