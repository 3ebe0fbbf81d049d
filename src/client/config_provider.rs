//! Fetches the client configuration from the relay server.

use serde::Deserialize;
use tracing::error;

use crate::config::ClientConfig;
use crate::error::BootstrapError;
use crate::server::CONFIG_PATH;

pub(crate) const FALLBACK_MESSAGE: &str = "Failed to fetch client configuration";

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// One GET against the configuration endpoint; no validation of the result.
pub struct ConfigProvider {
    client: reqwest::Client,
    endpoint: String,
}

impl ConfigProvider {
    /// `base_url` is the origin serving the configuration endpoint.
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}{CONFIG_PATH}", base_url.trim_end_matches('/')),
        }
    }

    pub async fn fetch_config(&self) -> Result<ClientConfig, BootstrapError> {
        let result = self.try_fetch().await;
        if let Err(e) = &result {
            error!(error = %e, endpoint = %self.endpoint, "Could not load client configuration");
        }
        result
    }

    async fn try_fetch(&self) -> Result<ClientConfig, BootstrapError> {
        let resp = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| BootstrapError::ConfigFetch(e.to_string()))?;

        if !resp.status().is_success() {
            let message = resp
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error)
                .unwrap_or_else(|| FALLBACK_MESSAGE.to_string());
            return Err(BootstrapError::ConfigFetch(message));
        }

        resp.json::<ClientConfig>()
            .await
            .map_err(|e| BootstrapError::ConfigFetch(e.to_string()))
    }
}
