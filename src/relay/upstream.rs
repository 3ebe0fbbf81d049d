//! Upstream generative-AI transport.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use super::request::GenerateRequest;
use crate::error::TransportError;

/// Default host of the generative-AI API.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Outcome of one upstream call that reached the server.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamReply {
    /// 2xx with a JSON body.
    Success(serde_json::Value),
    /// Any non-2xx status. The body is discarded.
    Failure { status: u16 },
}

/// One `generateContent` call against the upstream API.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn generate(
        &self,
        model: &str,
        credential: &SecretString,
        body: &GenerateRequest,
    ) -> Result<UpstreamReply, TransportError>;
}

/// reqwest-backed upstream. Uses the transport's default timeout.
pub struct HttpUpstream {
    client: reqwest::Client,
    base_url: String,
}

impl HttpUpstream {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{model}:generateContent", self.base_url)
    }
}

impl Default for HttpUpstream {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE)
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn generate(
        &self,
        model: &str,
        credential: &SecretString,
        body: &GenerateRequest,
    ) -> Result<UpstreamReply, TransportError> {
        let resp = self
            .client
            .post(self.endpoint(model))
            .query(&[("key", credential.expose_secret())])
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Ok(UpstreamReply::Failure {
                status: status.as_u16(),
            });
        }

        // An unreadable success body counts as a transport failure.
        let data = resp.json::<serde_json::Value>().await?;
        Ok(UpstreamReply::Success(data))
    }
}
