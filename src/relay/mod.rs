//! Keyed relay: forwards prompts to the generative-AI API, failing over
//! across the credential pool of the request's task type.
//!
//! Credentials are tried once each, in pool order, with no delay between
//! attempts. The first 2xx reply wins; otherwise the last failure is reported.

pub mod pool;
pub mod request;
pub mod upstream;

pub use pool::{CredentialPools, TaskType, mask_suffix};
pub use request::{Content, GenerateRequest, InlineData, Part, RelayRequest};
pub use upstream::{HttpUpstream, Upstream, UpstreamReply};

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{AttemptError, RelayError};

/// Default text model.
pub const DEFAULT_TEXT_MODEL: &str = "gemini-1.5-flash-latest";
/// Default vision model, used whenever the request carries an inline image.
pub const DEFAULT_VISION_MODEL: &str = "gemini-1.5-pro-latest";

/// Model identifiers used by the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub text: String,
    pub vision: String,
}

impl ModelSelection {
    /// Vision model when an image is attached, text model otherwise.
    pub fn for_request(&self, request: &RelayRequest) -> &str {
        if request.has_image() {
            &self.vision
        } else {
            &self.text
        }
    }
}

impl Default for ModelSelection {
    fn default() -> Self {
        Self {
            text: DEFAULT_TEXT_MODEL.to_string(),
            vision: DEFAULT_VISION_MODEL.to_string(),
        }
    }
}

/// The relay itself. Cheap to share behind an `Arc`.
pub struct KeyedRelay {
    pools: CredentialPools,
    models: ModelSelection,
    upstream: Arc<dyn Upstream>,
}

impl KeyedRelay {
    pub fn new(pools: CredentialPools, models: ModelSelection, upstream: Arc<dyn Upstream>) -> Self {
        Self {
            pools,
            models,
            upstream,
        }
    }

    pub fn models(&self) -> &ModelSelection {
        &self.models
    }

    /// Relay one request.
    pub async fn relay(&self, request: &RelayRequest) -> Result<serde_json::Value, RelayError> {
        let task_type = request.task_type();
        let credentials = self.pools.for_task(task_type);
        if credentials.is_empty() {
            let label = request.task_label();
            warn!(task_type = %label, "Relay called with no credentials configured");
            return Err(RelayError::NoCredentialsConfigured { task_type: label });
        }

        let model = self.models.for_request(request);
        let body = request.to_generate_request();

        debug!(
            task_type = %task_type,
            model = model,
            candidates = credentials.len(),
            has_image = request.has_image(),
            "Relaying prompt"
        );

        let mut last_error = None;
        for (attempt, credential) in credentials.iter().enumerate() {
            let key_suffix = mask_suffix(credential);
            match self.upstream.generate(model, credential, &body).await {
                Ok(UpstreamReply::Success(data)) => {
                    info!(
                        task_type = %task_type,
                        model = model,
                        attempt = attempt + 1,
                        key_suffix = %key_suffix,
                        "Upstream call succeeded"
                    );
                    return Ok(data);
                }
                Ok(UpstreamReply::Failure { status }) => {
                    warn!(
                        task_type = %task_type,
                        status = status,
                        key_suffix = %key_suffix,
                        "Upstream rejected request, trying next key"
                    );
                    last_error = Some(AttemptError::Status { status, key_suffix });
                }
                Err(e) => {
                    warn!(
                        task_type = %task_type,
                        error = %e,
                        key_suffix = %key_suffix,
                        "Upstream transport error, trying next key"
                    );
                    last_error = Some(AttemptError::Transport(e.to_string()));
                }
            }
        }

        // Non-empty pool guarantees at least one recorded failure here.
        let last_error = last_error
            .unwrap_or_else(|| AttemptError::Transport("no attempt was made".to_string()));
        Err(RelayError::AllCredentialsExhausted { last_error })
    }
}
