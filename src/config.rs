//! Configuration types.
//!
//! Everything is read once at process start. `from_lookup` takes a closure so
//! the same parsing runs against the real environment or a test map.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ConfigError;
use crate::relay::upstream::DEFAULT_API_BASE;
use crate::relay::{CredentialPools, ModelSelection, TaskType};

/// Default listen port.
pub const DEFAULT_PORT: u16 = 8888;

/// Number of credential slots read per task type.
pub const KEYS_PER_TASK: usize = 3;

/// Client bootstrap configuration served to browsers.
///
/// Wire names are camelCase; absent values are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messaging_sender_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
}

impl ClientConfig {
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            api_key: lookup("FIREBASE_API_KEY"),
            auth_domain: lookup("FIREBASE_AUTH_DOMAIN"),
            project_id: lookup("FIREBASE_PROJECT_ID"),
            storage_bucket: lookup("FIREBASE_STORAGE_BUCKET"),
            messaging_sender_id: lookup("FIREBASE_MESSAGING_SENDER_ID"),
            app_id: lookup("FIREBASE_APP_ID"),
        }
    }

    /// The primary key and the project id must both be non-empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if is_blank(&self.api_key) {
            return Err(ConfigError::MissingRequired {
                key: "apiKey".into(),
                hint: "Set FIREBASE_API_KEY.".into(),
            });
        }
        if is_blank(&self.project_id) {
            return Err(ConfigError::MissingRequired {
                key: "projectId".into(),
                hint: "Set FIREBASE_PROJECT_ID.".into(),
            });
        }
        Ok(())
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

/// Relay server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub api_base: String,
    pub models: ModelSelection,
    pub pools: CredentialPools,
    /// `None` when the client configuration is incomplete; the config endpoint
    /// then answers 500.
    pub client: Option<ClientConfig>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Parse and validate. Fails if any task type resolves to an empty pool.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("CALVERSE_PORT") {
            Some(raw) => raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
                key: "CALVERSE_PORT".into(),
                message: format!("{e}"),
            })?,
            None => DEFAULT_PORT,
        };

        let api_base = lookup("GEMINI_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let defaults = ModelSelection::default();
        let models = ModelSelection {
            text: lookup("GEMINI_TEXT_MODEL").unwrap_or(defaults.text),
            vision: lookup("GEMINI_VISION_MODEL").unwrap_or(defaults.vision),
        };

        let pools = load_pools(&lookup);
        if let Some(task_type) = pools.empty_pools().first() {
            return Err(ConfigError::EmptyPool {
                task_type: task_type.to_string(),
            });
        }

        let client_config = ClientConfig::from_lookup(&lookup);
        let client = match client_config.validate() {
            Ok(()) => Some(client_config),
            Err(e) => {
                warn!(error = %e, "Client configuration incomplete; config endpoint will fail");
                None
            }
        };

        info!(port, api_base = %api_base, text_model = %models.text, vision_model = %models.vision, "Configuration loaded");

        Ok(Self {
            port,
            api_base,
            models,
            pools,
            client,
        })
    }
}

/// Read `{PREFIX}_1..=3` for every task type.
fn load_pools<F>(lookup: &F) -> CredentialPools
where
    F: Fn(&str) -> Option<String>,
{
    TaskType::ALL
        .into_iter()
        .fold(CredentialPools::new(), |pools, task_type| {
            let keys = (1..=KEYS_PER_TASK)
                .filter_map(|i| lookup(&format!("{}_{i}", task_type.env_prefix())));
            pools.with_pool(task_type, keys)
        })
}
