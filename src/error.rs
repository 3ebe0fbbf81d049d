//! Error types for the calverse relay and client core.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Relay error: {0}")]
    Relay(#[from] RelayError),

    #[error("Bootstrap error: {0}")]
    Bootstrap(#[from] BootstrapError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("No credentials configured for task type {task_type}")]
    EmptyPool { task_type: String },
}

/// Errors raised by the keyed relay.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("No API keys configured on the server for function type: {task_type}")]
    NoCredentialsConfigured { task_type: String },

    #[error("All API key attempts failed. Last error: {last_error}")]
    AllCredentialsExhausted { last_error: AttemptError },

    #[error("Malformed relay request: {0}")]
    MalformedRequest(String),
}

impl RelayError {
    /// Wire shape shared by every relay failure: `{"error": {"message": ...}}`.
    pub fn to_body(&self) -> serde_json::Value {
        serde_json::json!({ "error": { "message": self.to_string() } })
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self.to_body())).into_response()
    }
}

/// A single failed upstream attempt. Recovered inside the relay loop.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttemptError {
    #[error("API Error with status: {status} using key ending in ...{key_suffix}")]
    Status { status: u16, key_suffix: String },

    #[error("Network or fetch error: {0}")]
    Transport(String),
}

/// Transport-level failure reported by an upstream implementation.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// The request URL carries the credential as a query parameter, so it is
/// stripped before the error is rendered anywhere.
impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        Self(e.without_url().to_string())
    }
}

/// Client bootstrap errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BootstrapError {
    #[error("Could not load app configuration: {0}")]
    ConfigFetch(String),

    #[error("Invalid app configuration: {0}")]
    InvalidConfig(String),

    #[error("Client initialization failed: {0}")]
    ClientInit(String),

    #[error("Bootstrap halted before the client became ready")]
    Halted,
}

/// Identity operation failures.
///
/// The display strings are what the user sees; backend detail is kept in the
/// `Backend` variant and never shown for sign-in.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials. Please try again.")]
    InvalidCredentials,

    #[error("Could not sign in with Google. Please try again.")]
    FederatedSignInFailed,

    #[error("Please enter your email address to reset your password.")]
    MissingEmail,

    #[error("Could not send reset email. Please check the address.")]
    ResetFailed,

    #[error("Identity backend error: {0}")]
    Backend(String),
}

/// User-record store errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("Query failed: {0}")]
    Query(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(String),
}

/// Tool panel errors. Every variant renders as an inline message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolError {
    #[error("{0}")]
    Relay(String),

    #[error("{0}")]
    NoContent(&'static str),

    #[error("The AI returned an invalid format. Please try again.")]
    ResponseParse,

    #[error("{0}")]
    InvalidFormat(&'static str),

    #[error("A request is already in progress.")]
    Busy,
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_message_carries_last_error() {
        let err = RelayError::AllCredentialsExhausted {
            last_error: AttemptError::Status {
                status: 429,
                key_suffix: "abcd".into(),
            },
        };
        assert_eq!(
            err.to_string(),
            "All API key attempts failed. Last error: API Error with status: 429 using key ending in ...abcd"
        );
    }

    #[test]
    fn relay_body_shape() {
        let err = RelayError::NoCredentialsConfigured {
            task_type: "tools".into(),
        };
        let body = err.to_body();
        assert_eq!(
            body["error"]["message"],
            "No API keys configured on the server for function type: tools"
        );
    }

    #[test]
    fn auth_messages_do_not_leak_detail() {
        assert_eq!(
            AuthError::InvalidCredentials.to_string(),
            "Invalid credentials. Please try again."
        );
        assert!(!AuthError::FederatedSignInFailed.to_string().contains("Backend"));
    }
}
