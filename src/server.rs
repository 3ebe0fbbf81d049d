//! HTTP endpoints: client configuration, the keyed relay, and a health check.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{Method, StatusCode, header::CONTENT_TYPE},
    response::IntoResponse,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::config::{ClientConfig, ServerConfig};
use crate::error::{RelayError, Result};
use crate::relay::{HttpUpstream, KeyedRelay, RelayRequest};

/// Path of the client configuration endpoint.
pub const CONFIG_PATH: &str = "/.netlify/functions/get-firebase-config";
/// Path of the relay endpoint.
pub const RELAY_PATH: &str = "/api/gemini-proxy";
/// Function-style alias of the relay endpoint.
pub const RELAY_FUNCTION_PATH: &str = "/.netlify/functions/gemini-proxy";

const CONFIG_MISSING_MESSAGE: &str =
    "Server configuration error. Firebase environment variables are not set.";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<KeyedRelay>,
    /// `None` when the client configuration failed validation.
    pub client_config: Option<Arc<ClientConfig>>,
}

impl AppState {
    pub fn from_config(config: &ServerConfig) -> Self {
        let upstream = Arc::new(HttpUpstream::new(config.api_base.clone()));
        let relay = KeyedRelay::new(config.pools.clone(), config.models.clone(), upstream);
        Self {
            relay: Arc::new(relay),
            client_config: config.client.clone().map(Arc::new),
        }
    }
}

/// Build the Axum router.
pub fn app_routes(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/health", get(health))
        .route(CONFIG_PATH, get(get_client_config))
        .route(RELAY_PATH, post(relay_prompt))
        .route(RELAY_FUNCTION_PATH, post(relay_prompt))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind, serve, and stop on Ctrl+C or SIGTERM.
pub async fn serve(config: ServerConfig) -> Result<()> {
    let state = AppState::from_config(&config);
    let app = app_routes(state);

    let address = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&address).await?;
    info!(address = %address, "Relay server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Relay server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "calverse-relay"
    }))
}

// ── Client configuration ────────────────────────────────────────────────

async fn get_client_config(State(state): State<AppState>) -> impl IntoResponse {
    match &state.client_config {
        Some(config) => (StatusCode::OK, Json(serde_json::json!(config.as_ref()))),
        None => {
            error!("Client configuration requested but not configured");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": CONFIG_MISSING_MESSAGE })),
            )
        }
    }
}

// ── Relay ───────────────────────────────────────────────────────────────

/// Body is parsed by hand so a malformed payload still gets the relay's
/// uniform error shape.
async fn relay_prompt(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let request: RelayRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            let err = RelayError::MalformedRequest(e.to_string());
            error!(error = %err, "Proxy error");
            return err.into_response();
        }
    };

    match state.relay.relay(&request).await {
        Ok(data) => (StatusCode::OK, Json(data)).into_response(),
        Err(e) => {
            error!(task_type = %request.task_label(), error = %e, "Proxy error");
            e.into_response()
        }
    }
}
