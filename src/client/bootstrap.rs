//! Config-gated client bootstrap.
//!
//! Fetch the configuration, build the [`AppHandle`], then publish it once
//! through a readiness channel. Dependent components take the handle as an
//! argument, or await [`Readiness::wait`] to get it.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info};

use super::config_provider::ConfigProvider;
use super::identity::{IdentityProvider, MemoryIdentity, MemoryUserStore, UserStore};
use super::surface::Surface;
use crate::config::ClientConfig;
use crate::error::BootstrapError;

/// Static message rendered when bootstrap fails.
pub const FATAL_MESSAGE: &str = "Error: Could not load app configuration. Please try again later.";

/// Capabilities available once the client is initialized.
pub struct AppHandle {
    pub config: ClientConfig,
    pub identity: Arc<dyn IdentityProvider>,
    pub users: Arc<dyn UserStore>,
}

/// Builds an [`AppHandle`] from a validated configuration.
pub trait ClientFactory: Send + Sync {
    fn connect(&self, config: &ClientConfig) -> Result<AppHandle, BootstrapError>;
}

/// Factory handing out the same in-memory backends on every connect.
#[derive(Default)]
pub struct MemoryClientFactory {
    pub identity: Arc<MemoryIdentity>,
    pub users: Arc<MemoryUserStore>,
}

impl MemoryClientFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClientFactory for MemoryClientFactory {
    fn connect(&self, config: &ClientConfig) -> Result<AppHandle, BootstrapError> {
        Ok(AppHandle {
            config: config.clone(),
            identity: self.identity.clone(),
            users: self.users.clone(),
        })
    }
}

/// Publishing half of the readiness channel. Consumed on publish.
pub struct ReadySender {
    tx: watch::Sender<Option<Arc<AppHandle>>>,
}

impl ReadySender {
    fn publish(self, handle: Arc<AppHandle>) {
        self.tx.send_replace(Some(handle));
    }
}

/// Awaiting half of the readiness channel.
#[derive(Clone)]
pub struct Readiness {
    rx: watch::Receiver<Option<Arc<AppHandle>>>,
}

impl Readiness {
    /// Resolve once the handle is published, or fail with
    /// [`BootstrapError::Halted`] if bootstrap ended without publishing.
    pub async fn wait(&mut self) -> Result<Arc<AppHandle>, BootstrapError> {
        let published = self
            .rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| BootstrapError::Halted)?;
        published.as_ref().cloned().ok_or(BootstrapError::Halted)
    }

    pub fn is_ready(&self) -> bool {
        self.rx.borrow().is_some()
    }
}

pub fn readiness() -> (ReadySender, Readiness) {
    let (tx, rx) = watch::channel(None);
    (ReadySender { tx }, Readiness { rx })
}

/// Run the bootstrap once. On failure the fatal message is rendered and
/// `ready` is dropped unpublished.
pub async fn bootstrap(
    provider: &ConfigProvider,
    factory: &dyn ClientFactory,
    surface: &dyn Surface,
    ready: ReadySender,
) -> Result<Arc<AppHandle>, BootstrapError> {
    match initialize(provider, factory).await {
        Ok(handle) => {
            let handle = Arc::new(handle);
            ready.publish(Arc::clone(&handle));
            info!("Client ready");
            Ok(handle)
        }
        Err(e) => {
            error!(error = %e, "Client initialization failed");
            surface.render_fatal(FATAL_MESSAGE);
            Err(e)
        }
    }
}

async fn initialize(
    provider: &ConfigProvider,
    factory: &dyn ClientFactory,
) -> Result<AppHandle, BootstrapError> {
    let config = provider.fetch_config().await?;
    config
        .validate()
        .map_err(|e| BootstrapError::InvalidConfig(e.to_string()))?;
    factory.connect(&config)
}

#[cfg(test)]
mod tests {
    use axum::{Json, Router, http::StatusCode, routing::get};
    use tokio::net::TcpListener;

    use super::*;
    use crate::client::surface::{MemorySurface, SurfaceEvent};
    use crate::client::config_provider::FALLBACK_MESSAGE;
    use crate::server::CONFIG_PATH;

    async fn serve_config(status: StatusCode, body: serde_json::Value) -> String {
        let app = Router::new().route(
            CONFIG_PATH,
            get(move || {
                let body = body.clone();
                async move { (status, Json(body)) }
            }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://127.0.0.1:{port}")
    }

    #[tokio::test]
    async fn publishes_handle_on_success() {
        let base = serve_config(
            StatusCode::OK,
            serde_json::json!({"apiKey": "k", "projectId": "p", "appId": "a"}),
        )
        .await;
        let provider = ConfigProvider::new(&base);
        let factory = MemoryClientFactory::new();
        let surface = MemorySurface::new();
        let (tx, mut ready) = readiness();
        assert!(!ready.is_ready());

        let handle = bootstrap(&provider, &factory, &surface, tx).await.unwrap();

        assert!(ready.is_ready());
        let waited = ready.wait().await.unwrap();
        assert!(Arc::ptr_eq(&handle, &waited));
        assert_eq!(waited.config.app_id.as_deref(), Some("a"));
        assert!(surface.events().is_empty());
    }

    #[tokio::test]
    async fn non_success_is_fatal_and_never_ready() {
        let base = serve_config(
            StatusCode::INTERNAL_SERVER_ERROR,
            serde_json::json!({"error": "Server configuration error."}),
        )
        .await;
        let provider = ConfigProvider::new(&base);
        let surface = MemorySurface::new();
        let (tx, mut ready) = readiness();
        let mut waiter = ready.clone();
        let pending = tokio::spawn(async move { waiter.wait().await });

        let err = bootstrap(&provider, &MemoryClientFactory::new(), &surface, tx)
            .await
            .err()
            .unwrap();

        assert!(
            matches!(err, BootstrapError::ConfigFetch(ref m) if m == "Server configuration error.")
        );
        assert_eq!(
            surface.events(),
            vec![SurfaceEvent::Fatal(FATAL_MESSAGE.to_string())]
        );
        assert!(!ready.is_ready());
        assert!(matches!(ready.wait().await, Err(BootstrapError::Halted)));
        assert!(matches!(pending.await.unwrap(), Err(BootstrapError::Halted)));
    }

    #[tokio::test]
    async fn invalid_config_is_fatal() {
        let base = serve_config(StatusCode::OK, serde_json::json!({"apiKey": "k"})).await;
        let provider = ConfigProvider::new(&base);
        let surface = MemorySurface::new();
        let (tx, _ready) = readiness();

        let err = bootstrap(&provider, &MemoryClientFactory::new(), &surface, tx)
            .await
            .err()
            .unwrap();

        assert!(matches!(err, BootstrapError::InvalidConfig(_)));
        assert_eq!(surface.events().len(), 1);
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_config_fetch_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let provider = ConfigProvider::new(&format!("http://127.0.0.1:{port}"));
        let err = provider.fetch_config().await.unwrap_err();
        assert!(matches!(err, BootstrapError::ConfigFetch(_)));
    }

    #[tokio::test]
    async fn error_body_without_message_uses_fallback() {
        let base = serve_config(StatusCode::BAD_GATEWAY, serde_json::json!({})).await;
        let err = ConfigProvider::new(&base).fetch_config().await.unwrap_err();
        assert!(matches!(err, BootstrapError::ConfigFetch(ref m) if m == FALLBACK_MESSAGE));
    }
}
