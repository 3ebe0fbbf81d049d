//! Session gate: reacts to identity-state signals and picks the landing page.
//!
//! `Unknown → SignedOut | SignedIn { profile_complete }`. A sign-in ends in a
//! one-way redirect; a sign-out reveals the form and keeps listening.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{RwLock, watch};
use tracing::{debug, info, warn};

use super::bootstrap::AppHandle;
use super::identity::{Identity, SessionSignal, UserStore};
use super::surface::{Destination, Surface};
use crate::error::StoreError;

/// Key under which the last-seen identity id is cached.
pub const SESSION_KEY: &str = "calverseUid";

/// Single-slot cache of the last-seen identity id, optionally file-backed.
pub struct SessionCache {
    slot: RwLock<Option<String>>,
    path: Option<PathBuf>,
}

impl SessionCache {
    pub fn in_memory() -> Self {
        Self {
            slot: RwLock::new(None),
            path: None,
        }
    }

    /// Open a file-backed cache. A missing file starts empty.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let slot = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => {
                let map: HashMap<String, String> = serde_json::from_str(&raw)
                    .map_err(|e| StoreError::Serialization(e.to_string()))?;
                map.get(SESSION_KEY).cloned()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(StoreError::Io(e.to_string())),
        };
        Ok(Self {
            slot: RwLock::new(slot),
            path: Some(path),
        })
    }

    pub async fn get(&self) -> Option<String> {
        self.slot.read().await.clone()
    }

    pub async fn set(&self, uid: &str) -> Result<(), StoreError> {
        let mut slot = self.slot.write().await;
        *slot = Some(uid.to_string());
        self.persist(slot.as_deref()).await
    }

    pub async fn clear(&self) -> Result<(), StoreError> {
        let mut slot = self.slot.write().await;
        *slot = None;
        self.persist(None).await
    }

    async fn persist(&self, value: Option<&str>) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let mut map = HashMap::new();
        if let Some(uid) = value {
            map.insert(SESSION_KEY, uid);
        }
        let raw =
            serde_json::to_string(&map).map_err(|e| StoreError::Serialization(e.to_string()))?;
        tokio::fs::write(path, raw)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))
    }
}

/// Gate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Unknown,
    SignedOut,
    SignedIn { profile_complete: bool },
}

pub struct SessionGate {
    users: Arc<dyn UserStore>,
    cache: Arc<SessionCache>,
    surface: Arc<dyn Surface>,
    state: GateState,
}

impl SessionGate {
    pub fn new(handle: &AppHandle, cache: Arc<SessionCache>, surface: Arc<dyn Surface>) -> Self {
        Self {
            users: Arc::clone(&handle.users),
            cache,
            surface,
            state: GateState::Unknown,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    /// Apply one signal. Returns the destination when the gate redirected.
    pub async fn handle(&mut self, signal: &SessionSignal) -> Option<Destination> {
        match signal {
            SessionSignal::SignedIn(identity) => Some(self.on_signed_in(identity).await),
            SessionSignal::SignedOut => {
                self.on_signed_out().await;
                None
            }
        }
    }

    /// Drive the gate from a signal receiver until it redirects or the
    /// identity backend goes away.
    pub async fn run(mut self, mut signals: watch::Receiver<SessionSignal>) -> Option<Destination> {
        loop {
            let signal = signals.borrow_and_update().clone();
            if let Some(destination) = self.handle(&signal).await {
                return Some(destination);
            }
            if signals.changed().await.is_err() {
                debug!("Identity signal channel closed");
                return None;
            }
        }
    }

    async fn on_signed_in(&mut self, identity: &Identity) -> Destination {
        let profile_complete = match self.users.get_user(&identity.uid).await {
            Ok(Some(record)) => record.profile_complete,
            Ok(None) => false,
            Err(e) => {
                warn!(uid = %identity.uid, error = %e, "User lookup failed, treating profile as incomplete");
                false
            }
        };

        if let Err(e) = self.cache.set(&identity.uid).await {
            warn!(error = %e, "Failed to cache session id");
        }

        self.state = GateState::SignedIn { profile_complete };
        let destination = if profile_complete {
            Destination::Dashboard
        } else {
            Destination::Welcome
        };
        info!(uid = %identity.uid, destination = destination.path(), "Redirecting signed-in user");
        self.surface.navigate(destination);
        destination
    }

    async fn on_signed_out(&mut self) {
        if let Err(e) = self.cache.clear().await {
            warn!(error = %e, "Failed to clear cached session id");
        }
        self.state = GateState::SignedOut;
        self.surface.reveal_sign_in();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::identity::{MemoryIdentity, MemoryUserStore, UserRecord};
    use crate::client::surface::{MemorySurface, SurfaceEvent};
    use crate::config::ClientConfig;

    struct Fixture {
        users: Arc<MemoryUserStore>,
        cache: Arc<SessionCache>,
        surface: Arc<MemorySurface>,
        gate: SessionGate,
    }

    fn fixture() -> Fixture {
        let users = Arc::new(MemoryUserStore::new());
        let handle = AppHandle {
            config: ClientConfig::default(),
            identity: Arc::new(MemoryIdentity::new()),
            users: users.clone(),
        };
        let cache = Arc::new(SessionCache::in_memory());
        let surface = Arc::new(MemorySurface::new());
        let gate = SessionGate::new(&handle, cache.clone(), surface.clone());
        Fixture {
            users,
            cache,
            surface,
            gate,
        }
    }

    fn identity(uid: &str) -> Identity {
        Identity {
            uid: uid.into(),
            email: Some(format!("{uid}@example.com")),
        }
    }

    async fn store_record(users: &MemoryUserStore, uid: &str, profile_complete: bool) {
        let mut record = UserRecord::first_sign_in(&identity(uid));
        record.profile_complete = profile_complete;
        users.put_user(record).await.unwrap();
    }

    #[tokio::test]
    async fn incomplete_profile_goes_to_welcome() {
        let mut f = fixture();
        store_record(&f.users, "u1", false).await;

        let dest = f.gate.handle(&SessionSignal::SignedIn(identity("u1"))).await;

        assert_eq!(dest, Some(Destination::Welcome));
        assert_eq!(f.gate.state(), GateState::SignedIn { profile_complete: false });
        assert_eq!(f.cache.get().await.as_deref(), Some("u1"));
    }

    #[tokio::test]
    async fn missing_record_goes_to_welcome() {
        let mut f = fixture();
        let dest = f.gate.handle(&SessionSignal::SignedIn(identity("ghost"))).await;
        assert_eq!(dest, Some(Destination::Welcome));
    }

    #[tokio::test]
    async fn complete_profile_goes_to_dashboard() {
        let mut f = fixture();
        store_record(&f.users, "u2", true).await;

        let dest = f.gate.handle(&SessionSignal::SignedIn(identity("u2"))).await;

        assert_eq!(dest, Some(Destination::Dashboard));
        assert_eq!(f.surface.last_navigation(), Some(Destination::Dashboard));
    }

    #[tokio::test]
    async fn signed_out_clears_cache_and_reveals_form() {
        let mut f = fixture();
        f.cache.set("stale").await.unwrap();

        let dest = f.gate.handle(&SessionSignal::SignedOut).await;

        assert_eq!(dest, None);
        assert_eq!(f.gate.state(), GateState::SignedOut);
        assert_eq!(f.cache.get().await, None);
        assert_eq!(f.surface.events(), vec![SurfaceEvent::SignInRevealed]);
    }

    #[tokio::test]
    async fn run_waits_through_sign_out_until_sign_in() {
        let f = fixture();
        store_record(&f.users, "u3", true).await;
        let (tx, rx) = watch::channel(SessionSignal::SignedOut);

        let task = tokio::spawn(f.gate.run(rx));
        tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while f.surface.events().is_empty() {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("gate never handled the initial signal");
        tx.send(SessionSignal::SignedIn(identity("u3"))).unwrap();

        let dest = task.await.unwrap();
        assert_eq!(dest, Some(Destination::Dashboard));
        assert_eq!(f.surface.events()[0], SurfaceEvent::SignInRevealed);
    }

    #[tokio::test]
    async fn run_returns_none_when_backend_drops() {
        let f = fixture();
        let (tx, rx) = watch::channel(SessionSignal::SignedOut);
        drop(tx);
        assert_eq!(f.gate.run(rx).await, None);
    }

    #[tokio::test]
    async fn file_cache_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let cache = SessionCache::open(&path).await.unwrap();
        assert_eq!(cache.get().await, None);
        cache.set("u9").await.unwrap();

        let reopened = SessionCache::open(&path).await.unwrap();
        assert_eq!(reopened.get().await.as_deref(), Some("u9"));

        reopened.clear().await.unwrap();
        let cleared = SessionCache::open(&path).await.unwrap();
        assert_eq!(cleared.get().await, None);
    }
}
