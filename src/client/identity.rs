//! Identity backend and user-record store seams, with in-memory backends.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, watch};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{AuthError, StoreError};

/// A signed-in account as reported by the identity backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub uid: String,
    pub email: Option<String>,
}

/// Identity-state change, fired at least once on subscribe.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionSignal {
    #[default]
    SignedOut,
    SignedIn(Identity),
}

/// Account operations offered by the identity backend.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Receiver whose current value is the present identity state.
    fn subscribe(&self) -> watch::Receiver<SessionSignal>;

    async fn sign_in_with_password(&self, email: &str, password: &str)
    -> Result<Identity, AuthError>;

    /// Sign in through the external (popup) provider.
    async fn sign_in_federated(&self) -> Result<Identity, AuthError>;

    async fn send_password_reset(&self, email: &str) -> Result<(), AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;
}

/// Stored profile of a user, keyed by identity id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub uid: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub profile_complete: bool,
    pub premium: bool,
}

impl UserRecord {
    /// Record written on first federated sign-in.
    pub fn first_sign_in(identity: &Identity) -> Self {
        Self {
            uid: identity.uid.clone(),
            email: identity.email.clone(),
            created_at: Utc::now(),
            profile_complete: false,
            premium: false,
        }
    }
}

/// Key-value store of user records. Records are never deleted here.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, uid: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Insert or replace the record for `record.uid`.
    async fn put_user(&self, record: UserRecord) -> Result<(), StoreError>;
}

// ── In-memory backends ──────────────────────────────────────────────────

struct Account {
    password: String,
    identity: Identity,
}

/// In-memory identity backend for tests and local runs.
pub struct MemoryIdentity {
    accounts: RwLock<HashMap<String, Account>>,
    federated: RwLock<Option<Identity>>,
    reset_requests: RwLock<Vec<String>>,
    tx: watch::Sender<SessionSignal>,
}

impl MemoryIdentity {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionSignal::SignedOut);
        Self {
            accounts: RwLock::new(HashMap::new()),
            federated: RwLock::new(None),
            reset_requests: RwLock::new(Vec::new()),
            tx,
        }
    }

    /// Register an email/password account and return its identity.
    pub async fn add_account(&self, email: &str, password: &str) -> Identity {
        let identity = Identity {
            uid: Uuid::new_v4().to_string(),
            email: Some(email.to_string()),
        };
        self.accounts.write().await.insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                identity: identity.clone(),
            },
        );
        identity
    }

    /// Account the federated popup resolves to; `None` makes it fail.
    pub async fn set_federated_account(&self, identity: Option<Identity>) {
        *self.federated.write().await = identity;
    }

    /// Emails for which a password reset was sent.
    pub async fn reset_requests(&self) -> Vec<String> {
        self.reset_requests.read().await.clone()
    }

    /// Push a signal to subscribers directly.
    pub fn emit(&self, signal: SessionSignal) {
        self.tx.send_replace(signal);
    }
}

impl Default for MemoryIdentity {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    fn subscribe(&self) -> watch::Receiver<SessionSignal> {
        self.tx.subscribe()
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, AuthError> {
        let accounts = self.accounts.read().await;
        let account = accounts
            .get(email)
            .filter(|a| a.password == password)
            .ok_or_else(|| AuthError::Backend("auth/invalid-credential".into()))?;
        let identity = account.identity.clone();
        drop(accounts);

        info!(uid = %identity.uid, "Signed in with password");
        self.emit(SessionSignal::SignedIn(identity.clone()));
        Ok(identity)
    }

    async fn sign_in_federated(&self) -> Result<Identity, AuthError> {
        let identity = self
            .federated
            .read()
            .await
            .clone()
            .ok_or_else(|| AuthError::Backend("auth/popup-closed-by-user".into()))?;

        info!(uid = %identity.uid, "Signed in with federated provider");
        self.emit(SessionSignal::SignedIn(identity.clone()));
        Ok(identity)
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), AuthError> {
        if !self.accounts.read().await.contains_key(email) {
            return Err(AuthError::Backend("auth/user-not-found".into()));
        }
        debug!(email = email, "Password reset requested");
        self.reset_requests.write().await.push(email.to_string());
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.emit(SessionSignal::SignedOut);
        Ok(())
    }
}

/// In-memory user-record store.
#[derive(Default)]
pub struct MemoryUserStore {
    records: RwLock<HashMap<String, UserRecord>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get_user(&self, uid: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.records.read().await.get(uid).cloned())
    }

    async fn put_user(&self, record: UserRecord) -> Result<(), StoreError> {
        self.records.write().await.insert(record.uid.clone(), record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn password_sign_in_emits_signal() {
        let identity = MemoryIdentity::new();
        let mut rx = identity.subscribe();
        assert_eq!(*rx.borrow_and_update(), SessionSignal::SignedOut);

        let alice = identity.add_account("alice@example.com", "hunter2").await;
        let signed_in = identity
            .sign_in_with_password("alice@example.com", "hunter2")
            .await
            .unwrap();
        assert_eq!(signed_in, alice);

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), SessionSignal::SignedIn(alice));
    }

    #[tokio::test]
    async fn wrong_password_rejected() {
        let identity = MemoryIdentity::new();
        identity.add_account("alice@example.com", "hunter2").await;
        let err = identity
            .sign_in_with_password("alice@example.com", "nope")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Backend(_)));
    }

    #[tokio::test]
    async fn federated_without_account_fails() {
        let identity = MemoryIdentity::new();
        assert!(identity.sign_in_federated().await.is_err());
    }

    #[tokio::test]
    async fn store_roundtrip() {
        let store = MemoryUserStore::new();
        let record = UserRecord::first_sign_in(&Identity {
            uid: "u1".into(),
            email: None,
        });
        store.put_user(record.clone()).await.unwrap();
        assert_eq!(store.get_user("u1").await.unwrap(), Some(record));
        assert_eq!(store.get_user("u2").await.unwrap(), None);
    }

    #[test]
    fn user_record_wire_names() {
        let record = UserRecord::first_sign_in(&Identity {
            uid: "u1".into(),
            email: Some("a@b.c".into()),
        });
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["profileComplete"], false);
        assert_eq!(json["premium"], false);
        assert!(json.get("createdAt").is_some());
    }
}
