//! Login controller: password sign-in, federated sign-in, password reset.
//!
//! Redirects are not done here; the session gate reacts to the identity
//! signal that a successful sign-in produces.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use super::bootstrap::AppHandle;
use super::identity::{IdentityProvider, UserRecord, UserStore};
use super::surface::{AlertKind, Surface};
use crate::error::AuthError;

const SIGN_IN_SUCCESS: &str = "Login successful! Redirecting...";
const RESET_SENT: &str = "Password reset email sent! Please check your inbox.";

pub struct LoginController {
    identity: Arc<dyn IdentityProvider>,
    users: Arc<dyn UserStore>,
    surface: Arc<dyn Surface>,
    loading: AtomicBool,
}

impl LoginController {
    pub fn new(handle: &AppHandle, surface: Arc<dyn Surface>) -> Self {
        Self {
            identity: Arc::clone(&handle.identity),
            users: Arc::clone(&handle.users),
            surface,
            loading: AtomicBool::new(false),
        }
    }

    /// Whether the sign-in controls are disabled.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Email/password sign-in. Stays loading on success until navigation.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let Some(loading) = self.begin() else {
            debug!("Sign-in already in progress");
            return Ok(());
        };

        match self.identity.sign_in_with_password(email, password).await {
            Ok(_) => {
                loading.keep();
                self.surface.show_alert(SIGN_IN_SUCCESS, AlertKind::Success);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Password sign-in failed");
                self.fail(AuthError::InvalidCredentials)
            }
        }
    }

    /// Federated sign-in. Writes the user record on first sign-in.
    pub async fn sign_in_federated(&self) -> Result<(), AuthError> {
        let Some(loading) = self.begin() else {
            debug!("Sign-in already in progress");
            return Ok(());
        };

        match self.federated_flow().await {
            Ok(()) => {
                loading.keep();
                self.surface.show_alert(SIGN_IN_SUCCESS, AlertKind::Success);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Federated sign-in failed");
                self.fail(AuthError::FederatedSignInFailed)
            }
        }
    }

    async fn federated_flow(&self) -> Result<(), AuthError> {
        let identity = self.identity.sign_in_federated().await?;
        let existing = self
            .users
            .get_user(&identity.uid)
            .await
            .map_err(|e| AuthError::Backend(e.to_string()))?;
        if existing.is_none() {
            debug!(uid = %identity.uid, "Creating user record on first sign-in");
            self.users
                .put_user(UserRecord::first_sign_in(&identity))
                .await
                .map_err(|e| AuthError::Backend(e.to_string()))?;
        }
        Ok(())
    }

    /// Send a password reset email. Does not touch the loading state.
    pub async fn send_password_reset(&self, email: &str) -> Result<(), AuthError> {
        if email.trim().is_empty() {
            let err = AuthError::MissingEmail;
            self.surface.show_alert(&err.to_string(), AlertKind::Error);
            return Err(err);
        }

        match self.identity.send_password_reset(email.trim()).await {
            Ok(()) => {
                self.surface.show_alert(RESET_SENT, AlertKind::Success);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Password reset failed");
                let err = AuthError::ResetFailed;
                self.surface.show_alert(&err.to_string(), AlertKind::Error);
                Err(err)
            }
        }
    }

    /// Claim the loading flag. `None` if it was already held.
    fn begin(&self) -> Option<LoadingGuard<'_>> {
        if self.loading.swap(true, Ordering::SeqCst) {
            return None;
        }
        Some(LoadingGuard {
            flag: &self.loading,
            keep: false,
        })
    }

    fn fail(&self, err: AuthError) -> Result<(), AuthError> {
        self.surface.show_alert(&err.to_string(), AlertKind::Error);
        Err(err)
    }
}

/// Releases the loading flag on drop unless the sign-in succeeded.
struct LoadingGuard<'a> {
    flag: &'a AtomicBool,
    keep: bool,
}

impl LoadingGuard<'_> {
    /// Leave the controls disabled until navigation.
    fn keep(mut self) {
        self.keep = true;
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if !self.keep {
            self.flag.store(false, Ordering::SeqCst);
        }
    }
}
