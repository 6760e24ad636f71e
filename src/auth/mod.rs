//! Auth — session context and the sign-in provider seam.
//!
//! DESIGN
//! ======
//! The session is an explicit value handed to every controller instead of a
//! process-wide singleton. It wraps a `watch` channel so views can observe
//! sign-in changes while controllers read the current user synchronously.
//! Authorization is binary: a user is either present or not.

pub mod firebase;

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

pub use firebase::FirebaseAuth;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("no active session")]
    NoSession,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("auth request failed: {0}")]
    Request(String),
    #[error("auth service returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("auth response parse failed: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for AuthError {
    fn from(e: reqwest::Error) -> Self {
        Self::Request(e.to_string())
    }
}

/// A signed-in user as returned by the auth provider.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub uid: String,
    pub email: String,
    /// Bearer token forwarded to the document and storage services.
    pub id_token: String,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("uid", &self.uid)
            .field("email", &self.email)
            .field("id_token", &"<redacted>")
            .finish()
    }
}

/// Email/password sign-in against a hosted identity service.
#[async_trait::async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<User, AuthError>;
}

// =============================================================================
// SESSION CONTEXT
// =============================================================================

/// Shared, observable "who is signed in" state.
#[derive(Clone)]
pub struct SessionContext {
    current: Arc<watch::Sender<Option<User>>>,
}

impl SessionContext {
    /// A session with nobody signed in.
    #[must_use]
    pub fn anonymous() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { current: Arc::new(tx) }
    }

    /// A session already holding `user`.
    #[must_use]
    pub fn signed_in(user: User) -> Self {
        let (tx, _rx) = watch::channel(Some(user));
        Self { current: Arc::new(tx) }
    }

    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.current.borrow().clone()
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.current.borrow().is_some()
    }

    #[must_use]
    pub fn id_token(&self) -> Option<String> {
        self.current.borrow().as_ref().map(|u| u.id_token.clone())
    }

    /// Receiver notified on every sign-in and sign-out.
    #[must_use]
    pub fn observe(&self) -> watch::Receiver<Option<User>> {
        self.current.subscribe()
    }

    /// Authenticate through `provider` and make the result the current user.
    ///
    /// # Errors
    ///
    /// Propagates the provider error; the session is left unchanged.
    pub async fn sign_in(&self, provider: &dyn AuthProvider, email: &str, password: &str) -> Result<User, AuthError> {
        let user = provider.sign_in(email, password).await?;
        info!(uid = %user.uid, email = %user.email, "auth: signed in");
        self.current.send_replace(Some(user.clone()));
        Ok(user)
    }

    /// Sign the current user out.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NoSession` when nobody is signed in.
    pub fn end_session(&self) -> Result<(), AuthError> {
        let Some(previous) = self.current.send_replace(None) else {
            return Err(AuthError::NoSession);
        };
        info!(uid = %previous.uid, "auth: signed out");
        Ok(())
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::anonymous()
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
