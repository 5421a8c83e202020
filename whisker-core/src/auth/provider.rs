//! IdentityProvider trait and related seams
//!
//! The provider abstraction keeps the session layer independent of the
//! hosted identity backend, and lets tests drive the full flow through
//! [`super::MockIdentityProvider`].

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::change::AuthChange;
use super::identity::{AuthSession, UserMetadata};
use crate::error::ProviderError;

/// Trait for identity providers
///
/// Implementations own credential verification, account creation, and
/// session persistence. They must emit an [`AuthChange`] on every
/// login, logout, and token refresh; the session layer converges its
/// state from that stream rather than from operation return values.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The currently persisted session, if one exists and is still valid
    async fn current_session(&self) -> Result<Option<AuthSession>, ProviderError>;

    /// Subscribe to auth-state changes (login, logout, token refresh)
    fn subscribe(&self) -> broadcast::Receiver<AuthChange>;

    /// Verify credentials and establish a session
    ///
    /// Success is observed via the change stream, not the return value.
    async fn sign_in_with_password(&self, email: &str, password: &str)
        -> Result<(), ProviderError>;

    /// Create a new account
    ///
    /// `metadata` is passed through to the provider as registration
    /// metadata; the backend trigger that creates the profile row reads
    /// the full name from it.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: UserMetadata,
    ) -> Result<(), ProviderError>;

    /// Terminate the current session
    async fn sign_out(&self) -> Result<(), ProviderError>;
}

/// Source of the current access token
///
/// Stores that attach user credentials to their queries (row-level
/// security) borrow the token from the provider through this seam.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// The current access token, if a session is established
    async fn access_token(&self) -> Option<String>;
}
