//! Mock identity provider for testing
//!
//! Seeds a persisted session, registers accounts for credential checks, and
//! counts provider calls so tests can assert which operations actually
//! reached the provider. `emit()` injects arbitrary auth changes to simulate
//! backend-initiated events such as token refreshes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::{RwLock, broadcast};
use uuid::Uuid;

use super::change::AuthChange;
use super::identity::{AuthSession, Identity, UserMetadata};
use super::provider::{IdentityProvider, TokenSource};
use crate::error::ProviderError;

struct Account {
    password: String,
    identity: Identity,
}

/// Mock implementation of [`IdentityProvider`]
pub struct MockIdentityProvider {
    session: RwLock<Option<AuthSession>>,
    accounts: RwLock<HashMap<String, Account>>,
    tx: broadcast::Sender<AuthChange>,
    sign_in_calls: AtomicUsize,
    sign_up_calls: AtomicUsize,
    sign_out_calls: AtomicUsize,
}

impl MockIdentityProvider {
    /// Create a mock with no persisted session and no accounts
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(100);
        Self {
            session: RwLock::new(None),
            accounts: RwLock::new(HashMap::new()),
            tx,
            sign_in_calls: AtomicUsize::new(0),
            sign_up_calls: AtomicUsize::new(0),
            sign_out_calls: AtomicUsize::new(0),
        }
    }

    /// Create a mock that reports `session` as the persisted session
    pub fn with_session(session: AuthSession) -> Self {
        let mock = Self::new();
        *mock.session.try_write().expect("lock uncontended") = Some(session);
        mock
    }

    /// Register an account so `sign_in_with_password` can succeed
    pub async fn register_account(&self, email: &str, password: &str, identity: Identity) {
        self.accounts.write().await.insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                identity,
            },
        );
    }

    /// Broadcast an auth change directly, bypassing any operation
    pub fn emit(&self, change: AuthChange) {
        let _ = self.tx.send(change);
    }

    /// Number of sign-in calls that reached the provider
    pub fn sign_in_calls(&self) -> usize {
        self.sign_in_calls.load(Ordering::SeqCst)
    }

    /// Number of sign-up calls that reached the provider
    pub fn sign_up_calls(&self) -> usize {
        self.sign_up_calls.load(Ordering::SeqCst)
    }

    /// Number of sign-out calls that reached the provider
    pub fn sign_out_calls(&self) -> usize {
        self.sign_out_calls.load(Ordering::SeqCst)
    }

    fn session_for(identity: Identity) -> AuthSession {
        AuthSession::new(identity, Utc::now() + Duration::hours(1))
    }
}

impl Default for MockIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn current_session(&self) -> Result<Option<AuthSession>, ProviderError> {
        Ok(self.session.read().await.clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.tx.subscribe()
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(), ProviderError> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        let accounts = self.accounts.read().await;
        let account = accounts
            .get(email)
            .filter(|a| a.password == password)
            .ok_or_else(|| ProviderError::rejected("Invalid login credentials"))?;
        let session = Self::session_for(account.identity.clone());
        drop(accounts);
        *self.session.write().await = Some(session.clone());
        self.emit(AuthChange::SignedIn { session });
        Ok(())
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: UserMetadata,
    ) -> Result<(), ProviderError> {
        self.sign_up_calls.fetch_add(1, Ordering::SeqCst);
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(email) {
            return Err(ProviderError::rejected("User already registered"));
        }
        let identity = Identity::new(Uuid::new_v4(), email).with_metadata(metadata);
        accounts.insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                identity: identity.clone(),
            },
        );
        drop(accounts);
        let session = Self::session_for(identity);
        *self.session.write().await = Some(session.clone());
        self.emit(AuthChange::SignedIn { session });
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        *self.session.write().await = None;
        self.emit(AuthChange::SignedOut);
        Ok(())
    }
}

#[async_trait]
impl TokenSource for MockIdentityProvider {
    async fn access_token(&self) -> Option<String> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|s| format!("mock-token-{}", s.identity.id))
    }
}
