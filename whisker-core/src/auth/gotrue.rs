//! GoTrue-backed identity provider
//!
//! Talks to the Supabase auth API over HTTP: password grant for sign-in,
//! signup with profile-seed metadata, logout, and refresh-token grant when a
//! persisted session has expired. Every successful sign-in, refresh, and
//! sign-out is broadcast on the auth-change stream.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::change::AuthChange;
use super::config::SupabaseConfig;
use super::identity::{AuthSession, Identity, UserMetadata};
use super::provider::{IdentityProvider, TokenSource};
use crate::error::ProviderError;

/// Capacity of the auth-change broadcast channel
const CHANGE_CHANNEL_CAPACITY: usize = 100;

/// A session as held in memory and persisted to disk
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredSession {
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
    identity: Identity,
}

impl StoredSession {
    fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    fn to_auth_session(&self) -> AuthSession {
        AuthSession::new(self.identity.clone(), self.expires_at)
    }
}

/// Identity provider backed by the Supabase GoTrue API
pub struct GotrueProvider {
    config: SupabaseConfig,
    http: reqwest::Client,
    session: RwLock<Option<StoredSession>>,
    tx: broadcast::Sender<AuthChange>,
}

impl GotrueProvider {
    /// Create a provider for the given project
    pub fn new(config: SupabaseConfig) -> Self {
        let (tx, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            config,
            http: reqwest::Client::new(),
            session: RwLock::new(None),
            tx,
        }
    }

    fn emit(&self, change: AuthChange) {
        let _ = self.tx.send(change);
    }

    async fn post_auth(
        &self,
        path: &str,
        body: serde_json::Value,
        bearer: Option<&str>,
    ) -> Result<(reqwest::StatusCode, String), ProviderError> {
        let mut request = self
            .http
            .post(self.config.auth_endpoint(path))
            .header("apikey", &self.config.anon_key)
            .json(&body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        Ok((status, text))
    }

    /// Adopt a fresh token response: remember it, persist it, broadcast it
    async fn adopt(&self, token: TokenResponse, change_kind: ChangeKind) {
        let stored = token.into_stored();
        if let Some(path) = &self.config.session_file
            && let Err(e) = save_session(path, &stored)
        {
            warn!("failed to persist session: {e}");
        }
        let session = stored.to_auth_session();
        *self.session.write().await = Some(stored);
        match change_kind {
            ChangeKind::SignIn => self.emit(AuthChange::SignedIn { session }),
            ChangeKind::Refresh => self.emit(AuthChange::TokenRefreshed { session }),
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<(), ProviderError> {
        debug!("refreshing expired session");
        let (status, body) = self
            .post_auth(
                "token?grant_type=refresh_token",
                json!({ "refresh_token": refresh_token }),
                None,
            )
            .await?;
        if !status.is_success() {
            return Err(ProviderError::rejected(error_message(status, &body)));
        }
        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::Transport(format!("invalid token response: {e}")))?;
        self.adopt(token, ChangeKind::Refresh).await;
        Ok(())
    }
}

enum ChangeKind {
    SignIn,
    Refresh,
}

#[async_trait]
impl IdentityProvider for GotrueProvider {
    async fn current_session(&self) -> Result<Option<AuthSession>, ProviderError> {
        let in_memory = self.session.read().await.is_some();
        if !in_memory
            && let Some(path) = &self.config.session_file
            && path.exists()
        {
            match load_session(path) {
                Ok(stored) => *self.session.write().await = Some(stored),
                Err(e) => warn!("ignoring unreadable session file: {e}"),
            }
        }

        let stored = self.session.read().await.clone();
        match stored {
            None => Ok(None),
            Some(s) if !s.is_expired() => Ok(Some(s.to_auth_session())),
            Some(s) => {
                // Expired persisted session: try the refresh grant once,
                // fall back to signed-out
                match self.refresh(&s.refresh_token).await {
                    Ok(()) => {
                        let refreshed = self.session.read().await.clone();
                        Ok(refreshed.map(|s| s.to_auth_session()))
                    }
                    Err(e) => {
                        warn!("session refresh failed: {e}");
                        *self.session.write().await = None;
                        if let Some(path) = &self.config.session_file {
                            remove_session(path);
                        }
                        Ok(None)
                    }
                }
            }
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.tx.subscribe()
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(), ProviderError> {
        let (status, body) = self
            .post_auth(
                "token?grant_type=password",
                json!({ "email": email, "password": password }),
                None,
            )
            .await?;
        if !status.is_success() {
            return Err(ProviderError::rejected(error_message(status, &body)));
        }
        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::Transport(format!("invalid token response: {e}")))?;
        info!(email, "signed in");
        self.adopt(token, ChangeKind::SignIn).await;
        Ok(())
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: UserMetadata,
    ) -> Result<(), ProviderError> {
        let (status, body) = self
            .post_auth(
                "signup",
                json!({ "email": email, "password": password, "data": metadata }),
                None,
            )
            .await?;
        if !status.is_success() {
            return Err(ProviderError::rejected(error_message(status, &body)));
        }
        match serde_json::from_str::<SignupResponse>(&body) {
            // Email confirmation disabled: signup yields a live session
            Ok(SignupResponse::Session(token)) => {
                info!(email, "signed up with immediate session");
                self.adopt(token, ChangeKind::SignIn).await;
            }
            // Confirmation pending: no session until the user verifies
            Ok(SignupResponse::Pending(user)) => {
                info!(email, user_id = %user.id, "signed up, confirmation pending");
            }
            Err(e) => {
                return Err(ProviderError::Transport(format!(
                    "invalid signup response: {e}"
                )));
            }
        }
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        let token = self
            .session
            .read()
            .await
            .as_ref()
            .map(|s| s.access_token.clone());

        if let Some(token) = token {
            let (status, body) = self.post_auth("logout", json!({}), Some(&token)).await?;
            // 401 means the token is already dead server-side; local
            // sign-out still proceeds
            if !status.is_success() && status != reqwest::StatusCode::UNAUTHORIZED {
                return Err(ProviderError::rejected(error_message(status, &body)));
            }
        }

        *self.session.write().await = None;
        if let Some(path) = &self.config.session_file {
            remove_session(path);
        }
        info!("signed out");
        self.emit(AuthChange::SignedOut);
        Ok(())
    }
}

#[async_trait]
impl TokenSource for GotrueProvider {
    async fn access_token(&self) -> Option<String> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|s| s.access_token.clone())
    }
}

/// Token grant response from GoTrue
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    user: GotrueUser,
}

impl TokenResponse {
    fn into_stored(self) -> StoredSession {
        StoredSession {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: Utc::now() + Duration::seconds(self.expires_in),
            identity: self.user.into_identity(),
        }
    }
}

/// User object embedded in GoTrue responses
#[derive(Debug, Deserialize)]
struct GotrueUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: UserMetadata,
}

impl GotrueUser {
    fn into_identity(self) -> Identity {
        Identity::new(self.id, self.email.unwrap_or_default()).with_metadata(self.user_metadata)
    }
}

/// Signup returns either a full token grant (confirmations disabled) or a
/// bare user object (confirmation email sent)
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignupResponse {
    Session(TokenResponse),
    Pending(GotrueUser),
}

/// GoTrue error payload; the message field has varied across versions
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Extract a display-ready message from a GoTrue error response
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.msg.or(b.error_description).or(b.error))
        .unwrap_or_else(|| format!("request failed with status {status}"))
}

fn save_session(path: &Path, session: &StoredSession) -> Result<(), ProviderError> {
    let json = serde_json::to_string_pretty(session)
        .map_err(|e| ProviderError::SessionStore(e.to_string()))?;
    std::fs::write(path, json).map_err(|e| ProviderError::SessionStore(e.to_string()))
}

fn load_session(path: &Path) -> Result<StoredSession, ProviderError> {
    let json =
        std::fs::read_to_string(path).map_err(|e| ProviderError::SessionStore(e.to_string()))?;
    serde_json::from_str(&json).map_err(|e| ProviderError::SessionStore(e.to_string()))
}

fn remove_session(path: &Path) {
    if let Err(e) = std::fs::remove_file(path)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!("failed to remove session file: {e}");
    }
}
