//! SessionManager: the authenticated-identity lifecycle
//!
//! The manager owns SessionState and converges it from two paths: the
//! initial session check run by [`SessionManager::start`], and the
//! provider's auth-change stream consumed by a background listener task.
//! Sign-in/up/out never write state themselves; they delegate to the
//! provider and let the change stream drive the update, so state is
//! consistent no matter which path a login came from.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use super::diagnostics::AuthReport;
use super::state::SessionState;
use crate::auth::{AuthChange, IdentityProvider, UserMetadata};
use crate::error::SessionError;
use crate::profile::{Profile, ProfileStore};

/// Minimum password length enforced locally before any provider call
pub const MIN_PASSWORD_LEN: usize = 6;

/// Capacity of the state broadcast channel
const STATE_CHANNEL_CAPACITY: usize = 100;

/// Manages the session lifecycle for one client process
///
/// Construct with injected provider and store, call [`start`](Self::start)
/// once, and tear down with [`shutdown`](Self::shutdown). Consumers read
/// state via [`snapshot`](Self::snapshot) or observe every transition via
/// [`subscribe`](Self::subscribe); each broadcast value is the full new
/// tuple, never a partial update.
pub struct SessionManager {
    inner: Arc<Inner>,
    cancel: CancellationToken,
    listener: Mutex<Option<JoinHandle<()>>>,
}

struct Inner {
    provider: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileStore>,
    state: RwLock<SessionState>,
    state_tx: broadcast::Sender<SessionState>,
    last_profile_error: RwLock<Option<String>>,
}

impl SessionManager {
    /// Create a manager over the given provider and profile store
    ///
    /// The state starts as [`SessionState::checking`] until [`start`]
    /// resolves the initial session.
    ///
    /// [`start`]: Self::start
    pub fn new(provider: Arc<dyn IdentityProvider>, profiles: Arc<dyn ProfileStore>) -> Self {
        let (state_tx, _) = broadcast::channel(STATE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                provider,
                profiles,
                state: RwLock::new(SessionState::checking()),
                state_tx,
                last_profile_error: RwLock::new(None),
            }),
            cancel: CancellationToken::new(),
            listener: Mutex::new(None),
        }
    }

    /// Run the initial session check and begin following auth changes
    ///
    /// Subscribes to the change stream before the initial check so a login
    /// that lands mid-check is not lost; whichever path writes last wins.
    /// When this returns, `loading` is false and the initial profile fetch
    /// (if any) has settled. Calling `start` again is a no-op.
    pub async fn start(&self) {
        {
            let mut listener = self.listener.lock().await;
            if listener.is_some() {
                warn!("session manager already started");
                return;
            }
            let rx = self.inner.provider.subscribe();
            let inner = Arc::clone(&self.inner);
            let cancel = self.cancel.clone();
            *listener = Some(tokio::spawn(listen(inner, rx, cancel)));
        }

        match self.inner.provider.current_session().await {
            Ok(session) => self.inner.apply_session(session.map(|s| s.identity)).await,
            Err(e) => {
                // Resolve to signed-out rather than leaving consumers
                // stuck on the loading state
                warn!("initial session check failed: {e}");
                self.inner.set_state(SessionState::signed_out()).await;
            }
        }
    }

    /// Stop following auth changes
    ///
    /// After this returns, no further writes to SessionState occur, even if
    /// the provider keeps emitting notifications.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self.listener.lock().await.take();
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            warn!("listener task join failed: {e}");
        }
    }

    /// The current session state
    pub async fn snapshot(&self) -> SessionState {
        self.inner.state.read().await.clone()
    }

    /// Observe every state transition as a full snapshot
    pub fn subscribe(&self) -> broadcast::Receiver<SessionState> {
        self.inner.state_tx.subscribe()
    }

    /// Diagnostic report of the current state plus the last profile-lookup
    /// failure detail
    pub async fn report(&self) -> AuthReport {
        let state = self.snapshot().await;
        let last_profile_error = self.inner.last_profile_error.read().await.clone();
        AuthReport::new(state, last_profile_error)
    }

    /// Verify credentials with the identity provider
    ///
    /// On rejection the provider's message is returned verbatim for display.
    /// On success this does NOT update SessionState synchronously; the
    /// resulting auth-change notification does.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), SessionError> {
        self.inner
            .provider
            .sign_in_with_password(email, password)
            .await?;
        Ok(())
    }

    /// Create an account with the identity provider
    ///
    /// `full_name` is passed as registration metadata for the backend
    /// trigger that seeds the profile row. The password length check runs
    /// locally, before any provider call.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<(), SessionError> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(SessionError::ValidationFailed(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        self.inner
            .provider
            .sign_up(email, password, UserMetadata::with_full_name(full_name))
            .await?;
        Ok(())
    }

    /// Terminate the current session
    ///
    /// Like sign-in, state is cleared by the resulting notification rather
    /// than by this call.
    pub async fn sign_out(&self) -> Result<(), SessionError> {
        self.inner.provider.sign_out().await?;
        Ok(())
    }
}

/// Background task following the provider's auth-change stream
async fn listen(
    inner: Arc<Inner>,
    mut rx: broadcast::Receiver<AuthChange>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            change = rx.recv() => match change {
                Ok(change) => {
                    inner
                        .apply_session(change.into_session().map(|s| s.identity))
                        .await;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "auth change stream lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
    debug!("auth change listener stopped");
}

impl Inner {
    /// Converge state on a session (or its absence)
    ///
    /// Identity and loading resolve immediately in one write; the profile
    /// follows once its fetch settles. A profile carried over from the same
    /// identity is kept rather than flickering to absent on token refresh.
    async fn apply_session(&self, identity: Option<crate::auth::Identity>) {
        match identity {
            Some(identity) => {
                let id = identity.id;
                let keep_profile = {
                    let current = self.state.read().await;
                    match &current.identity {
                        Some(cur) if cur.id == id => current.profile.clone(),
                        _ => None,
                    }
                };
                self.set_state(SessionState {
                    identity: Some(identity),
                    profile: keep_profile,
                    loading: false,
                })
                .await;
                self.load_profile(id).await;
            }
            None => self.set_state(SessionState::signed_out()).await,
        }
    }

    /// Fetch the profile row for `id` and fold the outcome into state
    ///
    /// Missing rows and query failures both degrade to an absent profile;
    /// neither is surfaced to callers. The profile row is created by a
    /// backend trigger at registration, so absence here usually means that
    /// trigger failed; there is no retry, the detail is recorded for
    /// [`AuthReport`] instead.
    async fn load_profile(&self, id: Uuid) {
        let (profile, diagnostic): (Option<Profile>, Option<String>) =
            match self.profiles.profile_by_id(id).await {
                Ok(Some(profile)) => (Some(profile), None),
                Ok(None) => {
                    warn!(%id, "no profile row for signed-in identity");
                    (None, Some(format!("no profile row for identity {id}")))
                }
                Err(e) => {
                    warn!(%id, error = %e, "profile lookup failed");
                    (None, Some(e.to_string()))
                }
            };

        *self.last_profile_error.write().await = diagnostic;

        // The identity may have changed while the fetch was in flight;
        // a stale result must not be paired with the new identity
        let mut state = self.state.write().await;
        if !state.identity.as_ref().is_some_and(|i| i.id == id) {
            debug!(%id, "discarding profile fetched for a superseded identity");
            return;
        }
        state.profile = profile;
        state.loading = false;
        let next = state.clone();
        drop(state);
        let _ = self.state_tx.send(next);
    }

    /// Replace the whole state tuple and broadcast the new snapshot
    async fn set_state(&self, next: SessionState) {
        let mut state = self.state.write().await;
        debug!(
            authenticated = next.is_authenticated(),
            loading = next.loading,
            "session state updated"
        );
        *state = next.clone();
        drop(state);
        let _ = self.state_tx.send(next);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;
    use tokio::time::{sleep, timeout};

    use super::*;
    use crate::auth::{AuthSession, Identity, MockIdentityProvider};
    use crate::profile::{MemoryProfileStore, Role};

    fn identity(email: &str) -> Identity {
        Identity::new(Uuid::new_v4(), email)
    }

    fn session(identity: Identity) -> AuthSession {
        AuthSession::new(identity, Utc::now() + chrono::Duration::hours(1))
    }

    fn profile_row(id: Uuid, role: Role) -> Profile {
        Profile {
            id,
            email: "ada@example.com".to_string(),
            full_name: Some("Ada Lovelace".to_string()),
            role,
            household_id: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn manager_with(
        provider: Arc<MockIdentityProvider>,
        store: Arc<MemoryProfileStore>,
    ) -> SessionManager {
        SessionManager::new(provider, store)
    }

    /// Wait until the broadcast stream yields a state matching `pred`
    async fn wait_for(
        rx: &mut broadcast::Receiver<SessionState>,
        pred: impl Fn(&SessionState) -> bool,
    ) -> SessionState {
        timeout(Duration::from_secs(2), async {
            loop {
                let state = rx.recv().await.expect("state stream closed");
                if pred(&state) {
                    return state;
                }
            }
        })
        .await
        .expect("timed out waiting for session state")
    }

    #[tokio::test]
    async fn startup_with_persisted_session_loads_profile() {
        let ada = identity("ada@example.com");
        let provider = Arc::new(MockIdentityProvider::with_session(session(ada.clone())));
        let store = Arc::new(MemoryProfileStore::new());
        store.insert(profile_row(ada.id, Role::User)).await;
        let manager = manager_with(provider, Arc::clone(&store));

        manager.start().await;

        let state = manager.snapshot().await;
        assert!(!state.loading);
        assert_eq!(state.identity.as_ref().unwrap().id, ada.id);
        assert_eq!(state.profile.as_ref().unwrap().role, Role::User);
        assert_eq!(store.lookup_count(), 1);
    }

    #[tokio::test]
    async fn startup_without_session_resolves_signed_out() {
        let provider = Arc::new(MockIdentityProvider::new());
        let store = Arc::new(MemoryProfileStore::new());
        let manager = manager_with(provider, Arc::clone(&store));

        assert!(manager.snapshot().await.loading);
        manager.start().await;

        let state = manager.snapshot().await;
        assert_eq!(state, SessionState::signed_out());
        assert_eq!(store.lookup_count(), 0);
    }

    #[tokio::test]
    async fn sign_in_converges_state_through_change_stream() {
        let ada = identity("ada@example.com");
        let provider = Arc::new(MockIdentityProvider::new());
        provider
            .register_account("ada@example.com", "hunter22", ada.clone())
            .await;
        let store = Arc::new(MemoryProfileStore::new());
        store.insert(profile_row(ada.id, Role::Admin)).await;
        let manager = manager_with(Arc::clone(&provider), Arc::clone(&store));

        manager.start().await;
        let mut rx = manager.subscribe();

        manager.sign_in("ada@example.com", "hunter22").await.unwrap();

        let state = wait_for(&mut rx, |s| s.profile.is_some()).await;
        assert_eq!(state.identity.as_ref().unwrap().id, ada.id);
        assert_eq!(state.profile.as_ref().unwrap().role, Role::Admin);
        assert!(!state.loading);
        // exactly one profile fetch for the signed-in account
        assert_eq!(store.lookup_count(), 1);
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn sign_in_rejection_surfaces_provider_message() {
        let provider = Arc::new(MockIdentityProvider::new());
        let manager = manager_with(provider, Arc::new(MemoryProfileStore::new()));
        manager.start().await;

        let err = manager.sign_in("ada@example.com", "nope").await.unwrap_err();

        assert!(matches!(err, SessionError::AuthRejected(_)));
        assert_eq!(err.to_string(), "Invalid login credentials");
        assert_eq!(manager.snapshot().await, SessionState::signed_out());
    }

    #[tokio::test]
    async fn short_password_fails_validation_without_provider_call() {
        let provider = Arc::new(MockIdentityProvider::new());
        let manager = manager_with(Arc::clone(&provider), Arc::new(MemoryProfileStore::new()));
        manager.start().await;

        let err = manager
            .sign_up("ada@example.com", "12345", "Ada Lovelace")
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::ValidationFailed(_)));
        assert_eq!(provider.sign_up_calls(), 0);
    }

    #[tokio::test]
    async fn sign_up_without_profile_row_reports_missing_profile() {
        let provider = Arc::new(MockIdentityProvider::new());
        let manager = manager_with(Arc::clone(&provider), Arc::new(MemoryProfileStore::new()));
        manager.start().await;
        let mut rx = manager.subscribe();

        manager
            .sign_up("ada@example.com", "hunter22", "Ada Lovelace")
            .await
            .unwrap();

        let state = wait_for(&mut rx, |s| s.is_authenticated()).await;
        assert!(state.profile.is_none());

        // the trigger-created row does not exist in the empty store; the
        // lookup settles shortly after the identity is set
        let report = timeout(Duration::from_secs(2), async {
            loop {
                let report = manager.report().await;
                if report.last_profile_error.is_some() {
                    return report;
                }
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("profile diagnostic never recorded");
        assert!(report.profile_missing());
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn sign_out_clears_identity_and_profile() {
        let ada = identity("ada@example.com");
        let provider = Arc::new(MockIdentityProvider::with_session(session(ada.clone())));
        let store = Arc::new(MemoryProfileStore::new());
        store.insert(profile_row(ada.id, Role::User)).await;
        let manager = manager_with(Arc::clone(&provider), store);

        manager.start().await;
        assert!(manager.snapshot().await.is_authenticated());
        let mut rx = manager.subscribe();

        manager.sign_out().await.unwrap();

        let state = wait_for(&mut rx, |s| !s.is_authenticated()).await;
        assert_eq!(state, SessionState::signed_out());
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn missing_profile_row_degrades_without_clearing_identity() {
        let ada = identity("ada@example.com");
        let provider = Arc::new(MockIdentityProvider::with_session(session(ada.clone())));
        let store = Arc::new(MemoryProfileStore::new());
        let manager = manager_with(provider, Arc::clone(&store));

        manager.start().await;

        let state = manager.snapshot().await;
        assert_eq!(state.identity.as_ref().unwrap().id, ada.id);
        assert!(state.profile.is_none());
        assert!(!state.loading);
        assert_eq!(store.lookup_count(), 1);
    }

    #[tokio::test]
    async fn failed_profile_lookup_is_recoverable() {
        let ada = identity("ada@example.com");
        let provider = Arc::new(MockIdentityProvider::with_session(session(ada.clone())));
        let store = Arc::new(MemoryProfileStore::new());
        store.fail_lookups(true);
        let manager = manager_with(provider, store);

        manager.start().await;

        let state = manager.snapshot().await;
        assert!(state.is_authenticated());
        assert!(state.profile.is_none());
        let report = manager.report().await;
        assert!(report.last_profile_error.unwrap().contains("injected failure"));
    }

    #[tokio::test]
    async fn successful_lookup_clears_previous_diagnostic() {
        let ada = identity("ada@example.com");
        let provider = Arc::new(MockIdentityProvider::with_session(session(ada.clone())));
        let store = Arc::new(MemoryProfileStore::new());
        store.fail_lookups(true);
        let manager = manager_with(Arc::clone(&provider), Arc::clone(&store));

        manager.start().await;
        assert!(manager.report().await.last_profile_error.is_some());

        // backend recovers; a refresh re-triggers the fetch
        store.fail_lookups(false);
        store.insert(profile_row(ada.id, Role::User)).await;
        let mut rx = manager.subscribe();
        provider.emit(AuthChange::TokenRefreshed {
            session: session(ada.clone()),
        });

        wait_for(&mut rx, |s| s.profile.is_some()).await;
        assert!(manager.report().await.last_profile_error.is_none());
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_stops_state_writes() {
        let provider = Arc::new(MockIdentityProvider::new());
        let manager = manager_with(Arc::clone(&provider), Arc::new(MemoryProfileStore::new()));

        manager.start().await;
        manager.shutdown().await;

        let ada = identity("ada@example.com");
        provider.emit(AuthChange::SignedIn {
            session: session(ada),
        });
        sleep(Duration::from_millis(50)).await;

        assert_eq!(manager.snapshot().await, SessionState::signed_out());
    }

    #[tokio::test]
    async fn lagged_change_stream_skips_and_keeps_following() {
        let provider = Arc::new(MockIdentityProvider::new());
        let store = Arc::new(MemoryProfileStore::new());
        let manager = manager_with(Arc::clone(&provider), store);
        manager.start().await;

        // Overflow the change channel before the listener gets a chance to
        // run; the current-thread runtime guarantees no interleaving here
        for _ in 0..150 {
            provider.emit(AuthChange::SignedOut);
        }
        let ada = identity("ada@example.com");
        provider.emit(AuthChange::SignedIn {
            session: session(ada.clone()),
        });

        // The listener drops the lagged backlog but must still process the
        // final event instead of wedging
        let state = timeout(Duration::from_secs(2), async {
            loop {
                let state = manager.snapshot().await;
                if state.is_authenticated() {
                    return state;
                }
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("listener wedged after lagging");
        assert_eq!(state.identity.as_ref().unwrap().id, ada.id);
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn start_twice_is_a_no_op() {
        let provider = Arc::new(MockIdentityProvider::new());
        let store = Arc::new(MemoryProfileStore::new());
        let manager = manager_with(provider, Arc::clone(&store));

        manager.start().await;
        manager.start().await;

        assert_eq!(manager.snapshot().await, SessionState::signed_out());
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn token_refresh_keeps_profile_for_same_identity() {
        let ada = identity("ada@example.com");
        let provider = Arc::new(MockIdentityProvider::with_session(session(ada.clone())));
        let store = Arc::new(MemoryProfileStore::new());
        store.insert(profile_row(ada.id, Role::User)).await;
        let manager = manager_with(Arc::clone(&provider), Arc::clone(&store));

        manager.start().await;
        let mut rx = manager.subscribe();

        provider.emit(AuthChange::TokenRefreshed {
            session: session(ada.clone()),
        });

        // the first broadcast after the refresh still carries the profile
        let state = wait_for(&mut rx, |_| true).await;
        assert!(state.profile.is_some());
        manager.shutdown().await;
    }
}
