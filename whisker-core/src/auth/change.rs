//! Auth-state-change events emitted by identity providers

use serde::{Deserialize, Serialize};

use super::identity::AuthSession;

/// A change in authentication state
///
/// Providers emit one of these on every login, logout, and token refresh.
/// Subscribers only need the session payload; [`AuthChange::session`]
/// collapses the variants to "session present or not".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuthChange {
    /// A session was established
    SignedIn { session: AuthSession },
    /// An existing session's credentials were refreshed
    TokenRefreshed { session: AuthSession },
    /// The session was terminated
    SignedOut,
}

impl AuthChange {
    /// The session carried by this change, if any
    pub fn session(&self) -> Option<&AuthSession> {
        match self {
            AuthChange::SignedIn { session } | AuthChange::TokenRefreshed { session } => {
                Some(session)
            }
            AuthChange::SignedOut => None,
        }
    }

    /// Consume the change, yielding its session if any
    pub fn into_session(self) -> Option<AuthSession> {
        match self {
            AuthChange::SignedIn { session } | AuthChange::TokenRefreshed { session } => {
                Some(session)
            }
            AuthChange::SignedOut => None,
        }
    }
}
