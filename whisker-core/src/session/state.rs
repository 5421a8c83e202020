//! Observable session state
//!
//! The full tuple is always replaced at once, so observers never see a new
//! identity paired with a stale profile or a half-resolved loading flag.

use serde::{Deserialize, Serialize};

use crate::auth::Identity;
use crate::profile::Profile;

/// Snapshot of the current authentication state
///
/// `loading` is true only until the initial session check resolves; after
/// that it stays false for the life of the manager. An identity with no
/// profile is a valid transient state (the profile fetch is in flight, or
/// failed and was degraded to absent); consumers must tolerate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// The authenticated principal, if any
    pub identity: Option<Identity>,
    /// The application profile for the identity, once fetched
    pub profile: Option<Profile>,
    /// True while the initial session check is still running
    pub loading: bool,
}

impl SessionState {
    /// The state before the initial session check has resolved
    pub fn checking() -> Self {
        Self {
            identity: None,
            profile: None,
            loading: true,
        }
    }

    /// The resolved state with no authenticated identity
    pub fn signed_out() -> Self {
        Self {
            identity: None,
            profile: None,
            loading: false,
        }
    }

    /// True when an identity is present
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// True when an identity is present but its profile row is not
    pub fn profile_missing(&self) -> bool {
        self.identity.is_some() && self.profile.is_none() && !self.loading
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::checking()
    }
}
