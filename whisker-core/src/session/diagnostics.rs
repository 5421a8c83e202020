//! Diagnostic snapshot of the auth flow
//!
//! Serializable view of the session plus the last recorded profile-lookup
//! failure, for a troubleshooting surface. A missing profile row for a
//! signed-in identity usually means the registration trigger on the backend
//! failed, which is invisible in SessionState alone.

use serde::Serialize;

use super::state::SessionState;
use crate::auth::Identity;
use crate::profile::Profile;

/// Point-in-time report of auth state and the last profile-lookup diagnostic
#[derive(Debug, Clone, Serialize)]
pub struct AuthReport {
    pub identity: Option<Identity>,
    pub profile: Option<Profile>,
    pub loading: bool,
    /// Detail of the most recent failed or empty profile lookup; cleared
    /// on the next successful lookup
    pub last_profile_error: Option<String>,
}

impl AuthReport {
    pub(crate) fn new(state: SessionState, last_profile_error: Option<String>) -> Self {
        Self {
            identity: state.identity,
            profile: state.profile,
            loading: state.loading,
            last_profile_error,
        }
    }

    /// True when a signed-in identity has no profile row
    pub fn profile_missing(&self) -> bool {
        self.identity.is_some() && self.profile.is_none() && !self.loading
    }
}
