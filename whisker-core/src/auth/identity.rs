//! Identity types returned by the identity provider
//!
//! An [`Identity`] is the provider-managed account record. whisker never
//! creates or mutates identities; it only references them. The application's
//! own per-user record is [`crate::profile::Profile`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Provider-managed metadata attached to an identity at registration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserMetadata {
    /// Free-form display name supplied at sign-up; consumed by the backend
    /// trigger that seeds the profile row
    #[serde(default)]
    pub full_name: Option<String>,
}

impl UserMetadata {
    /// Metadata carrying a full name
    pub fn with_full_name(full_name: impl Into<String>) -> Self {
        Self {
            full_name: Some(full_name.into()),
        }
    }
}

/// The authenticated principal, as reported by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable identifier assigned by the provider
    pub id: Uuid,
    /// Email address the account was registered with
    pub email: String,
    /// Provider-managed registration metadata
    #[serde(default)]
    pub metadata: UserMetadata,
}

impl Identity {
    /// Create a new Identity
    pub fn new(id: Uuid, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            metadata: UserMetadata::default(),
        }
    }

    /// Set the registration metadata
    pub fn with_metadata(mut self, metadata: UserMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// An authenticated session for an identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    /// The identity this session authenticates
    pub identity: Identity,
    /// When the session's credentials expire
    pub expires_at: DateTime<Utc>,
}

impl AuthSession {
    /// Create a new session
    pub fn new(identity: Identity, expires_at: DateTime<Utc>) -> Self {
        Self {
            identity,
            expires_at,
        }
    }

    /// True if the session's credentials have already expired
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}
