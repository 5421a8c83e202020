//! Error types for whisker-core

use thiserror::Error;

/// Top-level error type for whisker-core
#[derive(Error, Debug)]
pub enum WhiskerError {
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Identity provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Profile store error: {0}")]
    ProfileStore(#[from] ProfileStoreError),
}

/// Errors surfaced by the session layer
///
/// `AuthRejected` carries the identity provider's message verbatim so callers
/// can display it to the end user. `ProfileLookupFailed` is recovered inside
/// the session layer and recorded as a diagnostic; it never reaches callers
/// of the sign-in/up/out operations.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The identity provider declined the operation (bad credentials,
    /// duplicate account, expired session). Displays the provider's
    /// message verbatim so callers can show it to the end user as-is.
    #[error("{0}")]
    AuthRejected(String),

    /// A local pre-check failed before any provider call was made
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    /// The profile row was missing or the lookup query failed after a
    /// successful authentication
    #[error("profile lookup failed: {0}")]
    ProfileLookupFailed(String),
}

/// Errors from identity provider implementations
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The provider rejected the request; the message is display-ready
    #[error("{message}")]
    Rejected { message: String },

    /// The provider could not be reached
    #[error("transport error: {0}")]
    Transport(String),

    /// Reading or writing the persisted session failed
    #[error("session store error: {0}")]
    SessionStore(String),
}

impl ProviderError {
    /// Create a rejection with a display-ready message
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }
}

impl From<ProviderError> for SessionError {
    fn from(err: ProviderError) -> Self {
        SessionError::AuthRejected(err.to_string())
    }
}

/// Errors from profile store implementations
#[derive(Error, Debug)]
pub enum ProfileStoreError {
    /// The store rejected or failed the query
    #[error("query failed: {0}")]
    Query(String),

    /// The store could not be reached
    #[error("transport error: {0}")]
    Transport(String),
}
