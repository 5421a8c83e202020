//! whisker-core: Core library for whisker, a household cat-care tracker
//!
//! This crate owns the client-side authentication lifecycle:
//!
//! - **Session management** - [`SessionManager`] keeps identity, profile,
//!   and loading state consistent across startup, logins, logouts, and
//!   token refreshes
//! - **Identity boundary** - [`IdentityProvider`] trait with a Supabase
//!   GoTrue backend ([`GotrueProvider`]) and a scriptable mock
//! - **Profile boundary** - [`ProfileStore`] trait with a PostgREST backend
//!   and an in-memory mock; profile rows are created by a backend trigger
//!   at registration and only ever read here
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use whisker_core::auth::{GotrueProvider, SupabaseConfig};
//! use whisker_core::profile::PostgrestProfileStore;
//! use whisker_core::session::SessionManager;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SupabaseConfig::from_env().expect("supabase env vars");
//! let provider = Arc::new(GotrueProvider::new(config.clone()));
//! let store = Arc::new(
//!     PostgrestProfileStore::new(config).with_token_source(provider.clone()),
//! );
//!
//! let manager = SessionManager::new(provider, store);
//! manager.start().await;
//!
//! let state = manager.snapshot().await;
//! if !state.is_authenticated() {
//!     manager.sign_in("ada@example.com", "hunter22").await?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # State flow
//!
//! ```text
//! ┌──────────────┐  current_session   ┌─────────────────────┐
//! │   start()    ├───────────────────►│                     │
//! └──────────────┘                    │    SessionState     │
//! ┌──────────────┐  AuthChange stream │ {identity, profile, │
//! │ listener task├───────────────────►│      loading}       │
//! └──────────────┘                    └──────────┬──────────┘
//!        ▲                                       │ broadcast
//!        │ sign_in / sign_up / sign_out          ▼
//!   IdentityProvider                         consumers
//! ```
//!
//! Sign-in/up/out never write state directly; both the initial check and
//! the change stream replace the full state tuple at once, so consumers
//! never observe a fresh identity paired with a stale profile.

pub mod auth;
pub mod error;
pub mod profile;
pub mod session;

// Re-export key types for convenience
pub use auth::{
    AuthChange, AuthSession, ConfigError, GotrueProvider, Identity, IdentityProvider,
    MockIdentityProvider, SupabaseConfig, TokenSource, UserMetadata,
};
pub use error::{ProfileStoreError, ProviderError, SessionError, WhiskerError};
pub use profile::{
    Household, MemoryProfileStore, PostgrestProfileStore, Profile, ProfileStore, Role,
};
pub use session::{AuthReport, MIN_PASSWORD_LEN, SessionManager, SessionState};
