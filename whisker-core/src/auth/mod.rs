//! Authentication boundary: identity types, provider trait, and backends

mod change;
mod config;
mod gotrue;
mod identity;
mod mock;
mod provider;

pub use change::AuthChange;
pub use config::{ConfigError, SupabaseConfig};
pub use gotrue::GotrueProvider;
pub use identity::{AuthSession, Identity, UserMetadata};
pub use mock::MockIdentityProvider;
pub use provider::{IdentityProvider, TokenSource};
