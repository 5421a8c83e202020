//! ProfileStore trait

use async_trait::async_trait;
use uuid::Uuid;

use super::types::Profile;
use crate::error::ProfileStoreError;

/// Trait for profile lookup backends
///
/// A missing row is `Ok(None)`, not an error; the session layer treats
/// both the same way but logs them differently.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Look up the profile row whose id equals the identity id
    async fn profile_by_id(&self, id: Uuid) -> Result<Option<Profile>, ProfileStoreError>;
}
