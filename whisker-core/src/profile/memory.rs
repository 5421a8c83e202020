//! In-memory profile store for testing
//!
//! Seeded with rows up front; counts lookups so tests can assert how many
//! fetches a flow triggered, and can be switched into a failing mode to
//! exercise the recoverable-lookup-failure path.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::ProfileStore;
use super::types::Profile;
use crate::error::ProfileStoreError;

/// Mock implementation of [`ProfileStore`]
pub struct MemoryProfileStore {
    rows: RwLock<HashMap<Uuid, Profile>>,
    lookups: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryProfileStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            lookups: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        }
    }

    /// Insert or replace a profile row
    pub async fn insert(&self, profile: Profile) {
        self.rows.write().await.insert(profile.id, profile);
    }

    /// Number of lookups performed against this store
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Make every subsequent lookup fail with a query error
    pub fn fail_lookups(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl Default for MemoryProfileStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn profile_by_id(&self, id: Uuid) -> Result<Option<Profile>, ProfileStoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(ProfileStoreError::Query("injected failure".to_string()));
        }
        Ok(self.rows.read().await.get(&id).cloned())
    }
}
