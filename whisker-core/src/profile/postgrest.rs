//! PostgREST-backed profile store
//!
//! Queries the `profiles` table through the Supabase REST endpoint. Row-level
//! security decides what the caller may see, so the store attaches the
//! current user's access token when a [`TokenSource`] is wired in and falls
//! back to the anon key otherwise.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use super::store::ProfileStore;
use super::types::Profile;
use crate::auth::{SupabaseConfig, TokenSource};
use crate::error::ProfileStoreError;

/// Profile store backed by the Supabase PostgREST API
pub struct PostgrestProfileStore {
    config: SupabaseConfig,
    http: reqwest::Client,
    token_source: Option<Arc<dyn TokenSource>>,
}

impl PostgrestProfileStore {
    /// Create a store for the given project
    pub fn new(config: SupabaseConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            token_source: None,
        }
    }

    /// Attach a token source so queries run with the user's credentials
    pub fn with_token_source(mut self, source: Arc<dyn TokenSource>) -> Self {
        self.token_source = Some(source);
        self
    }

    async fn bearer(&self) -> String {
        match &self.token_source {
            Some(source) => source
                .access_token()
                .await
                .unwrap_or_else(|| self.config.anon_key.clone()),
            None => self.config.anon_key.clone(),
        }
    }
}

#[async_trait]
impl ProfileStore for PostgrestProfileStore {
    async fn profile_by_id(&self, id: Uuid) -> Result<Option<Profile>, ProfileStoreError> {
        let url = format!(
            "{}?id=eq.{}&select=*",
            self.config.rest_endpoint("profiles"),
            id
        );
        debug!(%id, "fetching profile row");

        let response = self
            .http
            .get(&url)
            .header("apikey", &self.config.anon_key)
            .bearer_auth(self.bearer().await)
            .send()
            .await
            .map_err(|e| ProfileStoreError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProfileStoreError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(ProfileStoreError::Query(format!(
                "status {status}: {body}"
            )));
        }

        // PostgREST returns a JSON array; the id filter yields zero or one row
        let mut rows: Vec<Profile> = serde_json::from_str(&body)
            .map_err(|e| ProfileStoreError::Query(format!("invalid profile row: {e}")))?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }
}
