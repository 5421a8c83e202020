//! Configuration for the Supabase-hosted backend

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Errors loading a config file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(String),

    #[error("failed to parse config file: {0}")]
    Parse(String),
}

/// Environment variable holding the project URL
pub const ENV_SUPABASE_URL: &str = "WHISKER_SUPABASE_URL";
/// Environment variable holding the anon (publishable) key
pub const ENV_SUPABASE_ANON_KEY: &str = "WHISKER_SUPABASE_ANON_KEY";

/// Configuration for the Supabase project backing auth and storage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupabaseConfig {
    /// Project URL (e.g., "https://abc123.supabase.co")
    #[serde(default)]
    pub url: String,

    /// Anon key sent as the `apikey` header on every request
    #[serde(default)]
    pub anon_key: String,

    /// Where to persist the session between runs; sessions are held
    /// in memory only when unset
    #[serde(default)]
    pub session_file: Option<PathBuf>,
}

impl SupabaseConfig {
    /// Create a config with the given project URL and anon key
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
            session_file: None,
        }
    }

    /// Persist the session to the given file between runs
    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_file = Some(path.into());
        self
    }

    /// Load the URL and anon key from the environment
    ///
    /// Returns None when either variable is unset.
    pub fn from_env() -> Option<Self> {
        let url = std::env::var(ENV_SUPABASE_URL).ok()?;
        let anon_key = std::env::var(ENV_SUPABASE_ANON_KEY).ok()?;
        Some(Self::new(url, anon_key))
    }

    /// Load from a TOML config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Read(e.to_string()))?;
        toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// URL of a GoTrue auth endpoint, e.g. `auth_endpoint("signup")`
    pub fn auth_endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.url.trim_end_matches('/'), path)
    }

    /// URL of a PostgREST table endpoint
    pub fn rest_endpoint(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.url.trim_end_matches('/'), table)
    }

    /// Check the config has a parseable URL and a non-empty key
    pub fn is_valid(&self) -> bool {
        !self.anon_key.is_empty() && Url::parse(&self.url).is_ok()
    }
}
