//! Sync configuration.
//!
//! Provides the `SyncConfig` struct shared by every front end. It is stored as
//! JSON and may be overridden from the environment.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{non_empty_trimmed, normalize_endpoint};

pub const DEFAULT_ENDPOINT: &str = "https://jsonplaceholder.typicode.com/posts";
pub const DEFAULT_USER_ID: u64 = 1;
pub const DEFAULT_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

pub const ENDPOINT_ENV: &str = "QUOTESYNC_ENDPOINT";
pub const USER_ID_ENV: &str = "QUOTESYNC_USER_ID";
pub const INTERVAL_ENV: &str = "QUOTESYNC_INTERVAL_SECS";

/// What a cycle does when local and remote collections differ.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// Stop in the conflict state until a resolution is supplied
    #[default]
    Manual,
    /// Merge by id, newest `last_updated` winning
    AutoMerge,
}

/// How two collections are compared for equivalence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EquivalenceMode {
    /// Same projections in the same order
    Ordered,
    /// Same projections in any order
    #[default]
    Unordered,
}

/// Runtime configuration for the sync engine and its remote gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Collection endpoint; fetched with `GET ?userId=` and posted to
    pub endpoint: String,
    /// Owner id sent with every request
    pub user_id: u64,
    /// Seconds between scheduled sync attempts
    pub interval_secs: u64,
    /// Per-request HTTP timeout; `None` keeps the client default
    pub request_timeout_secs: Option<u64>,
    pub policy: ConflictPolicy,
    pub equivalence: EquivalenceMode,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            user_id: DEFAULT_USER_ID,
            interval_secs: DEFAULT_INTERVAL_SECS,
            request_timeout_secs: Some(DEFAULT_REQUEST_TIMEOUT_SECS),
            policy: ConflictPolicy::default(),
            equivalence: EquivalenceMode::default(),
        }
    }
}

impl SyncConfig {
    /// Load config from `path`, falling back to defaults when it does not exist.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let config = serde_json::from_str::<Self>(&raw).map_err(|error| {
            Error::Config(format!(
                "Failed to parse config at {}: {}",
                path.display(),
                error
            ))
        })?;
        config.validated()
    }

    /// Write config to `path`, creating parent directories as needed.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let normalized = self.clone().validated()?;
        std::fs::write(path, serde_json::to_string_pretty(&normalized)?)?;
        Ok(())
    }

    /// Apply `QUOTESYNC_*` overrides read through `lookup`.
    pub fn apply_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).as_deref().and_then(non_empty_trimmed);

        if let Some(endpoint) = read(ENDPOINT_ENV) {
            self.endpoint = endpoint;
        }
        if let Some(user_id) = read(USER_ID_ENV) {
            self.user_id = user_id
                .parse()
                .map_err(|_| Error::Config(format!("{USER_ID_ENV} must be a number")))?;
        }
        if let Some(interval) = read(INTERVAL_ENV) {
            self.interval_secs = interval
                .parse()
                .map_err(|_| Error::Config(format!("{INTERVAL_ENV} must be a number")))?;
        }

        self.validated()
    }

    /// Normalize the endpoint and reject unusable values.
    pub fn validated(mut self) -> Result<Self> {
        self.endpoint = normalize_endpoint(&self.endpoint)?;
        if self.interval_secs == 0 {
            return Err(Error::Config(
                "interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout_secs == Some(0) {
            self.request_timeout_secs = None;
        }
        Ok(self)
    }

    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
