//! Configuration types for the execution bridge.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

/// Default number of worker threads.
pub const DEFAULT_MAX_WORKERS: usize = 5;

/// Default cache time-to-live in seconds (5 minutes).
pub const DEFAULT_TTL_SECS: u64 = 300;

/// Worker pool and cache defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Maximum number of tasks running at the same time.
    pub max_workers: usize,

    /// TTL used by [`BridgeConfig::policy`].
    pub default_ttl_secs: u64,

    /// Name given to worker threads.
    pub thread_name: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            default_ttl_secs: DEFAULT_TTL_SECS,
            thread_name: "pageflow-worker".to_string(),
        }
    }
}

impl BridgeConfig {
    /// Set the worker count.
    #[must_use]
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    /// Check that the configuration can start a worker pool.
    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(BridgeError::InvalidConfig(
                "max_workers must be at least 1".to_string(),
            ));
        }
        if self.thread_name.is_empty() {
            return Err(BridgeError::InvalidConfig(
                "thread_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Cache policy using the configured default TTL, without revalidation.
    #[must_use]
    pub fn policy(&self) -> CachePolicy {
        CachePolicy::seconds(self.default_ttl_secs)
    }
}

/// How a cached request treats existing entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// How long a value stored by this call stays fresh. With zero the value
    /// is stored already stale and the call never joins another fetch.
    pub ttl: Duration,

    /// Deliver a stale value immediately and refresh it in the background.
    pub revalidate: bool,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::seconds(DEFAULT_TTL_SECS)
    }
}

impl CachePolicy {
    /// Policy with a TTL in whole seconds.
    #[must_use]
    pub const fn seconds(secs: u64) -> Self {
        Self::with_ttl(Duration::from_secs(secs))
    }

    /// Policy with an arbitrary TTL.
    #[must_use]
    pub const fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            revalidate: false,
        }
    }

    /// Enable stale-while-revalidate.
    #[must_use]
    pub const fn revalidate(mut self) -> Self {
        self.revalidate = true;
        self
    }
}
