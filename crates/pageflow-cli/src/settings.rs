//! Demo settings, persisted as TOML in the user's config directory.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use pageflow_bridge::{BridgeConfig, CachePolicy};
use serde::{Deserialize, Serialize};

// =============================================================================
// ROOT SETTINGS
// =============================================================================

/// Demo host settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Worker pool and cache defaults.
    pub bridge: BridgeConfig,

    /// Scenario tuning.
    pub demo: DemoSettings,
}

impl Settings {
    /// Load settings from `path`, or from the default location.
    ///
    /// A missing file yields the defaults. An unreadable or invalid file is
    /// reported with a warning and also yields the defaults.
    pub fn load(path: Option<&Path>) -> Self {
        let path = path.map_or_else(Self::config_path, Path::to_path_buf);
        match Self::read(&path) {
            Ok(Some(settings)) => {
                tracing::debug!(path = %path.display(), "Settings loaded");
                settings
            }
            Ok(None) => {
                tracing::debug!(path = %path.display(), "No settings file, using defaults");
                Self::default()
            }
            Err(error) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %format!("{error:#}"),
                    "Ignoring settings file"
                );
                Self::default()
            }
        }
    }

    /// Read settings from `path`; `Ok(None)` if the file does not exist.
    pub fn read(path: &Path) -> anyhow::Result<Option<Self>> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(error) => {
                return Err(error).with_context(|| format!("reading {}", path.display()));
            }
        };
        let settings: Self =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        settings.bridge.validate()?;
        Ok(Some(settings))
    }

    /// Save settings to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating config directory {}", parent.display()))?;
        }
        std::fs::write(path, self.to_toml()?)
            .with_context(|| format!("writing {}", path.display()))
    }

    /// Settings rendered as TOML.
    pub fn to_toml(&self) -> anyhow::Result<String> {
        toml::to_string_pretty(self).context("serializing settings")
    }

    /// Get the default settings file path.
    pub fn config_path() -> PathBuf {
        directories::ProjectDirs::from("dev", "Pageflow", "pageflow")
            .map(|dirs| dirs.config_dir().join("settings.toml"))
            .unwrap_or_else(|| PathBuf::from("pageflow.toml"))
    }
}

// =============================================================================
// DEMO SETTINGS
// =============================================================================

/// Knobs for the scripted scenarios.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoSettings {
    /// Simulated network latency per fetch, in milliseconds.
    pub latency_ms: u64,

    /// Cache TTL for user profiles, in seconds.
    pub user_ttl_secs: u64,

    /// Cache TTL for the posts list, in seconds.
    pub posts_ttl_secs: u64,

    /// How long to wait for background work before giving up, in seconds.
    pub idle_timeout_secs: u64,
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            latency_ms: 150,
            user_ttl_secs: 300,
            posts_ttl_secs: 180,
            idle_timeout_secs: 30,
        }
    }
}

impl DemoSettings {
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }

    /// Profiles are served stale while they refresh.
    pub fn user_policy(&self) -> CachePolicy {
        CachePolicy::seconds(self.user_ttl_secs).revalidate()
    }

    pub fn posts_policy(&self) -> CachePolicy {
        CachePolicy::seconds(self.posts_ttl_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}
