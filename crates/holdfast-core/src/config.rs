//! Configuration loading and management.
//!
//! # Hierarchy
//!
//! Configuration is loaded in this order (later overrides earlier):
//! 1. Built-in defaults
//! 2. Config file: explicit `--config` path, else `./holdfast.toml`,
//!    else `~/.config/holdfast/config.toml`
//! 3. Environment variables: `HOLDFAST_*`
//!
//! # Example Config
//!
//! ```toml
//! repos_dir = "/var/lib/holdfast/repos"
//! lock_dir = "/var/lib/holdfast/locks"
//! lock_timeout_ms = 30000
//!
//! [sync]
//! binary = "holdfast-sync"
//! command_deadline_secs = 10
//! ```

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Validated runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Root directory all repositories live under.
    pub repos_dir: PathBuf,
    /// Directory lock files are kept in.
    pub lock_dir: PathBuf,
    /// Default lock acquisition timeout in milliseconds.
    pub lock_timeout_ms: u64,
    /// Grace period for in-flight work on shutdown, in seconds.
    pub shutdown_timeout_secs: u64,
    /// Sync daemon settings.
    pub sync: SyncConfig,
}

/// Sync daemon settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncConfig {
    /// Daemon binary name or path.
    pub binary: String,
    /// Per-command deadline in seconds.
    pub command_deadline_secs: u64,
}

/// File-shaped config where every field is optional; merged over defaults.
#[derive(Debug, Default, Deserialize)]
struct PartialConfig {
    repos_dir: Option<PathBuf>,
    lock_dir: Option<PathBuf>,
    lock_timeout_ms: Option<u64>,
    shutdown_timeout_secs: Option<u64>,
    #[serde(default)]
    sync: PartialSyncConfig,
}

#[derive(Debug, Default, Deserialize)]
struct PartialSyncConfig {
    binary: Option<String>,
    command_deadline_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = directories::ProjectDirs::from("", "", "holdfast")
            .map_or_else(|| PathBuf::from(".holdfast"), |d| d.data_dir().to_path_buf());
        Self {
            repos_dir: data_dir.join("repos"),
            lock_dir: data_dir.join("locks"),
            lock_timeout_ms: 30_000,
            shutdown_timeout_secs: 30,
            sync: SyncConfig {
                binary: "holdfast-sync".to_string(),
                command_deadline_secs: 10,
            },
        }
    }
}

impl Config {
    /// Load configuration: defaults, then file, then environment.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` for an unreadable or unparsable
    /// config file or malformed environment override.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = Self::config_file(explicit_path) {
            let raw = std::fs::read_to_string(&path).map_err(|e| {
                Error::InvalidConfig(format!("failed to read '{}': {e}", path.display()))
            })?;
            let partial: PartialConfig = toml::from_str(&raw).map_err(|e| {
                Error::InvalidConfig(format!("failed to parse '{}': {e}", path.display()))
            })?;
            config.apply(partial);
        }

        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// The config file to read, if any exists.
    fn config_file(explicit_path: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit_path {
            return Some(path.to_path_buf());
        }
        let project = PathBuf::from("holdfast.toml");
        if project.exists() {
            return Some(project);
        }
        directories::ProjectDirs::from("", "", "holdfast")
            .map(|d| d.config_dir().join("config.toml"))
            .filter(|p| p.exists())
    }

    fn apply(&mut self, partial: PartialConfig) {
        if let Some(v) = partial.repos_dir {
            self.repos_dir = v;
        }
        if let Some(v) = partial.lock_dir {
            self.lock_dir = v;
        }
        if let Some(v) = partial.lock_timeout_ms {
            self.lock_timeout_ms = v;
        }
        if let Some(v) = partial.shutdown_timeout_secs {
            self.shutdown_timeout_secs = v;
        }
        if let Some(v) = partial.sync.binary {
            self.sync.binary = v;
        }
        if let Some(v) = partial.sync.command_deadline_secs {
            self.sync.command_deadline_secs = v;
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(v) = std::env::var("HOLDFAST_REPOS_DIR") {
            self.repos_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("HOLDFAST_LOCK_DIR") {
            self.lock_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("HOLDFAST_LOCK_TIMEOUT_MS") {
            self.lock_timeout_ms = v.parse().map_err(|e| {
                Error::InvalidConfig(format!("HOLDFAST_LOCK_TIMEOUT_MS '{v}': {e}"))
            })?;
        }
        if let Ok(v) = std::env::var("HOLDFAST_SHUTDOWN_TIMEOUT_SECS") {
            self.shutdown_timeout_secs = v.parse().map_err(|e| {
                Error::InvalidConfig(format!("HOLDFAST_SHUTDOWN_TIMEOUT_SECS '{v}': {e}"))
            })?;
        }
        if let Ok(v) = std::env::var("HOLDFAST_SYNC_BINARY") {
            self.sync.binary = v;
        }
        if let Ok(v) = std::env::var("HOLDFAST_SYNC_DEADLINE_SECS") {
            self.sync.command_deadline_secs = v.parse().map_err(|e| {
                Error::InvalidConfig(format!("HOLDFAST_SYNC_DEADLINE_SECS '{v}': {e}"))
            })?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.lock_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "lock_timeout_ms must be greater than zero".into(),
            ));
        }
        if self.sync.command_deadline_secs == 0 {
            return Err(Error::InvalidConfig(
                "sync.command_deadline_secs must be greater than zero".into(),
            ));
        }
        if self.sync.binary.is_empty() {
            return Err(Error::InvalidConfig("sync.binary cannot be empty".into()));
        }
        Ok(())
    }

    /// Default lock acquisition timeout.
    #[must_use]
    pub const fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// Per-command deadline for the sync runner.
    #[must_use]
    pub const fn command_deadline(&self) -> Duration {
        Duration::from_secs(self.sync.command_deadline_secs)
    }

    /// Shutdown grace period.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Resolve the sync daemon binary to an executable path.
    ///
    /// A bare name is looked up on `PATH`; anything containing a path
    /// separator is used as-is.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if a bare name is not on `PATH`.
    pub fn resolve_sync_binary(&self) -> Result<PathBuf> {
        let configured = Path::new(&self.sync.binary);
        if configured.components().count() > 1 {
            return Ok(configured.to_path_buf());
        }
        which::which(&self.sync.binary).map_err(|e| {
            Error::InvalidConfig(format!(
                "sync binary '{}' not found on PATH: {e}",
                self.sync.binary
            ))
        })
    }
}
