//! Global configuration parsing and validation.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::{AppError, Result};

/// Supervised forwarder process configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ForwarderConfig {
    /// Forwarder binary (e.g., `smee`).
    pub command: String,
    /// Default arguments for the forwarder binary.
    #[serde(default)]
    pub args: Vec<String>,
    /// Base URL the forwarder relays events to; per-project hook paths
    /// are appended. Empty disables forwarding globally.
    #[serde(default)]
    pub callback_base_url: String,
    /// Command signature used to find orphaned forwarder processes.
    /// Defaults to the command name when absent.
    #[serde(default)]
    pub signature: Option<String>,
    /// Grace period before a stop escalates from TERM to KILL.
    #[serde(default = "default_stop_grace_seconds")]
    pub stop_grace_seconds: u64,
    /// Pause between stop and start during a restart, letting the OS
    /// release ports and pipes.
    #[serde(default = "default_restart_delay_ms")]
    pub restart_delay_ms: u64,
    /// Interval between orphan reconciliation sweeps.
    #[serde(default = "default_orphan_sweep_seconds")]
    pub orphan_sweep_seconds: u64,
    /// Grace period before an orphaned pid is force-killed.
    #[serde(default = "default_orphan_grace_seconds")]
    pub orphan_grace_seconds: u64,
}

fn default_stop_grace_seconds() -> u64 {
    5
}

fn default_restart_delay_ms() -> u64 {
    500
}

fn default_orphan_sweep_seconds() -> u64 {
    60
}

fn default_orphan_grace_seconds() -> u64 {
    2
}

impl ForwarderConfig {
    /// Command signature used for orphan process enumeration.
    #[must_use]
    pub fn signature(&self) -> &str {
        self.signature.as_deref().unwrap_or(&self.command)
    }

    /// Grace period for the stop path.
    #[must_use]
    pub fn stop_grace(&self) -> Duration {
        Duration::from_secs(self.stop_grace_seconds)
    }

    /// Delay between stop and start during a restart.
    #[must_use]
    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }

    /// Interval between orphan sweeps.
    #[must_use]
    pub fn orphan_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.orphan_sweep_seconds)
    }

    /// Grace period before escalating on an orphaned pid.
    #[must_use]
    pub fn orphan_grace(&self) -> Duration {
        Duration::from_secs(self.orphan_grace_seconds)
    }
}

/// Per-directory operation lock tuning.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct LockConfig {
    /// Lock time-to-live; a crashed holder loses the lock after this.
    #[serde(default = "default_lock_ttl_seconds")]
    pub ttl_seconds: u64,
    /// Maximum acquisition attempts before failing with a lock timeout.
    #[serde(default = "default_lock_max_attempts")]
    pub max_attempts: u32,
    /// First backoff wait; doubles on each contended attempt.
    #[serde(default = "default_lock_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Upper bound for a single backoff wait.
    #[serde(default = "default_lock_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_lock_ttl_seconds() -> u64 {
    30
}

fn default_lock_max_attempts() -> u32 {
    10
}

fn default_lock_initial_backoff_ms() -> u64 {
    200
}

fn default_lock_max_backoff_ms() -> u64 {
    2000
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_lock_ttl_seconds(),
            max_attempts: default_lock_max_attempts(),
            initial_backoff_ms: default_lock_initial_backoff_ms(),
            max_backoff_ms: default_lock_max_backoff_ms(),
        }
    }
}

impl LockConfig {
    /// Lock time-to-live.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    /// First backoff wait.
    #[must_use]
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    /// Upper bound for a single backoff wait.
    #[must_use]
    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

/// Git status aggregation tuning.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GitStatusConfig {
    /// Staleness window for cached per-session status batches.
    #[serde(default = "default_freshness_seconds")]
    pub freshness_seconds: u64,
    /// Bound on concurrent per-directory probes.
    #[serde(default = "default_max_parallel_probes")]
    pub max_parallel_probes: usize,
}

fn default_freshness_seconds() -> u64 {
    10
}

fn default_max_parallel_probes() -> usize {
    8
}

impl Default for GitStatusConfig {
    fn default() -> Self {
        Self {
            freshness_seconds: default_freshness_seconds(),
            max_parallel_probes: default_max_parallel_probes(),
        }
    }
}

impl GitStatusConfig {
    /// Staleness window for cached batches.
    #[must_use]
    pub fn freshness(&self) -> Duration {
        Duration::from_secs(self.freshness_seconds)
    }
}

/// Log tail polling tuning.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct LogWatchConfig {
    /// Sleep between empty reads while waiting for appended bytes.
    #[serde(default = "default_tail_poll_ms")]
    pub poll_interval_ms: u64,
}

fn default_tail_poll_ms() -> u64 {
    100
}

impl Default for LogWatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_tail_poll_ms(),
        }
    }
}

impl LogWatchConfig {
    /// Sleep between empty reads.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_retention_days() -> u32 {
    7
}

fn default_store_path() -> PathBuf {
    PathBuf::from("swarm-watch.db")
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Path for the persisted process-record store.
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    /// Days after a process stops before its record may be purged.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    /// Forwarder process supervision settings.
    pub forwarder: ForwarderConfig,
    /// Operation lock settings.
    #[serde(default)]
    pub lock: LockConfig,
    /// Git status aggregation settings.
    #[serde(default)]
    pub gitstatus: GitStatusConfig,
    /// Log tailing settings.
    #[serde(default)]
    pub logwatch: LogWatchConfig,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.forwarder.command.trim().is_empty() {
            return Err(AppError::Config("forwarder.command must not be empty".into()));
        }

        if self.lock.max_attempts == 0 {
            return Err(AppError::Config(
                "lock.max_attempts must be greater than zero".into(),
            ));
        }

        if self.gitstatus.max_parallel_probes == 0 {
            return Err(AppError::Config(
                "gitstatus.max_parallel_probes must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}
