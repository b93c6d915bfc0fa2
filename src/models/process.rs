//! Managed forwarder process record and lifecycle helpers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppError, Result};

/// Lifecycle status for a supervised forwarder process.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    /// Process is not running.
    Stopped,
    /// Process was spawned and has not been observed to exit.
    Running,
    /// Process exited abnormally or failed to spawn.
    Error,
}

impl ProcessStatus {
    /// Stable string form used by the persistence layer.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Running => "running",
            Self::Error => "error",
        }
    }

    /// Parse the persisted string form.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Parse` for an unrecognized status string.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "stopped" => Ok(Self::Stopped),
            "running" => Ok(Self::Running),
            "error" => Ok(Self::Error),
            other => Err(AppError::Parse(format!("unknown process status: {other}"))),
        }
    }

    /// Determine whether a lifecycle transition is permitted.
    ///
    /// Records are created directly in `Running`; the only onward moves
    /// are `Running -> {Stopped, Error}` and `Error -> Stopped` cleanup.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Running, Self::Stopped | Self::Error) | (Self::Error, Self::Stopped)
        )
    }
}

/// Supervised process record persisted in the record store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ManagedProcess {
    /// Unique record identifier.
    pub id: String,
    /// Owning project identifier; immutable after creation.
    pub owner_id: String,
    /// OS process id, absent until the spawn succeeds.
    pub pid: Option<u32>,
    /// Current lifecycle status.
    pub status: ProcessStatus,
    /// Spawn timestamp.
    pub started_at: DateTime<Utc>,
    /// Exit or cleanup timestamp.
    pub stopped_at: Option<DateTime<Utc>>,
}

impl ManagedProcess {
    /// Construct a record for a process about to be spawned.
    #[must_use]
    pub fn new(owner_id: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id,
            pid: None,
            status: ProcessStatus::Running,
            started_at: Utc::now(),
            stopped_at: None,
        }
    }

    /// Determine whether a lifecycle transition is permitted.
    #[must_use]
    pub fn can_transition_to(&self, next: ProcessStatus) -> bool {
        self.status.can_transition_to(next)
    }
}
