//! Structured events consumed from session log files.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One line of the append-only NDJSON session log.
///
/// The log format is an external contract produced by the agent
/// orchestration process; this core only consumes it. Ordering is file
/// order, which is chronological.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct LogEvent {
    /// Event timestamp as written by the producer.
    pub timestamp: DateTime<Utc>,
    /// Instance (agent) name the event belongs to.
    pub instance: String,
    /// Opaque structured payload.
    #[serde(default)]
    pub event: serde_json::Value,
}
