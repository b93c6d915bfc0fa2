#![forbid(unsafe_code)]

//! Session and process observability core for AI-agent swarm consoles.
//!
//! Supervises external forwarder processes, polls working trees for git
//! status in parallel, tails append-only NDJSON session logs, and
//! serializes concurrent git operations per directory through a
//! short-TTL cache lock.

pub mod cache;
pub mod config;
pub mod errors;
pub mod gitstatus;
pub mod liveness;
pub mod lock;
pub mod logwatch;
pub mod models;
pub mod persistence;
pub mod supervisor;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
