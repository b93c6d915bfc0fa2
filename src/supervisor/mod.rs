//! Forwarder process supervision.
//!
//! One long-lived forwarder process per project relays externally
//! pushed events into the application. The supervisor owns the full
//! lifecycle: spawn as a process-group leader, drain output pipes,
//! watch for exit, stop with TERM-then-KILL escalation, and reconcile
//! orphans against the record store.

mod forwarder;
pub mod orphans;
mod signals;

pub use forwarder::{ForwarderSupervisor, ForwarderTarget};
