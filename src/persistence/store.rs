//! Record store port for supervised process records.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::process::{ManagedProcess, ProcessStatus};
use crate::Result;

/// CRUD and filtered queries over [`ManagedProcess`] records.
///
/// The store is the single source of truth for "should a process be
/// running", but callers always cross-check against actual OS process
/// existence before trusting it. Status transitions are atomic
/// "update only if currently in state X" operations.
#[async_trait]
pub trait ProcessStore: Send + Sync {
    /// Insert a new record.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Store` if the insert fails.
    async fn create(&self, record: &ManagedProcess) -> Result<()>;

    /// Retrieve a record by identifier.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the record does not exist, or
    /// `AppError::Store` on query failure.
    async fn get_by_id(&self, id: &str) -> Result<ManagedProcess>;

    /// All records for one owner, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Store` on query failure.
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<ManagedProcess>>;

    /// All records currently marked running.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Store` on query failure.
    async fn list_running(&self) -> Result<Vec<ManagedProcess>>;

    /// Records marked running for one owner.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Store` on query failure.
    async fn list_running_for(&self, owner_id: &str) -> Result<Vec<ManagedProcess>>;

    /// Record the OS pid after a successful spawn.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Store` on update failure.
    async fn set_pid(&self, id: &str, pid: u32) -> Result<()>;

    /// Atomically move a record from `from` to `to`, setting
    /// `stopped_at` when provided. Returns `false` when the record was
    /// not in `from` (the precondition failed), which callers treat as
    /// "someone else already transitioned it".
    ///
    /// # Errors
    ///
    /// Returns `AppError::Store` when the transition is not permitted by
    /// the lifecycle or the update fails.
    async fn transition(
        &self,
        id: &str,
        from: ProcessStatus,
        to: ProcessStatus,
        stopped_at: Option<DateTime<Utc>>,
    ) -> Result<bool>;

    /// Delete stopped/error records whose `stopped_at` is older than
    /// `cutoff`. Running records are never purged. Returns the number
    /// of deleted records.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Store` on delete failure.
    async fn purge_stopped_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}
