//! In-memory record store backend for tests and fakes.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::models::process::{ManagedProcess, ProcessStatus};
use crate::{AppError, Result};

use super::ProcessStore;

/// [`ProcessStore`] implementation over a guarded map. Satisfies the
/// same contract as the `SQLite` backend, including the atomic
/// compare-and-set transition semantics.
#[derive(Debug, Default)]
pub struct MemoryProcessStore {
    records: Mutex<HashMap<String, ManagedProcess>>,
}

impl MemoryProcessStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProcessStore for MemoryProcessStore {
    async fn create(&self, record: &ManagedProcess) -> Result<()> {
        let mut records = self.records.lock().await;
        if records.contains_key(&record.id) {
            return Err(AppError::Store(format!("duplicate record id {}", record.id)));
        }
        records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<ManagedProcess> {
        self.records
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("process record {id}")))
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<ManagedProcess>> {
        let records = self.records.lock().await;
        let mut matching: Vec<ManagedProcess> = records
            .values()
            .filter(|record| record.owner_id == owner_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(matching)
    }

    async fn list_running(&self) -> Result<Vec<ManagedProcess>> {
        let records = self.records.lock().await;
        Ok(records
            .values()
            .filter(|record| record.status == ProcessStatus::Running)
            .cloned()
            .collect())
    }

    async fn list_running_for(&self, owner_id: &str) -> Result<Vec<ManagedProcess>> {
        let records = self.records.lock().await;
        Ok(records
            .values()
            .filter(|record| {
                record.owner_id == owner_id && record.status == ProcessStatus::Running
            })
            .cloned()
            .collect())
    }

    async fn set_pid(&self, id: &str, pid: u32) -> Result<()> {
        let mut records = self.records.lock().await;
        if let Some(record) = records.get_mut(id) {
            record.pid = Some(pid);
        }
        Ok(())
    }

    async fn transition(
        &self,
        id: &str,
        from: ProcessStatus,
        to: ProcessStatus,
        stopped_at: Option<DateTime<Utc>>,
    ) -> Result<bool> {
        if !from.can_transition_to(to) {
            return Err(AppError::Store(format!(
                "invalid status transition {} -> {}",
                from.as_str(),
                to.as_str()
            )));
        }

        let mut records = self.records.lock().await;
        match records.get_mut(id) {
            Some(record) if record.status == from => {
                record.status = to;
                if stopped_at.is_some() {
                    record.stopped_at = stopped_at;
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn purge_stopped_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|_, record| {
            record.status == ProcessStatus::Running
                || record.stopped_at.is_none_or(|stopped| stopped >= cutoff)
        });
        Ok(u64::try_from(before - records.len()).unwrap_or(u64::MAX))
    }
}
