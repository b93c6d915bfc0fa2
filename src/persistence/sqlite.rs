//! `SQLite` record store backend.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use crate::models::process::{ManagedProcess, ProcessStatus};
use crate::{AppError, Result};

use super::ProcessStore;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS managed_process (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL,
    pid INTEGER,
    status TEXT NOT NULL,
    started_at TEXT NOT NULL,
    stopped_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_managed_process_owner
    ON managed_process (owner_id, status);";

/// Record store backed by a `SQLite` pool.
#[derive(Clone)]
pub struct SqliteProcessStore {
    pool: SqlitePool,
}

impl SqliteProcessStore {
    /// Open (creating if missing) a store at `path` and apply the schema.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Store` if the connection or schema application
    /// fails, or `AppError::Io` if the parent directory cannot be created.
    pub async fn connect(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        Self::bootstrap(pool).await
    }

    /// Open an in-memory store; used by tests.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Store` if the connection or schema application
    /// fails.
    pub async fn connect_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(AppError::from)?;
        // A single connection keeps every query on the same in-memory db.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Self::bootstrap(pool).await
    }

    async fn bootstrap(pool: SqlitePool) -> Result<Self> {
        for statement in SCHEMA.split(';') {
            let statement = statement.trim();
            if !statement.is_empty() {
                sqlx::query(statement).execute(&pool).await?;
            }
        }
        Ok(Self { pool })
    }
}

fn record_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<ManagedProcess> {
    let pid: Option<i64> = row.try_get("pid")?;
    let pid = match pid {
        Some(raw) => Some(
            u32::try_from(raw)
                .map_err(|_| AppError::Store(format!("pid out of range: {raw}")))?,
        ),
        None => None,
    };
    let status: String = row.try_get("status")?;
    let started_at: String = row.try_get("started_at")?;
    let stopped_at: Option<String> = row.try_get("stopped_at")?;

    Ok(ManagedProcess {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        pid,
        status: ProcessStatus::parse(&status)?,
        started_at: parse_ts(&started_at)?,
        stopped_at: stopped_at.as_deref().map(parse_ts).transpose()?,
    })
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|err| AppError::Store(format!("bad timestamp {raw}: {err}")))
}

#[async_trait]
impl ProcessStore for SqliteProcessStore {
    async fn create(&self, record: &ManagedProcess) -> Result<()> {
        sqlx::query(
            "INSERT INTO managed_process (id, owner_id, pid, status, started_at, stopped_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.id)
        .bind(&record.owner_id)
        .bind(record.pid.map(i64::from))
        .bind(record.status.as_str())
        .bind(record.started_at.to_rfc3339())
        .bind(record.stopped_at.map(|ts| ts.to_rfc3339()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<ManagedProcess> {
        let row = sqlx::query("SELECT * FROM managed_process WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => record_from_row(&row),
            None => Err(AppError::NotFound(format!("process record {id}"))),
        }
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<ManagedProcess>> {
        let rows = sqlx::query(
            "SELECT * FROM managed_process WHERE owner_id = ? ORDER BY started_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(record_from_row).collect()
    }

    async fn list_running(&self) -> Result<Vec<ManagedProcess>> {
        let rows = sqlx::query("SELECT * FROM managed_process WHERE status = 'running'")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(record_from_row).collect()
    }

    async fn list_running_for(&self, owner_id: &str) -> Result<Vec<ManagedProcess>> {
        let rows = sqlx::query(
            "SELECT * FROM managed_process WHERE owner_id = ? AND status = 'running'",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(record_from_row).collect()
    }

    async fn set_pid(&self, id: &str, pid: u32) -> Result<()> {
        sqlx::query("UPDATE managed_process SET pid = ? WHERE id = ?")
            .bind(i64::from(pid))
            .bind(id)
            .execute(&self.pool)
            .await?;
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

        let outcome = sqlx::query(
            "UPDATE managed_process \
             SET status = ?, stopped_at = COALESCE(?, stopped_at) \
             WHERE id = ? AND status = ?",
        )
        .bind(to.as_str())
        .bind(stopped_at.map(|ts| ts.to_rfc3339()))
        .bind(id)
        .bind(from.as_str())
        .execute(&self.pool)
        .await?;
        Ok(outcome.rows_affected() == 1)
    }

    async fn purge_stopped_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let outcome = sqlx::query(
            "DELETE FROM managed_process \
             WHERE status IN ('stopped', 'error') AND stopped_at < ?",
        )
        .bind(cutoff.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(outcome.rows_affected())
    }
}
