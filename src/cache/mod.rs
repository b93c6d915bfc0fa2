//! Shared short-TTL cache port.
//!
//! The cache is the single source of truth for mutual exclusion on an
//! (owner, resource) pair, so the contract requires atomic first-set
//! semantics. Components receive an `Arc<dyn SharedCache>` through their
//! constructors; tests and single-node deployments use [`MemoryCache`].

mod memory;

use std::time::Duration;

use async_trait::async_trait;

use crate::Result;

pub use memory::MemoryCache;

/// Keyspace-isolated cache with TTL expiry and atomic first-set writes.
#[async_trait]
pub trait SharedCache: Send + Sync {
    /// Store `value` under `key` for at most `ttl`, replacing any holder.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Cache` when the backing store is unreachable.
    async fn write(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Read the live value under `key`; expired entries read as absent.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Cache` when the backing store is unreachable.
    async fn read(&self, key: &str) -> Result<Option<String>>;

    /// Remove `key` if present.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Cache` when the backing store is unreachable.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Whether a live value exists under `key`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Cache` when the backing store is unreachable.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Atomically store `value` only when no live value exists under
    /// `key`. Returns `true` when this call won the write.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Cache` when the backing store is unreachable.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool>;
}
