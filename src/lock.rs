//! Short-TTL mutual exclusion keyed by (owner, resource).
//!
//! Backed by the shared cache's atomic first-set write, so exclusion
//! holds cluster-wide when the cache is shared. The TTL is the deadlock
//! breaker: a holder that crashes loses the lock once it elapses.
//! Anything that shells out to a write-capable git command for a working
//! directory acquires one of these first.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::cache::SharedCache;
use crate::config::LockConfig;
use crate::{AppError, Result};

/// Cooperative lock over the shared cache.
#[derive(Clone)]
pub struct OperationLock {
    cache: Arc<dyn SharedCache>,
    ttl: Duration,
    max_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl OperationLock {
    /// Build a lock from configuration.
    #[must_use]
    pub fn new(cache: Arc<dyn SharedCache>, config: &LockConfig) -> Self {
        Self {
            cache,
            ttl: config.ttl(),
            max_attempts: config.max_attempts,
            initial_backoff: config.initial_backoff(),
            max_backoff: config.max_backoff(),
        }
    }

    /// Run `op` while holding the lock for `(owner_id, resource_key)`.
    ///
    /// The lock is released on every exit path, including when `op`
    /// returns an error, by deleting the cache key only while our holder
    /// token is still the stored one. Two different resource keys are
    /// independently lockable.
    ///
    /// # Errors
    ///
    /// Returns `AppError::LockTimeout` when acquisition stays contended
    /// through all retries, or propagates the result of `op`.
    pub async fn with_lock<T, F, Fut>(
        &self,
        owner_id: &str,
        resource_key: &str,
        op: F,
    ) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let key = cache_key(owner_id, resource_key);
        let token = self.acquire(&key).await?;
        let result = op().await;
        self.release(&key, &token).await;
        result
    }

    /// Whether the lock for `(owner_id, resource_key)` is currently held.
    pub async fn locked(&self, owner_id: &str, resource_key: &str) -> bool {
        let key = cache_key(owner_id, resource_key);
        self.cache.exists(&key).await.unwrap_or(false)
    }

    /// Drop a lock regardless of its holder. Recovery hatch for operators.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Cache` when the cache delete fails.
    pub async fn force_release(&self, owner_id: &str, resource_key: &str) -> Result<()> {
        let key = cache_key(owner_id, resource_key);
        self.cache.delete(&key).await
    }

    async fn acquire(&self, key: &str) -> Result<String> {
        let token = format!("{}-{}", std::process::id(), Uuid::new_v4());
        let mut wait = self.initial_backoff;

        for attempt in 1..=self.max_attempts {
            if self.cache.set_if_absent(key, &token, self.ttl).await? {
                debug!(key, attempt, "operation lock acquired");
                return Ok(token);
            }
            if attempt == self.max_attempts {
                break;
            }
            debug!(key, attempt, ?wait, "lock contended, backing off");
            tokio::time::sleep(wait).await;
            wait = (wait * 2).min(self.max_backoff);
        }

        Err(AppError::LockTimeout(
            "another operation is in progress".into(),
        ))
    }

    async fn release(&self, key: &str, token: &str) {
        // Delete only while still held: a TTL expiry followed by another
        // holder's acquisition must not be clobbered.
        match self.cache.read(key).await {
            Ok(Some(current)) if current == token => {
                if let Err(err) = self.cache.delete(key).await {
                    warn!(key, %err, "failed to release operation lock");
                }
            }
            Ok(_) => {
                debug!(key, "lock already expired or taken over, skipping release");
            }
            Err(err) => {
                warn!(key, %err, "failed to read lock holder during release");
            }
        }
    }
}

/// Deterministic cache key with path separators escaped so nested
/// directories never collide across the keyspace.
fn cache_key(owner_id: &str, resource_key: &str) -> String {
    let normalized = resource_key.replace(['/', '\\'], "__");
    format!("oplock:{owner_id}:{normalized}")
}
