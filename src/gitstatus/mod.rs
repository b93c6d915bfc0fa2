//! Working-tree status aggregation across a session's instances.
//!
//! Fans read-only `git status` probes out over the distinct set of
//! directories a session references, under bounded parallelism, then
//! re-expands results onto the instance mapping. Identical directories
//! referenced by multiple instances are probed exactly once
//! (single-flight); directories that no longer exist are skipped; a
//! probe failure omits that directory rather than aborting the batch.

pub mod porcelain;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::cache::SharedCache;
use crate::config::GitStatusConfig;
use crate::lock::OperationLock;
use crate::models::status::DirectoryStatus;
use crate::{AppError, Result};

/// Parallel, cached git status aggregator.
#[derive(Clone)]
pub struct GitStatusAggregator {
    cache: Arc<dyn SharedCache>,
    lock: OperationLock,
    freshness: Duration,
    max_parallel: usize,
}

impl GitStatusAggregator {
    /// Build an aggregator sharing the cache and lock used by git writers.
    #[must_use]
    pub fn new(
        cache: Arc<dyn SharedCache>,
        lock: OperationLock,
        config: &GitStatusConfig,
    ) -> Self {
        Self {
            cache,
            lock,
            freshness: config.freshness(),
            max_parallel: config.max_parallel_probes,
        }
    }

    /// Fetch the status of every directory used by the session's
    /// instances.
    ///
    /// Each instance in `instance_dirs` receives the status of all its
    /// directories; shared directories appear identically under every
    /// instance referencing them. Results are cached per session for
    /// the freshness window; `force` bypasses the cached batch, probes
    /// in the foreground, and rewrites the cache before returning (no
    /// background re-poll is scheduled). A directory currently held by
    /// an operation lock is
    /// served from the last cached batch instead of being probed, so
    /// the aggregator is never starved by locked directories.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Cache` when the cache is unreachable.
    /// Per-directory probe failures are logged and omitted, never fatal.
    pub async fn fetch(
        &self,
        session_id: &str,
        instance_dirs: &HashMap<String, Vec<PathBuf>>,
        force: bool,
    ) -> Result<HashMap<String, Vec<DirectoryStatus>>> {
        let (distinct, canonical_of) = resolve_distinct_dirs(instance_dirs);
        let cached = self.read_cached(session_id).await?;

        if !force {
            if let Some(ref batch) = cached {
                let covered = distinct
                    .iter()
                    .all(|dir| batch.contains_key(&key_for(dir)));
                if covered {
                    debug!(session_id, "serving git status from cached batch");
                    return Ok(expand(instance_dirs, &canonical_of, batch));
                }
            }
        }

        let mut batch: HashMap<String, DirectoryStatus> = HashMap::new();
        let mut to_probe: Vec<PathBuf> = Vec::new();
        for dir in distinct {
            let dir_key = key_for(&dir);
            if self.lock.locked(session_id, &dir_key).await {
                // A mutating git operation holds this directory; reuse
                // the last known status rather than blocking behind it.
                if let Some(stale) = cached.as_ref().and_then(|c| c.get(&dir_key)) {
                    batch.insert(dir_key, stale.clone());
                } else {
                    debug!(directory = %dir.display(), "locked directory with no cached status, omitting");
                }
            } else {
                to_probe.push(dir);
            }
        }

        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        let mut probes: JoinSet<(PathBuf, Result<DirectoryStatus>)> = JoinSet::new();
        for dir in to_probe {
            let semaphore = Arc::clone(&semaphore);
            probes.spawn(async move {
                let _permit = semaphore.acquire().await;
                let status = probe_directory(&dir).await;
                (dir, status)
            });
        }
        while let Some(joined) = probes.join_next().await {
            match joined {
                Ok((dir, Ok(status))) => {
                    batch.insert(key_for(&dir), status);
                }
                Ok((dir, Err(err))) => {
                    warn!(directory = %dir.display(), %err, "git probe failed, omitting directory");
                }
                Err(err) => {
                    warn!(%err, "git probe task panicked, omitting directory");
                }
            }
        }

        self.write_cached(session_id, &batch).await;
        Ok(expand(instance_dirs, &canonical_of, &batch))
    }

    async fn read_cached(
        &self,
        session_id: &str,
    ) -> Result<Option<HashMap<String, DirectoryStatus>>> {
        let Some(raw) = self.cache.read(&batch_key(session_id)).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(batch) => Ok(Some(batch)),
            Err(err) => {
                debug!(session_id, %err, "discarding undecodable cached status batch");
                Ok(None)
            }
        }
    }

    async fn write_cached(&self, session_id: &str, batch: &HashMap<String, DirectoryStatus>) {
        let Ok(raw) = serde_json::to_string(batch) else {
            return;
        };
        if let Err(err) = self
            .cache
            .write(&batch_key(session_id), &raw, self.freshness)
            .await
        {
            warn!(session_id, %err, "failed to cache status batch");
        }
    }
}

fn batch_key(session_id: &str) -> String {
    format!("gitstatus:{session_id}")
}

fn key_for(dir: &Path) -> String {
    dir.to_string_lossy().into_owned()
}

/// Collapse the instance mapping to the distinct set of existing,
/// readable directories, returning the set plus the original-path to
/// canonical-path mapping used to re-expand results.
#[must_use]
pub fn resolve_distinct_dirs(
    instance_dirs: &HashMap<String, Vec<PathBuf>>,
) -> (Vec<PathBuf>, HashMap<PathBuf, PathBuf>) {
    let mut canonical_of: HashMap<PathBuf, PathBuf> = HashMap::new();
    let mut distinct: Vec<PathBuf> = Vec::new();

    for dirs in instance_dirs.values() {
        for dir in dirs {
            if canonical_of.contains_key(dir) {
                continue;
            }
            let Ok(canonical) = dir.canonicalize() else {
                debug!(directory = %dir.display(), "skipping missing or unreadable directory");
                continue;
            };
            if !canonical.is_dir() {
                continue;
            }
            if !distinct.contains(&canonical) {
                distinct.push(canonical.clone());
            }
            canonical_of.insert(dir.clone(), canonical);
        }
    }

    (distinct, canonical_of)
}

fn expand(
    instance_dirs: &HashMap<String, Vec<PathBuf>>,
    canonical_of: &HashMap<PathBuf, PathBuf>,
    batch: &HashMap<String, DirectoryStatus>,
) -> HashMap<String, Vec<DirectoryStatus>> {
    let mut result = HashMap::new();
    for (instance, dirs) in instance_dirs {
        let mut statuses = Vec::new();
        for dir in dirs {
            if let Some(canonical) = canonical_of.get(dir) {
                if let Some(status) = batch.get(&key_for(canonical)) {
                    statuses.push(status.clone());
                }
            }
        }
        result.insert(instance.clone(), statuses);
    }
    result
}

/// Run one combined read-only status probe against a directory.
///
/// # Errors
///
/// Returns `AppError::Probe` when the directory is not a git worktree
/// or the command fails; callers omit the directory from results.
pub async fn probe_directory(dir: &Path) -> Result<DirectoryStatus> {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(["status", "--porcelain", "--branch"])
        .output()
        .await
        .map_err(|err| AppError::Probe(format!("git unavailable: {err}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AppError::Probe(format!(
            "git status failed for {}: {}",
            dir.display(),
            stderr.trim()
        )));
    }

    let text = String::from_utf8_lossy(&output.stdout);
    let (header, counts) = porcelain::parse_status_output(&text);

    // A linked worktree keeps a gitfile, not a directory, at `.git`.
    let is_worktree = tokio::fs::metadata(dir.join(".git"))
        .await
        .is_ok_and(|meta| meta.is_file());

    Ok(DirectoryStatus {
        directory: dir.to_path_buf(),
        branch: header.branch,
        staged: counts.staged,
        modified: counts.modified,
        untracked: counts.untracked,
        ahead: header.ahead,
        behind: header.behind,
        is_worktree,
        fetched_at: Utc::now(),
    })
}
