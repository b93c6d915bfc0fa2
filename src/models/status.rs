//! Working-tree status snapshot for a single directory.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point-in-time git status of one working directory.
///
/// Transient; recomputed per poll and optionally cached for a short
/// staleness window. `fetched_at` makes staleness observable by callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct DirectoryStatus {
    /// Probed directory (canonicalized).
    pub directory: PathBuf,
    /// Current branch name, if any (detached HEAD yields `None`).
    pub branch: Option<String>,
    /// Files with a staged (index) mutation.
    pub staged: u32,
    /// Files with a worktree mutation. A file modified in the index and
    /// again in the worktree counts in both `staged` and `modified`.
    pub modified: u32,
    /// Untracked files.
    pub untracked: u32,
    /// Commits ahead of the upstream branch.
    pub ahead: u32,
    /// Commits behind the upstream branch.
    pub behind: u32,
    /// Whether the directory is a linked secondary worktree.
    pub is_worktree: bool,
    /// When the probe ran.
    pub fetched_at: DateTime<Utc>,
}
