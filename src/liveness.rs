//! Process and session liveness probes.
//!
//! Cheap checks only: a zero-signal probe, a multiplexer existence
//! query, and symlink stats. These run on every status poll, so nothing
//! here spawns a subprocess beyond the multiplexer query for
//! interactive sessions.

use std::path::Path;

use tokio::process::Command;
use tracing::debug;

/// Whether the given pid refers to a live process.
///
/// Sends a zero-signal probe. "No such process" is dead; permission
/// denied (or any other errno) is not confirmable alive and reported as
/// dead rather than raised.
#[cfg(unix)]
#[must_use]
pub fn alive(pid: u32) -> bool {
    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    nix::sys::signal::kill(nix::unistd::Pid::from_raw(raw), None).is_ok()
}

/// Non-unix fallback: liveness cannot be probed, report not alive.
#[cfg(not(unix))]
#[must_use]
pub fn alive(_pid: u32) -> bool {
    false
}

/// Whether a terminal-multiplexer session with exactly this name exists.
///
/// True only on a successful existence check; a missing `tmux` binary or
/// a failed query both report `false`.
pub async fn alive_in_multiplexer(session_name: &str) -> bool {
    // `=` forces an exact-name match instead of tmux's prefix matching.
    let target = format!("={session_name}");
    match Command::new("tmux")
        .args(["has-session", "-t", &target])
        .output()
        .await
    {
        Ok(output) => output.status.success(),
        Err(err) => {
            debug!(session_name, %err, "multiplexer query failed");
            false
        }
    }
}

/// Whether a session is still active, derived from its run directory.
///
/// Interactive sessions check multiplexer-session existence. Otherwise,
/// any alive pid recorded under `<run_dir>/pids/*.pid` means active;
/// when no pid bookkeeping exists, fall back to whether the recorded
/// run directory still resolves to an existing path.
pub async fn session_active(run_dir: &Path, multiplexer_session: Option<&str>) -> bool {
    if let Some(name) = multiplexer_session {
        return alive_in_multiplexer(name).await;
    }

    match recorded_pids(run_dir) {
        Some(pids) => pids.into_iter().any(alive),
        None => std::fs::metadata(run_dir).is_ok(),
    }
}

/// Read pid files under `<run_dir>/pids/`. `None` when no pid
/// bookkeeping exists for the session.
fn recorded_pids(run_dir: &Path) -> Option<Vec<u32>> {
    let pid_dir = run_dir.join("pids");
    let entries = std::fs::read_dir(pid_dir).ok()?;

    let mut pids = Vec::new();
    let mut saw_pid_file = false;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "pid") {
            saw_pid_file = true;
            if let Ok(raw) = std::fs::read_to_string(&path) {
                if let Ok(pid) = raw.trim().parse::<u32>() {
                    pids.push(pid);
                }
            }
        }
    }

    saw_pid_file.then_some(pids)
}
