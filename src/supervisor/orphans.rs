//! Orphan reconciliation sweep.
//!
//! Cross-checks the OS process table against the record store in both
//! directions: forwarder-signature pids with no running record are
//! terminated, and running records whose pid is dead are flipped to
//! stopped. The sweep only acts on processes it can independently
//! verify as alive or dead, never on store state alone, so it is safe
//! to run concurrently with start/stop.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ForwarderConfig;
use crate::liveness;
use crate::models::process::{ManagedProcess, ProcessStatus};
use crate::persistence::ProcessStore;

use super::signals::{signal_group, GroupSignal};

/// Spawn the periodic orphan sweep.
///
/// Cooperatively stoppable: the `CancellationToken` is checked at every
/// loop iteration.
#[must_use]
pub fn spawn_orphan_sweep(
    store: Arc<dyn ProcessStore>,
    forwarder: ForwarderConfig,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("orphan sweep shutting down");
                    break;
                }
                () = tokio::time::sleep(forwarder.orphan_sweep_interval()) => {}
            }
            sweep_once(store.as_ref(), &forwarder).await;
        }
    })
}

/// Run one reconciliation pass. A failure probing one pid never
/// prevents probing the rest.
///
/// Stray termination is deferred for a whole pass whenever any running
/// record has no pid yet: such a record is mid-start, its process
/// already matches the signature, and signaling it would kill a
/// forwarder we own. The next sweep sees the persisted pid and
/// reconciles normally.
pub async fn sweep_once(store: &dyn ProcessStore, forwarder: &ForwarderConfig) {
    let os_pids = list_pids_matching(forwarder.signature()).await;

    // Snapshot records after the process table so a pid persisted while
    // the enumeration ran is still seen as tracked.
    let running = match store.list_running().await {
        Ok(records) => records,
        Err(err) => {
            warn!(%err, "orphan sweep cannot list running records, skipping pass");
            return;
        }
    };

    if running.iter().any(|record| record.pid.is_none()) {
        debug!("running record without a pid, deferring stray termination");
    } else {
        let tracked: HashSet<u32> = running.iter().filter_map(|record| record.pid).collect();
        let strays: Vec<u32> = os_pids
            .into_iter()
            .filter(|pid| !tracked.contains(pid))
            .collect();
        if !strays.is_empty() {
            for pid in &strays {
                warn!(pid, "terminating orphaned forwarder process");
                signal_group(*pid, GroupSignal::Terminate);
            }
            tokio::time::sleep(forwarder.orphan_grace()).await;
            for pid in &strays {
                if liveness::alive(*pid) {
                    warn!(pid, "orphan survived TERM, escalating to KILL");
                    signal_group(*pid, GroupSignal::Kill);
                }
            }
        }
    }

    flip_dead_records(store, &running, liveness::alive).await;
}

/// Flip running records whose pid is verifiably dead to `Stopped`.
///
/// Records without a pid are mid-start and left alone. The alive probe
/// is injected so tests can drive the reconciliation without real
/// processes.
pub async fn flip_dead_records<F>(
    store: &dyn ProcessStore,
    running: &[ManagedProcess],
    alive: F,
) where
    F: Fn(u32) -> bool,
{
    for record in running {
        let Some(pid) = record.pid else {
            continue;
        };
        if alive(pid) {
            continue;
        }
        match store
            .transition(
                &record.id,
                ProcessStatus::Running,
                ProcessStatus::Stopped,
                Some(Utc::now()),
            )
            .await
        {
            Ok(true) => {
                info!(record_id = %record.id, pid, "flipped dead running record to stopped");
            }
            Ok(false) => {}
            Err(err) => {
                warn!(record_id = %record.id, %err, "failed to flip dead record");
            }
        }
    }
}

/// Enumerate live pids whose command line matches `signature`, excluding
/// this process. Any enumeration failure yields an empty list.
async fn list_pids_matching(signature: &str) -> Vec<u32> {
    let output = match Command::new("pgrep").args(["-f", signature]).output().await {
        Ok(output) => output,
        Err(err) => {
            debug!(%err, "pgrep unavailable, skipping process-table scan");
            return Vec::new();
        }
    };
    // pgrep exits 1 when nothing matches; that is a normal empty result.
    let own_pid = std::process::id();
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter_map(|line| line.trim().parse::<u32>().ok())
        .filter(|pid| *pid != own_pid)
        .collect()
}
