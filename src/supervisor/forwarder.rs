//! Forwarder process lifecycle: start, stop, restart.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, info_span, warn};

use crate::config::GlobalConfig;
use crate::liveness;
use crate::models::process::{ManagedProcess, ProcessStatus};
use crate::persistence::ProcessStore;
use crate::{AppError, Result};

use super::signals::{signal_group, GroupSignal};

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Project-level inputs deciding whether a forwarder should run.
///
/// Derived by the web layer from project configuration; the supervisor
/// treats it as a value.
#[derive(Debug, Clone)]
pub struct ForwarderTarget {
    /// Owning project identifier.
    pub owner_id: String,
    /// Whether event forwarding is enabled for the project.
    pub forwarding_enabled: bool,
    /// Number of enabled event subscriptions downstream of the forwarder.
    pub enabled_subscriptions: u32,
}

/// Supervisor for one forwarder process per project.
#[derive(Clone)]
pub struct ForwarderSupervisor {
    config: Arc<GlobalConfig>,
    store: Arc<dyn ProcessStore>,
}

impl ForwarderSupervisor {
    /// Build a supervisor over the given record store.
    #[must_use]
    pub fn new(config: Arc<GlobalConfig>, store: Arc<dyn ProcessStore>) -> Self {
        Self { config, store }
    }

    /// Start a forwarder for `target` unless one should not run.
    ///
    /// No-op (returns `Ok(None)`) when forwarding is disabled for the
    /// target, a running record already exists, the callback base URL
    /// is not configured, or the target has no enabled subscriptions.
    /// Otherwise persists a `Running` record, spawns the forwarder as
    /// its own process-group leader, and attaches pipe drainers plus an
    /// exit watcher that flips the record when the process dies.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Spawn` when the OS refuses the spawn; the
    /// record is marked `Error` with a stop timestamp first.
    pub async fn start(&self, target: &ForwarderTarget) -> Result<Option<ManagedProcess>> {
        let span = info_span!("forwarder_start", owner = %target.owner_id);
        let _guard = span.enter();

        if !target.forwarding_enabled {
            debug!("forwarding disabled for owner, skipping start");
            return Ok(None);
        }
        if !self.store.list_running_for(&target.owner_id).await?.is_empty() {
            debug!("forwarder already running for owner, skipping start");
            return Ok(None);
        }
        if self.config.forwarder.callback_base_url.trim().is_empty() {
            warn!("callback base url not configured, skipping forwarder start");
            return Ok(None);
        }
        if target.enabled_subscriptions == 0 {
            debug!("no enabled subscriptions, skipping forwarder start");
            return Ok(None);
        }

        let record = ManagedProcess::new(target.owner_id.clone());
        self.store.create(&record).await?;

        let callback_url = format!(
            "{}/hooks/{}",
            self.config.forwarder.callback_base_url.trim_end_matches('/'),
            target.owner_id
        );

        let mut cmd = Command::new(&self.config.forwarder.command);
        cmd.args(&self.config.forwarder.args)
            .env("SWARM_WATCH_CALLBACK_URL", &callback_url)
            .env("SWARM_WATCH_OWNER_ID", &target.owner_id)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(err) => {
                // Mark the record before the error propagates so the UI
                // never shows a phantom running forwarder.
                if let Err(store_err) = self
                    .store
                    .transition(
                        &record.id,
                        ProcessStatus::Running,
                        ProcessStatus::Error,
                        Some(Utc::now()),
                    )
                    .await
                {
                    warn!(%store_err, "failed to mark record after spawn failure");
                }
                return Err(AppError::Spawn(format!(
                    "failed to spawn forwarder: {err}"
                )));
            }
        };

        let Some(pid) = child.id() else {
            // The child was reaped before a pid could be read. Never
            // persist a zero pid: signaling group 0 would hit our own
            // process group.
            if let Err(store_err) = self
                .store
                .transition(
                    &record.id,
                    ProcessStatus::Running,
                    ProcessStatus::Error,
                    Some(Utc::now()),
                )
                .await
            {
                warn!(%store_err, "failed to mark record after pid-less spawn");
            }
            return Err(AppError::Spawn(
                "forwarder exited before a pid could be recorded".into(),
            ));
        };
        self.store.set_pid(&record.id, pid).await?;
        info!(
            record_id = %record.id,
            pid,
            command = %self.config.forwarder.command,
            callback_url = %callback_url,
            "forwarder process spawned"
        );

        // Drain both pipes so back-pressure never blocks the child.
        if let Some(stdout) = child.stdout.take() {
            spawn_drain(target.owner_id.clone(), "stdout", stdout);
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_drain(target.owner_id.clone(), "stderr", stderr);
        }

        self.spawn_exit_watcher(record.clone(), child);

        let mut started = record;
        started.pid = Some(pid);
        Ok(Some(started))
    }

    /// Stop a forwarder record. No-op unless the record is running.
    ///
    /// Sends a group TERM, waits up to the configured grace period for
    /// exit, then escalates to a group KILL. Always finishes with the
    /// record marked `Stopped` with a stop timestamp; a process that
    /// was already gone counts as success.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Store` when the final record update fails.
    pub async fn stop(&self, record: &ManagedProcess) -> Result<()> {
        if record.status != ProcessStatus::Running {
            return Ok(());
        }

        let span = info_span!("forwarder_stop", record_id = %record.id);
        let _guard = span.enter();

        if let Some(pid) = record.pid {
            signal_group(pid, GroupSignal::Terminate);
            let deadline = tokio::time::Instant::now() + self.config.forwarder.stop_grace();
            while liveness::alive(pid) && tokio::time::Instant::now() < deadline {
                tokio::time::sleep(EXIT_POLL_INTERVAL).await;
            }
            if liveness::alive(pid) {
                warn!(pid, "forwarder ignored TERM within grace period, killing group");
                signal_group(pid, GroupSignal::Kill);
            }
        }

        // The exit watcher may have flipped the record already; a failed
        // precondition here is not an error.
        let flipped = self
            .store
            .transition(
                &record.id,
                ProcessStatus::Running,
                ProcessStatus::Stopped,
                Some(Utc::now()),
            )
            .await?;
        if !flipped {
            // The exit watcher recorded the TERM we just sent as an
            // abnormal exit. A deliberate stop always lands on Stopped.
            self.store
                .transition(
                    &record.id,
                    ProcessStatus::Error,
                    ProcessStatus::Stopped,
                    Some(Utc::now()),
                )
                .await?;
        }
        info!("forwarder stopped");
        Ok(())
    }

    /// Stop every running forwarder for `owner_id`, then start a fresh one.
    ///
    /// A brief pause between stop and start lets the OS release ports
    /// and pipes claimed by the old process.
    ///
    /// # Errors
    ///
    /// Propagates errors from the final [`start`](Self::start) call.
    pub async fn restart(&self, target: &ForwarderTarget) -> Result<Option<ManagedProcess>> {
        self.stop_all_for(&target.owner_id).await?;
        tokio::time::sleep(self.config.forwarder.restart_delay()).await;
        self.start(target).await
    }

    /// Stop every running forwarder record for `owner_id`.
    ///
    /// Idempotent and order-independent; an individual stop failure is
    /// logged and does not prevent stopping the rest.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Store` when the running records cannot be listed.
    pub async fn stop_all_for(&self, owner_id: &str) -> Result<()> {
        for record in self.store.list_running_for(owner_id).await? {
            if let Err(err) = self.stop(&record).await {
                warn!(record_id = %record.id, %err, "failed to stop forwarder record");
            }
        }
        Ok(())
    }

    fn spawn_exit_watcher(&self, record: ManagedProcess, mut child: tokio::process::Child) {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            let next = match child.wait().await {
                Ok(status) if status.success() => {
                    info!(record_id = %record.id, "forwarder exited cleanly");
                    ProcessStatus::Stopped
                }
                Ok(status) => {
                    warn!(record_id = %record.id, ?status, "forwarder exited abnormally");
                    ProcessStatus::Error
                }
                Err(err) => {
                    warn!(record_id = %record.id, %err, "failed to wait on forwarder");
                    ProcessStatus::Error
                }
            };
            match store
                .transition(&record.id, ProcessStatus::Running, next, Some(Utc::now()))
                .await
            {
                Ok(true) => {}
                Ok(false) => {
                    debug!(record_id = %record.id, "record already transitioned before exit watcher");
                }
                Err(err) => {
                    warn!(record_id = %record.id, %err, "failed to record forwarder exit");
                }
            }
        });
    }
}

/// Relay one output pipe line-by-line into the tracing stream.
fn spawn_drain<R>(owner_id: String, stream: &'static str, reader: R)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(owner = %owner_id, stream, line = %line, "forwarder output");
        }
    });
}
