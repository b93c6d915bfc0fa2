//! Integration tests for forwarder supervision with real child processes.

#![cfg(unix)]

use std::sync::Arc;
use std::time::Duration;

use serial_test::serial;

use swarm_watch::liveness;
use swarm_watch::models::process::ProcessStatus;
use swarm_watch::persistence::{MemoryProcessStore, ProcessStore};
use swarm_watch::supervisor::{ForwarderSupervisor, ForwarderTarget};
use swarm_watch::{AppError, GlobalConfig};

fn config_with(command: &str, callback: &str) -> Arc<GlobalConfig> {
    let raw = format!(
        "[forwarder]\ncommand = \"{command}\"\nargs = [\"30\"]\ncallback_base_url = \"{callback}\"\nstop_grace_seconds = 1\nrestart_delay_ms = 10\n"
    );
    Arc::new(GlobalConfig::from_toml_str(&raw).expect("config"))
}

fn target(owner: &str) -> ForwarderTarget {
    ForwarderTarget {
        owner_id: owner.to_owned(),
        forwarding_enabled: true,
        enabled_subscriptions: 1,
    }
}

fn supervisor(config: &Arc<GlobalConfig>) -> (ForwarderSupervisor, Arc<dyn ProcessStore>) {
    let store: Arc<dyn ProcessStore> = Arc::new(MemoryProcessStore::new());
    (
        ForwarderSupervisor::new(Arc::clone(config), Arc::clone(&store)),
        store,
    )
}

async fn wait_for_status(
    store: &Arc<dyn ProcessStore>,
    id: &str,
    expected: ProcessStatus,
) -> bool {
    for _ in 0..50 {
        let record = store.get_by_id(id).await.expect("get record");
        if record.status == expected {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    false
}

#[tokio::test]
#[serial]
async fn start_spawns_and_persists_running_record() {
    let config = config_with("sleep", "http://localhost:9999");
    let (supervisor, store) = supervisor(&config);

    let started = supervisor
        .start(&target("proj-1"))
        .await
        .expect("start")
        .expect("record");
    assert_eq!(started.status, ProcessStatus::Running);
    let pid = started.pid.expect("pid recorded");
    assert!(liveness::alive(pid));

    let running = store.list_running_for("proj-1").await.expect("list");
    assert_eq!(running.len(), 1);

    supervisor.stop_all_for("proj-1").await.expect("cleanup");
}

/// Calling start twice results in exactly one spawn: at most one
/// running record per owner at any instant.
#[tokio::test]
#[serial]
async fn double_start_is_single_instance() {
    let config = config_with("sleep", "http://localhost:9999");
    let (supervisor, store) = supervisor(&config);

    let first = supervisor.start(&target("proj-1")).await.expect("start");
    assert!(first.is_some());
    let second = supervisor.start(&target("proj-1")).await.expect("restart");
    assert!(second.is_none(), "second start must be a no-op");

    assert_eq!(store.list_running_for("proj-1").await.expect("list").len(), 1);
    supervisor.stop_all_for("proj-1").await.expect("cleanup");
}

#[tokio::test]
#[serial]
async fn stop_terminates_process_and_marks_stopped() {
    let config = config_with("sleep", "http://localhost:9999");
    let (supervisor, store) = supervisor(&config);

    let started = supervisor
        .start(&target("proj-1"))
        .await
        .expect("start")
        .expect("record");
    let pid = started.pid.expect("pid");

    supervisor.stop(&started).await.expect("stop");

    let record = store.get_by_id(&started.id).await.expect("get");
    assert_eq!(record.status, ProcessStatus::Stopped);
    assert!(record.stopped_at.is_some());
    assert!(!liveness::alive(pid), "group should be terminated");
}

/// Stopping an already-stopped record never raises.
#[tokio::test]
async fn stop_is_idempotent() {
    let config = config_with("sleep", "http://localhost:9999");
    let (supervisor, store) = supervisor(&config);

    let mut record = swarm_watch::models::process::ManagedProcess::new("proj-1".into());
    record.status = ProcessStatus::Stopped;
    supervisor.stop(&record).await.expect("stop stopped record");
    assert!(store.list_by_owner("proj-1").await.expect("list").is_empty());
}

#[tokio::test]
async fn start_skips_when_forwarding_disabled() {
    let config = config_with("sleep", "http://localhost:9999");
    let (supervisor, store) = supervisor(&config);

    let mut disabled = target("proj-1");
    disabled.forwarding_enabled = false;
    assert!(supervisor.start(&disabled).await.expect("start").is_none());
    assert!(store.list_by_owner("proj-1").await.expect("list").is_empty());
}

#[tokio::test]
async fn start_skips_without_subscriptions() {
    let config = config_with("sleep", "http://localhost:9999");
    let (supervisor, _) = supervisor(&config);

    let mut unsubscribed = target("proj-1");
    unsubscribed.enabled_subscriptions = 0;
    assert!(supervisor.start(&unsubscribed).await.expect("start").is_none());
}

#[tokio::test]
async fn start_skips_without_callback_url() {
    let config = config_with("sleep", "");
    let (supervisor, _) = supervisor(&config);
    assert!(supervisor.start(&target("proj-1")).await.expect("start").is_none());
}

/// A refused spawn marks the record `Error` with a stop timestamp
/// before the error propagates.
#[tokio::test]
async fn spawn_failure_marks_record_error() {
    let config = config_with("/no/such/forwarder-binary", "http://localhost:9999");
    let (supervisor, store) = supervisor(&config);

    let result = supervisor.start(&target("proj-1")).await;
    assert!(matches!(result, Err(AppError::Spawn(_))));

    let records = store.list_by_owner("proj-1").await.expect("list");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, ProcessStatus::Error);
    assert!(records[0].stopped_at.is_some());
}

/// The exit watcher flips the record when the child exits on its own.
#[tokio::test]
#[serial]
async fn clean_exit_flips_record_to_stopped() {
    let raw = "[forwarder]\ncommand = \"true\"\ncallback_base_url = \"http://localhost:9999\"\nstop_grace_seconds = 1\n";
    let config = Arc::new(GlobalConfig::from_toml_str(raw).expect("config"));
    let (supervisor, store) = supervisor(&config);

    let started = supervisor
        .start(&target("proj-1"))
        .await
        .expect("start")
        .expect("record");
    assert!(
        wait_for_status(&store, &started.id, ProcessStatus::Stopped).await,
        "exit watcher should mark a clean exit as stopped"
    );
}

#[tokio::test]
#[serial]
async fn abnormal_exit_flips_record_to_error() {
    let raw = "[forwarder]\ncommand = \"false\"\ncallback_base_url = \"http://localhost:9999\"\nstop_grace_seconds = 1\n";
    let config = Arc::new(GlobalConfig::from_toml_str(raw).expect("config"));
    let (supervisor, store) = supervisor(&config);

    let started = supervisor
        .start(&target("proj-1"))
        .await
        .expect("start")
        .expect("record");
    assert!(
        wait_for_status(&store, &started.id, ProcessStatus::Error).await,
        "exit watcher should mark a non-zero exit as error"
    );
}

#[tokio::test]
#[serial]
async fn restart_replaces_the_running_record() {
    let config = config_with("sleep", "http://localhost:9999");
    let (supervisor, store) = supervisor(&config);

    let first = supervisor
        .start(&target("proj-1"))
        .await
        .expect("start")
        .expect("record");
    let second = supervisor
        .restart(&target("proj-1"))
        .await
        .expect("restart")
        .expect("new record");
    assert_ne!(first.id, second.id);

    let running = store.list_running_for("proj-1").await.expect("list");
    assert_eq!(running.len(), 1);
    assert_eq!(running[0].id, second.id);

    let old = store.get_by_id(&first.id).await.expect("old record");
    assert_eq!(old.status, ProcessStatus::Stopped);

    supervisor.stop_all_for("proj-1").await.expect("cleanup");
}
