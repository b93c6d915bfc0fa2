//! Unit tests for domain models.

use swarm_watch::models::process::{ManagedProcess, ProcessStatus};

#[test]
fn new_record_starts_running_without_pid() {
    let record = ManagedProcess::new("proj-1".into());
    assert_eq!(record.owner_id, "proj-1");
    assert_eq!(record.status, ProcessStatus::Running);
    assert_eq!(record.pid, None);
    assert_eq!(record.stopped_at, None);
    assert!(!record.id.is_empty());
}

#[test]
fn running_can_stop_or_error() {
    assert!(ProcessStatus::Running.can_transition_to(ProcessStatus::Stopped));
    assert!(ProcessStatus::Running.can_transition_to(ProcessStatus::Error));
}

#[test]
fn error_cleans_up_to_stopped_only() {
    assert!(ProcessStatus::Error.can_transition_to(ProcessStatus::Stopped));
    assert!(!ProcessStatus::Error.can_transition_to(ProcessStatus::Running));
}

#[test]
fn stopped_is_terminal_for_records() {
    assert!(!ProcessStatus::Stopped.can_transition_to(ProcessStatus::Running));
    assert!(!ProcessStatus::Stopped.can_transition_to(ProcessStatus::Error));
}

#[test]
fn status_string_round_trip() {
    for status in [
        ProcessStatus::Stopped,
        ProcessStatus::Running,
        ProcessStatus::Error,
    ] {
        let parsed = ProcessStatus::parse(status.as_str()).expect("round trip");
        assert_eq!(parsed, status);
    }
}

#[test]
fn unknown_status_string_rejected() {
    assert!(ProcessStatus::parse("zombie").is_err());
}

#[test]
fn record_delegates_transition_check() {
    let record = ManagedProcess::new("proj-1".into());
    assert!(record.can_transition_to(ProcessStatus::Stopped));
    assert!(record.can_transition_to(ProcessStatus::Error));
}
