//! Unit tests for the cost aggregator.

use chrono::Utc;
use serde_json::json;

use swarm_watch::logwatch::cost::aggregate_costs;
use swarm_watch::models::event::LogEvent;

fn event(instance: &str, payload: serde_json::Value) -> LogEvent {
    LogEvent {
        timestamp: Utc::now(),
        instance: instance.to_owned(),
        event: payload,
    }
}

#[test]
fn sums_result_costs_per_instance() {
    let events = vec![
        event("main", json!({"type": "result", "total_cost_usd": 0.25})),
        event("worker", json!({"type": "result", "total_cost_usd": 0.5})),
        event("main", json!({"type": "result", "total_cost_usd": 0.75})),
    ];
    let report = aggregate_costs(&events);
    assert_eq!(report.per_instance["main"], 1.0);
    assert_eq!(report.per_instance["worker"], 0.5);
    assert_eq!(report.total, 1.5);
}

#[test]
fn non_result_events_ignored() {
    let events = vec![
        event("main", json!({"type": "assistant", "total_cost_usd": 9.0})),
        event("main", json!({"type": "result", "total_cost_usd": 0.1})),
    ];
    let report = aggregate_costs(&events);
    assert_eq!(report.per_instance["main"], 0.1);
    assert_eq!(report.total, 0.1);
}

#[test]
fn missing_or_malformed_cost_ignored() {
    let events = vec![
        event("main", json!({"type": "result"})),
        event("main", json!({"type": "result", "total_cost_usd": "oops"})),
        event("main", json!({"type": "result", "total_cost_usd": 0.2})),
    ];
    let report = aggregate_costs(&events);
    assert_eq!(report.per_instance["main"], 0.2);
}

#[test]
fn empty_input_yields_empty_report() {
    let report = aggregate_costs(&[]);
    assert!(report.per_instance.is_empty());
    assert_eq!(report.total, 0.0);
}

/// Pure function of its input: re-running yields identical totals.
#[test]
fn aggregation_is_idempotent() {
    let events = vec![
        event("a", json!({"type": "result", "total_cost_usd": 0.3})),
        event("b", json!({"type": "result", "total_cost_usd": 0.7})),
    ];
    let first = aggregate_costs(&events);
    let second = aggregate_costs(&events);
    assert_eq!(first, second);
}
