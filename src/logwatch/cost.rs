//! Per-instance running cost reduction over session log events.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::models::event::LogEvent;

/// Accumulated cost per instance plus the overall session total.
#[derive(Debug, Default, Clone, Serialize, PartialEq)]
pub struct CostReport {
    /// Instance name to accumulated cost. Monotonically non-decreasing
    /// within a session.
    pub per_instance: BTreeMap<String, f64>,
    /// Sum of all per-instance totals.
    pub total: f64,
}

/// Reduce a sequence of log events into per-instance cost totals.
///
/// Only terminal `"type": "result"` events carrying a numeric
/// `total_cost_usd` contribute; events without a cost field and
/// malformed numeric values are ignored. Pure function of its input:
/// re-running over the same events always yields the same totals.
#[must_use]
pub fn aggregate_costs(events: &[LogEvent]) -> CostReport {
    let mut report = CostReport::default();
    for event in events {
        let Some(cost) = result_cost(&event.event) else {
            continue;
        };
        *report
            .per_instance
            .entry(event.instance.clone())
            .or_insert(0.0) += cost;
        report.total += cost;
    }
    report
}

fn result_cost(payload: &Value) -> Option<f64> {
    if payload.get("type").and_then(Value::as_str) != Some("result") {
        return None;
    }
    payload.get("total_cost_usd").and_then(Value::as_f64)
}
