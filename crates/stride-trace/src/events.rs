//! Payload builders.
//!
//! Downstream consumers (timeline, upload, replay) key on these shapes, so
//! all runtime emissions go through here instead of ad-hoc `json!` blocks.

use serde_json::{json, Value};

use crate::model::{kind, TraceEvent, TraceScope};

/// One verification attempt or its terminal record. `is_final` distinguishes
/// the single summary event from intermediate polling attempts.
pub fn verification(
    scope: TraceScope,
    label: &str,
    attempt: u32,
    passed: bool,
    is_final: bool,
    reason: &str,
    details: Value,
) -> TraceEvent {
    TraceEvent::new(
        kind::VERIFICATION,
        scope,
        json!({
            "label": label,
            "attempt": attempt,
            "passed": passed,
            "final": is_final,
            "reason": reason,
            "details": details,
        }),
    )
}

pub fn snapshot(
    scope: TraceScope,
    limit: u32,
    status: &str,
    confidence: Option<f64>,
    element_count: usize,
) -> TraceEvent {
    TraceEvent::new(
        kind::SNAPSHOT,
        scope,
        json!({
            "limit": limit,
            "status": status,
            "confidence": confidence,
            "element_count": element_count,
        }),
    )
}

pub fn executor_selected(scope: TraceScope, executor: &str, reason: &str) -> TraceEvent {
    TraceEvent::new(
        kind::EXECUTOR,
        scope,
        json!({
            "executor": executor,
            "reason": reason,
        }),
    )
}

pub fn action(
    scope: TraceScope,
    action: Value,
    executor: &str,
    success: bool,
    error: Option<&str>,
) -> TraceEvent {
    TraceEvent::new(
        kind::ACTION,
        scope,
        json!({
            "action": action,
            "executor": executor,
            "success": success,
            "error": error,
        }),
    )
}

pub fn step_started(scope: TraceScope, goal: &str) -> TraceEvent {
    TraceEvent::new(
        kind::STEP,
        scope,
        json!({
            "phase": "started",
            "goal": goal,
        }),
    )
}

pub fn step_finished(
    scope: TraceScope,
    passed: bool,
    elapsed_ms: u64,
    assertion_count: usize,
) -> TraceEvent {
    TraceEvent::new(
        kind::STEP,
        scope,
        json!({
            "phase": "finished",
            "passed": passed,
            "elapsed_ms": elapsed_ms,
            "assertion_count": assertion_count,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_payload_carries_final_flag() {
        let event = verification(
            TraceScope::default(),
            "url_done",
            3,
            false,
            true,
            "url mismatch",
            json!({"reason_code": "snapshot_exhausted"}),
        );
        assert!(event.is_kind(kind::VERIFICATION));
        assert_eq!(event.payload["label"], "url_done");
        assert_eq!(event.payload["attempt"], 3);
        assert_eq!(event.payload["final"], true);
        assert_eq!(
            event.payload["details"]["reason_code"],
            "snapshot_exhausted"
        );
    }

    #[test]
    fn step_events_share_the_step_kind() {
        let started = step_started(TraceScope::default(), "open inbox");
        let finished = step_finished(TraceScope::default(), true, 120, 2);
        assert!(started.is_kind(kind::STEP));
        assert!(finished.is_kind(kind::STEP));
        assert_eq!(started.payload["phase"], "started");
        assert_eq!(finished.payload["phase"], "finished");
    }
}
