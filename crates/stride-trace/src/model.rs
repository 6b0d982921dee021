//! Event envelope and scope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stride_core_types::{PageId, SessionId, StepId};
use uuid::Uuid;

/// Event kinds emitted by the step runtime.
pub mod kind {
    pub const STEP: &str = "step";
    pub const SNAPSHOT: &str = "snapshot";
    pub const EXECUTOR: &str = "executor";
    pub const ACTION: &str = "action";
    pub const VERIFICATION: &str = "verification";
}

/// Where an event happened.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct TraceScope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<PageId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<StepId>,
}

impl TraceScope {
    pub fn for_step(session: SessionId, page: PageId, step: StepId) -> Self {
        Self {
            session: Some(session),
            page: Some(page),
            step: Some(step),
        }
    }
}

/// Unified envelope for everything the runtime emits.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TraceEvent {
    pub event_id: String,
    /// Assigned by the accepting sink; 0 while in flight.
    #[serde(default)]
    pub seq: u64,
    pub ts: DateTime<Utc>,
    #[serde(default)]
    pub scope: TraceScope,
    pub kind: String,
    pub payload: serde_json::Value,
}

impl TraceEvent {
    pub fn new(kind: impl Into<String>, scope: TraceScope, payload: serde_json::Value) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            seq: 0,
            ts: Utc::now(),
            scope,
            kind: kind.into(),
            payload,
        }
    }

    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind == kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_event_has_no_seq_yet() {
        let event = TraceEvent::new(kind::STEP, TraceScope::default(), json!({"goal": "x"}));
        assert_eq!(event.seq, 0);
        assert!(event.is_kind(kind::STEP));
        assert!(!event.event_id.is_empty());
    }

    #[test]
    fn empty_scope_serializes_to_empty_object() {
        let value = serde_json::to_value(TraceScope::default()).unwrap();
        assert_eq!(value, json!({}));
    }
}
