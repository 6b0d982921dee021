//! Terminal step result.
//!
//! One [`StepReport`] per `run_step` call. The report is the caller's
//! view of everything that happened: the assertions that decided the
//! outcome, every action taken, and how the snapshot ramp and the
//! executors behaved along the way.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stride_core_types::StepId;
use stride_verify::Assertion;

use crate::action::StepAction;
use crate::selector::{ExecutorKind, SelectionReason};

/// Outcome of a single step.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StepReport {
    pub step_id: StepId,
    pub goal: String,
    /// True when every required assertion passed.
    pub passed: bool,
    /// Executor of the last attempt, if one ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executor: Option<ExecutorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<SelectionReason>,
    /// Vision selections within the step, short-circuit included.
    pub vision_attempts: u32,
    /// Total snapshot captures, ramp phase and verification polling alike.
    pub snapshot_captures: u32,
    /// Snapshot limits requested, in capture order.
    pub limits: Vec<u32>,
    pub actions: Vec<ActionRecord>,
    /// Terminal assertions of the last attempt, one per label.
    pub assertions: Vec<Assertion>,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl StepReport {
    /// Assertion with the given label, if the last attempt produced one.
    pub fn assertion(&self, label: &str) -> Option<&Assertion> {
        self.assertions.iter().find(|a| a.label == label)
    }
}

/// One executed (or attempted) action.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Parsed action, absent when the reply never parsed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<StepAction>,
    pub executor: ExecutorKind,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionRecord {
    pub fn performed(action: StepAction, executor: ExecutorKind) -> Self {
        Self {
            action: Some(action),
            executor,
            success: true,
            error: None,
        }
    }

    pub fn failed(executor: ExecutorKind, action: Option<StepAction>, error: impl Into<String>) -> Self {
        Self {
            action,
            executor,
            success: false,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn report_serializes_without_empty_optionals() {
        let report = StepReport {
            step_id: StepId::new(),
            goal: "open inbox".into(),
            passed: true,
            executor: None,
            selection: None,
            vision_attempts: 0,
            snapshot_captures: 2,
            limits: vec![60, 100],
            actions: Vec::new(),
            assertions: Vec::new(),
            started_at: Utc::now(),
            elapsed_ms: 12,
        };
        let value = serde_json::to_value(&report).unwrap();
        assert!(value.get("executor").is_none());
        assert_eq!(value["limits"], json!([60, 100]));
    }

    #[test]
    fn action_records_carry_failure_detail() {
        let record = ActionRecord::failed(
            ExecutorKind::Structured,
            Some(StepAction::ClickElement { id: 3 }),
            "element not found: 3",
        );
        assert!(!record.success);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["action"]["type"], "click_element");
        assert_eq!(value["error"], "element not found: 3");
    }
}
