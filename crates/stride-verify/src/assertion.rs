//! Terminal verification records.
//!
//! Many attempts may happen per verification, but exactly one assertion
//! lands in the step summary per label. Intermediate attempts exist only in
//! the trace stream; downstream consumers of step results depend on that
//! split.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Reason code set when snapshots never reached the confidence threshold
/// within the attempt budget: the world never became verifiable, as opposed
/// to the goal not being met.
pub const REASON_SNAPSHOT_EXHAUSTED: &str = "snapshot_exhausted";

/// The terminal outcome of one verification.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Assertion {
    pub label: String,
    pub passed: bool,
    /// Terminal marker, kept on the wire for downstream consumers; records
    /// in a step summary always carry `true`.
    #[serde(rename = "final")]
    pub is_final: bool,
    pub reason: String,
    #[serde(default)]
    pub details: Value,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

impl Assertion {
    pub fn pass(label: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            passed: true,
            is_final: true,
            reason: reason.into(),
            details: Value::Null,
            required: true,
        }
    }

    pub fn fail(label: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            passed: false,
            is_final: true,
            reason: reason.into(),
            details: Value::Null,
            required: true,
        }
    }

    /// Failure because snapshots stayed below the confidence threshold (or
    /// kept erroring) for the whole attempt budget.
    pub fn snapshot_exhausted(label: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::fail(label, reason).with_details(json!({ "reason_code": REASON_SNAPSHOT_EXHAUSTED }))
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn reason_code(&self) -> Option<&str> {
        self.details.get("reason_code").and_then(Value::as_str)
    }
}

/// Step-level assertion summary. Recording is idempotent per label: a later
/// record for the same label replaces the earlier one in place, and a
/// fallback attempt clears the whole set so the summary reflects only the
/// last attempt made.
#[derive(Clone, Debug, Default)]
pub struct AssertionSet {
    records: Vec<Assertion>,
}

impl AssertionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, assertion: Assertion) {
        match self.records.iter_mut().find(|a| a.label == assertion.label) {
            Some(existing) => *existing = assertion,
            None => self.records.push(assertion),
        }
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn get(&self, label: &str) -> Option<&Assertion> {
        self.records.iter().find(|a| a.label == label)
    }

    pub fn records(&self) -> &[Assertion] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Assertion> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn all_required_passed(&self) -> bool {
        self.records.iter().filter(|a| a.required).all(|a| a.passed)
    }

    pub fn any_required_failed(&self) -> bool {
        self.records.iter().any(|a| a.required && !a.passed)
    }
}
