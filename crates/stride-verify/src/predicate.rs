//! The goal-condition contract.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::VerifyContext;

/// What one predicate evaluation concluded.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PredicateOutcome {
    pub passed: bool,
    pub reason: String,
    #[serde(default)]
    pub details: Value,
}

impl PredicateOutcome {
    pub fn pass(reason: impl Into<String>) -> Self {
        Self {
            passed: true,
            reason: reason.into(),
            details: Value::Null,
        }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            passed: false,
            reason: reason.into(),
            details: Value::Null,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }
}

/// A pure condition over one page state. Must be synchronous, side-effect
/// free, and safe to call many times with different contexts during a single
/// verification; the engine relies on all three.
pub trait Predicate: Send + Sync {
    fn evaluate(&self, ctx: &VerifyContext) -> PredicateOutcome;
}

impl<F> Predicate for F
where
    F: Fn(&VerifyContext) -> PredicateOutcome + Send + Sync,
{
    fn evaluate(&self, ctx: &VerifyContext) -> PredicateOutcome {
        (self)(ctx)
    }
}
