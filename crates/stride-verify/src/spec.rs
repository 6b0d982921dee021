//! Verification declarations.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::predicate::Predicate;

pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_POLL_MS: u64 = 250;
pub const DEFAULT_MAX_SNAPSHOT_ATTEMPTS: u32 = 3;

/// How a single predicate should be checked for a step. Immutable once the
/// step starts.
#[derive(Clone)]
pub struct Verification {
    pub label: String,
    pub predicate: Arc<dyn Predicate>,
    /// Failing a required verification fails the step; non-required outcomes
    /// are recorded but never fail it.
    pub required: bool,
    /// Poll with fresh snapshots until pass or budget exhaustion. When
    /// false, the predicate is evaluated once against the current state.
    pub eventually: bool,
    pub timeout_ms: u64,
    pub poll_ms: u64,
    pub max_snapshot_attempts: u32,
    /// Snapshots below this confidence are retried instead of being fed to
    /// the predicate.
    pub min_confidence: Option<f64>,
}

impl Verification {
    pub fn new(label: impl Into<String>, predicate: Arc<dyn Predicate>) -> Self {
        Self {
            label: label.into(),
            predicate,
            required: true,
            eventually: true,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_ms: DEFAULT_POLL_MS,
            max_snapshot_attempts: DEFAULT_MAX_SNAPSHOT_ATTEMPTS,
            min_confidence: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Single evaluation against the current state, no polling.
    pub fn immediate(mut self) -> Self {
        self.eventually = false;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_poll_ms(mut self, poll_ms: u64) -> Self {
        self.poll_ms = poll_ms;
        self
    }

    pub fn with_max_snapshot_attempts(mut self, attempts: u32) -> Self {
        self.max_snapshot_attempts = attempts;
        self
    }

    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = Some(min_confidence);
        self
    }
}

impl fmt::Debug for Verification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Verification")
            .field("label", &self.label)
            .field("required", &self.required)
            .field("eventually", &self.eventually)
            .field("timeout_ms", &self.timeout_ms)
            .field("poll_ms", &self.poll_ms)
            .field("max_snapshot_attempts", &self.max_snapshot_attempts)
            .field("min_confidence", &self.min_confidence)
            .finish_non_exhaustive()
    }
}

/// Polling budget for one `eventually()` invocation.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct EventuallyOptions {
    pub timeout_ms: u64,
    /// Minimum delay between attempts; 0 retries as fast as the snapshot
    /// source allows.
    pub poll_ms: u64,
    pub max_snapshot_attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_confidence: Option<f64>,
}

impl Default for EventuallyOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_ms: DEFAULT_POLL_MS,
            max_snapshot_attempts: DEFAULT_MAX_SNAPSHOT_ATTEMPTS,
            min_confidence: None,
        }
    }
}

impl From<&Verification> for EventuallyOptions {
    fn from(spec: &Verification) -> Self {
        Self {
            timeout_ms: spec.timeout_ms,
            poll_ms: spec.poll_ms,
            max_snapshot_attempts: spec.max_snapshot_attempts,
            min_confidence: spec.min_confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicates::always_pass;

    #[test]
    fn defaults_and_builders() {
        let spec = Verification::new("url_done", always_pass());
        assert!(spec.required);
        assert!(spec.eventually);
        assert_eq!(spec.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(spec.poll_ms, DEFAULT_POLL_MS);
        assert_eq!(spec.max_snapshot_attempts, DEFAULT_MAX_SNAPSHOT_ATTEMPTS);
        assert_eq!(spec.min_confidence, None);

        let spec = spec
            .optional()
            .immediate()
            .with_timeout_ms(500)
            .with_poll_ms(0)
            .with_max_snapshot_attempts(2)
            .with_min_confidence(0.5);
        assert!(!spec.required);
        assert!(!spec.eventually);

        let options = EventuallyOptions::from(&spec);
        assert_eq!(options.timeout_ms, 500);
        assert_eq!(options.poll_ms, 0);
        assert_eq!(options.max_snapshot_attempts, 2);
        assert_eq!(options.min_confidence, Some(0.5));
    }
}
