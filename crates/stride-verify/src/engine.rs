//! The assertion engine.
//!
//! `check(predicate, label).eventually(options)` repeatedly captures fresh
//! page state through the step's probe and evaluates the predicate against
//! it until one of three exits is reached: the predicate passes, the
//! wall-clock timeout elapses, or the snapshot attempt budget runs out
//! before the page ever reaches the confidence threshold. Low-confidence
//! captures are never fed to the predicate and never count as predicate
//! failures.
//!
//! Every attempt emits one `verification` trace event (`final: false`);
//! termination emits exactly one more with `final: true`. Only the terminal
//! assertion reaches the step summary.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{json, Value};
use tokio::time::sleep;
use tracing::{debug, warn};

use stride_trace::{events, TraceScope, TraceSink};

use crate::assertion::Assertion;
use crate::context::VerifyContext;
use crate::predicate::{Predicate, PredicateOutcome};
use crate::probe::StateProbe;
use crate::spec::{EventuallyOptions, Verification};

/// Drives predicate polling for one step. Holds the step's probe (which owns
/// limit ramping) and trace scope; one engine serves all of the step's
/// verifications sequentially.
pub struct AssertionEngine {
    probe: Arc<dyn StateProbe>,
    trace: Arc<dyn TraceSink>,
    scope: TraceScope,
}

impl AssertionEngine {
    pub fn new(probe: Arc<dyn StateProbe>, trace: Arc<dyn TraceSink>, scope: TraceScope) -> Self {
        Self {
            probe,
            trace,
            scope,
        }
    }

    /// Start a check for one predicate. Defaults to `required`.
    pub fn check(
        &self,
        predicate: Arc<dyn Predicate>,
        label: impl Into<String>,
    ) -> AssertionCheck<'_> {
        AssertionCheck {
            engine: self,
            predicate,
            label: label.into(),
            required: true,
        }
    }

    /// Run one verification spec through the appropriate path.
    pub async fn verify(&self, spec: &Verification) -> Assertion {
        let check = self
            .check(spec.predicate.clone(), spec.label.clone())
            .required(spec.required);
        if spec.eventually {
            check.eventually(&EventuallyOptions::from(spec)).await
        } else {
            check.now().await
        }
    }
}

/// A pending check, ready to run eventually (polling) or immediately.
pub struct AssertionCheck<'a> {
    engine: &'a AssertionEngine,
    predicate: Arc<dyn Predicate>,
    label: String,
    required: bool,
}

enum AttemptOutcome {
    /// Snapshot unusable: capture error, error status, or confidence below
    /// the gate. Not a predicate failure.
    Degraded { reason: String, details: Value },
    Evaluated(PredicateOutcome),
}

impl AssertionCheck<'_> {
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Poll until pass, timeout, or snapshot budget exhaustion.
    pub async fn eventually(self, options: &EventuallyOptions) -> Assertion {
        let deadline = Instant::now() + Duration::from_millis(options.timeout_ms);
        let mut attempt: u32 = 0;
        let mut degraded: u32 = 0;
        // Every non-passing attempt writes these before any terminal read.
        let mut last_reason: String;
        let mut last_details: Value;

        loop {
            attempt += 1;

            let outcome = match self.engine.probe.refresh().await {
                Ok(ctx) => match degraded_state(&ctx, options.min_confidence) {
                    Some((reason, details)) => AttemptOutcome::Degraded { reason, details },
                    None => AttemptOutcome::Evaluated(self.predicate.evaluate(&ctx)),
                },
                Err(err) => AttemptOutcome::Degraded {
                    reason: format!("snapshot unavailable: {err}"),
                    details: json!({ "snapshot_error": err.to_string() }),
                },
            };

            match outcome {
                AttemptOutcome::Evaluated(result) if result.passed => {
                    debug!(label = %self.label, attempt, "verification passed");
                    self.emit_attempt(attempt, true, &result.reason, result.details.clone());
                    return self.finish(
                        attempt,
                        Assertion::pass(&self.label, &result.reason)
                            .with_details(result.details)
                            .with_required(self.required),
                    );
                }
                AttemptOutcome::Evaluated(result) => {
                    last_reason = result.reason;
                    last_details = result.details;
                    self.emit_attempt(attempt, false, &last_reason, last_details.clone());
                }
                AttemptOutcome::Degraded { reason, details } => {
                    degraded += 1;
                    last_reason = reason;
                    last_details = details;
                    self.emit_attempt(attempt, false, &last_reason, last_details.clone());
                    debug!(
                        label = %self.label,
                        attempt,
                        degraded,
                        budget = options.max_snapshot_attempts,
                        "degraded snapshot attempt"
                    );
                    if degraded >= options.max_snapshot_attempts {
                        warn!(
                            label = %self.label,
                            attempts = degraded,
                            "snapshot attempt budget exhausted"
                        );
                        return self.finish(
                            attempt,
                            Assertion::snapshot_exhausted(&self.label, &last_reason)
                                .with_required(self.required),
                        );
                    }
                }
            }

            if Instant::now() >= deadline {
                return self.finish(
                    attempt,
                    Assertion::fail(&self.label, &last_reason)
                        .with_details(last_details)
                        .with_required(self.required),
                );
            }
            if options.poll_ms > 0 {
                sleep(Duration::from_millis(options.poll_ms)).await;
            }
        }
    }

    /// Evaluate once against the current state (capturing only if no state
    /// exists yet) and record the terminal assertion.
    pub async fn now(self) -> Assertion {
        let state = match self.engine.probe.current() {
            Some(ctx) => Ok(ctx),
            None => self.engine.probe.refresh().await,
        };
        let assertion = match state {
            Ok(ctx) => match degraded_state(&ctx, None) {
                Some((reason, details)) => {
                    Assertion::fail(&self.label, reason).with_details(details)
                }
                None => {
                    let outcome = self.predicate.evaluate(&ctx);
                    if outcome.passed {
                        Assertion::pass(&self.label, &outcome.reason).with_details(outcome.details)
                    } else {
                        Assertion::fail(&self.label, &outcome.reason).with_details(outcome.details)
                    }
                }
            },
            Err(err) => Assertion::fail(&self.label, format!("snapshot unavailable: {err}")),
        }
        .with_required(self.required);

        self.emit_attempt(1, assertion.passed, &assertion.reason, assertion.details.clone());
        self.finish(1, assertion)
    }

    fn emit_attempt(&self, attempt: u32, passed: bool, reason: &str, details: Value) {
        self.engine.trace.emit(events::verification(
            self.engine.scope.clone(),
            &self.label,
            attempt,
            passed,
            false,
            reason,
            details,
        ));
    }

    fn finish(&self, attempt: u32, assertion: Assertion) -> Assertion {
        self.engine.trace.emit(events::verification(
            self.engine.scope.clone(),
            &self.label,
            attempt,
            assertion.passed,
            true,
            &assertion.reason,
            assertion.details.clone(),
        ));
        assertion
    }
}

/// Why a context cannot be handed to the predicate, if it cannot.
fn degraded_state(ctx: &VerifyContext, min_confidence: Option<f64>) -> Option<(String, Value)> {
    if ctx.is_degraded() {
        let reasons = ctx
            .diagnostics()
            .map(|d| d.reasons.join("; "))
            .unwrap_or_default();
        return Some((
            format!("snapshot reported error status: {reasons}"),
            json!({ "snapshot_status": "error", "reasons": reasons }),
        ));
    }
    let threshold = min_confidence?;
    let confidence = ctx.confidence().unwrap_or(0.0);
    if confidence < threshold {
        return Some((
            format!("snapshot confidence {confidence:.2} below threshold {threshold:.2}"),
            json!({
                "low_confidence": true,
                "confidence": confidence,
                "threshold": threshold,
            }),
        ));
    }
    None
}
