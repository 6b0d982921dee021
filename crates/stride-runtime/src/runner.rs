//! The step runner.
//!
//! `run_step` drives one step through an explicit phase machine:
//!
//! ```text
//! Ramping -> Executing -> Verifying -> FallingBack -> Done
//!                ^                          |
//!                +-------- vision retry ----+
//! ```
//!
//! - Ramping captures snapshots under the limit ramp until one is usable
//!   or the budget runs out.
//! - Executing picks an executor, prompts it and performs the parsed
//!   action. An action that cannot be parsed or delivered becomes a
//!   failed required assertion instead of an error.
//! - Verifying runs every declared verification in order through the
//!   assertion engine.
//! - FallingBack retries the whole attempt with the vision executor when
//!   a required assertion failed and the vision budget allows it. The
//!   retry replaces the previous attempt's assertions wholesale.
//!
//! Only provider transport failures abort the step; everything else is
//! folded into the report.

use std::sync::Arc;
use std::time::Instant;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};

use stride_core_types::StepId;
use stride_snapshot::SnapshotSource;
use stride_trace::{events, TraceScope, TraceSink};
use stride_verify::{Assertion, AssertionEngine, AssertionSet, StateProbe, VerifyContext};

use crate::action::{parse_action, StepAction};
use crate::browser::BrowserAdapter;
use crate::config::{StepRequest, StepSpec};
use crate::errors::{BrowserError, RuntimeError};
use crate::probe::SnapshotProbe;
use crate::prompt;
use crate::provider::{GenerateOptions, LanguageProvider, VisionProvider};
use crate::report::{ActionRecord, StepReport};
use crate::selector::{
    probe_canvas, select_executor, CanvasProbe, ExecutorChoice, ExecutorKind, SelectionReason,
};

/// Label of the synthetic assertion recorded when the ramp phase never
/// produces a snapshot.
pub const SNAPSHOT_VERIFICATION_LABEL: &str = "snapshot_captured";
/// Label of the synthetic assertion recorded when the action itself fails.
pub const ACTION_VERIFICATION_LABEL: &str = "action_executed";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum StepPhase {
    Ramping,
    Executing,
    Verifying,
    FallingBack,
    Done,
}

enum ExecutionOutcome {
    Performed {
        action: StepAction,
    },
    /// The attempt broke before, during parse of, or while delivering the
    /// action. Recoverable; the step decides whether to fall back.
    Failed {
        action: Option<StepAction>,
        stage: &'static str,
        reason: String,
    },
}

/// Executes single steps against a page. One runner serves many steps;
/// all per-step state lives inside `run_step`.
pub struct StepRunner {
    source: Arc<dyn SnapshotSource>,
    browser: Arc<dyn BrowserAdapter>,
    structured: Arc<dyn LanguageProvider>,
    vision: Option<Arc<dyn VisionProvider>>,
    trace: Arc<dyn TraceSink>,
}

impl StepRunner {
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        browser: Arc<dyn BrowserAdapter>,
        structured: Arc<dyn LanguageProvider>,
        trace: Arc<dyn TraceSink>,
    ) -> Self {
        Self {
            source,
            browser,
            structured,
            vision: None,
            trace,
        }
    }

    /// Attach a vision provider. Vision still only runs for steps that
    /// enable it.
    pub fn with_vision(mut self, vision: Arc<dyn VisionProvider>) -> Self {
        self.vision = Some(vision);
        self
    }

    /// Run one step to completion and report the outcome.
    pub async fn run_step(&self, request: &StepRequest) -> Result<StepReport, RuntimeError> {
        let spec = &request.step;
        let step_id = StepId::new();
        let scope = TraceScope::for_step(
            request.route.session.clone(),
            request.route.page.clone(),
            step_id.clone(),
        );
        let started_at = Utc::now();
        let started = Instant::now();

        info!(step = %step_id.0, goal = %spec.goal, "step started");
        self.trace.emit(events::step_started(scope.clone(), &spec.goal));

        let probe = Arc::new(SnapshotProbe::new(
            self.source.clone(),
            request.route.clone(),
            spec.ramp_config(),
            self.trace.clone(),
            scope.clone(),
        ));
        let engine = AssertionEngine::new(probe.clone(), self.trace.clone(), scope.clone());
        let vision_available = spec.vision_enabled && self.vision.is_some();

        let mut phase = StepPhase::Ramping;
        let mut assertions = AssertionSet::new();
        let mut actions: Vec<ActionRecord> = Vec::new();
        let mut context: Option<VerifyContext> = None;
        let mut canvas: Option<CanvasProbe> = None;
        let mut executor: Option<ExecutorKind> = None;
        let mut selection: Option<SelectionReason> = None;
        let mut vision_attempts: u32 = 0;
        let mut forced_vision = false;

        loop {
            match phase {
                StepPhase::Ramping => {
                    context = self.ramp(probe.as_ref(), spec).await;
                    if context.is_none() {
                        warn!("ramp produced no snapshot");
                        assertions.record(Assertion::snapshot_exhausted(
                            SNAPSHOT_VERIFICATION_LABEL,
                            "no usable snapshot captured",
                        ));
                        phase = StepPhase::FallingBack;
                    } else {
                        phase = StepPhase::Executing;
                    }
                }
                StepPhase::Executing => {
                    if spec.short_circuit_canvas && canvas.is_none() {
                        canvas = Some(probe_canvas(self.browser.as_ref(), &request.route).await);
                    }
                    let choice = if forced_vision {
                        ExecutorChoice {
                            kind: ExecutorKind::Vision,
                            reason: SelectionReason::VisionFallback,
                        }
                    } else {
                        let actionable = context
                            .as_ref()
                            .map(|ctx| ctx.snapshot().actionable_count())
                            .unwrap_or(0);
                        select_executor(actionable, spec, canvas, vision_available)
                    };
                    if choice.kind == ExecutorKind::Vision {
                        vision_attempts += 1;
                    }
                    executor = Some(choice.kind);
                    selection = Some(choice.reason);
                    info!(executor = %choice.kind, reason = %choice.reason, "executor selected");
                    self.trace.emit(events::executor_selected(
                        scope.clone(),
                        choice.kind.as_str(),
                        &choice.reason.to_string(),
                    ));

                    match self.execute(request, choice.kind, context.as_ref()).await? {
                        ExecutionOutcome::Performed { action } => {
                            self.trace.emit(events::action(
                                scope.clone(),
                                action_value(&action),
                                choice.kind.as_str(),
                                true,
                                None,
                            ));
                            actions.push(ActionRecord::performed(action, choice.kind));
                            phase = StepPhase::Verifying;
                        }
                        ExecutionOutcome::Failed {
                            action,
                            stage,
                            reason,
                        } => {
                            warn!(stage, reason = %reason, "action attempt failed");
                            self.trace.emit(events::action(
                                scope.clone(),
                                action.as_ref().map(action_value).unwrap_or(Value::Null),
                                choice.kind.as_str(),
                                false,
                                Some(reason.as_str()),
                            ));
                            actions.push(ActionRecord::failed(
                                choice.kind,
                                action,
                                format!("{stage}: {reason}"),
                            ));
                            assertions.record(Assertion::fail(
                                ACTION_VERIFICATION_LABEL,
                                format!("{stage}: {reason}"),
                            ));
                            phase = StepPhase::FallingBack;
                        }
                    }
                }
                StepPhase::Verifying => {
                    for verification in &spec.verifications {
                        let assertion = engine.verify(verification).await;
                        assertions.record(assertion);
                    }
                    phase = StepPhase::FallingBack;
                }
                StepPhase::FallingBack => {
                    let retry = assertions.any_required_failed()
                        && vision_available
                        && vision_attempts < spec.max_vision_attempts;
                    if retry {
                        warn!(vision_attempts, "required verification failed, retrying with vision");
                        assertions.clear();
                        forced_vision = true;
                        phase = StepPhase::Executing;
                    } else {
                        phase = StepPhase::Done;
                    }
                }
                StepPhase::Done => break,
            }
        }

        let passed = assertions.all_required_passed();
        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!(passed, elapsed_ms, "step finished");
        self.trace.emit(events::step_finished(
            scope,
            passed,
            elapsed_ms,
            assertions.len(),
        ));

        Ok(StepReport {
            step_id,
            goal: spec.goal.clone(),
            passed,
            executor,
            selection,
            vision_attempts,
            snapshot_captures: probe.captures(),
            limits: probe.limits(),
            actions,
            assertions: assertions.into_records(),
            started_at,
            elapsed_ms,
        })
    }

    /// Capture under the ramp until a usable snapshot arrives or the
    /// budget runs out. A degraded snapshot still beats none: after the
    /// budget the last good capture is handed to the executor as-is.
    async fn ramp(&self, probe: &SnapshotProbe, spec: &StepSpec) -> Option<VerifyContext> {
        let budget = spec.max_snapshot_attempts.max(1);
        for attempt in 1..=budget {
            match probe.refresh().await {
                Ok(ctx) => {
                    let confident = spec
                        .min_confidence
                        .map(|threshold| ctx.confidence().unwrap_or(0.0) >= threshold)
                        .unwrap_or(true);
                    if !ctx.is_degraded() && confident {
                        return Some(ctx);
                    }
                    debug!(attempt, budget, "degraded snapshot during ramp");
                }
                Err(err) => {
                    warn!(attempt, budget, error = %err, "snapshot capture failed during ramp");
                }
            }
        }
        probe.current()
    }

    /// One executor attempt: prompt, parse, deliver. Provider transport
    /// failures propagate; everything else folds into the outcome.
    async fn execute(
        &self,
        request: &StepRequest,
        kind: ExecutorKind,
        context: Option<&VerifyContext>,
    ) -> Result<ExecutionOutcome, RuntimeError> {
        let options = GenerateOptions::default();
        let generation = match kind {
            ExecutorKind::Structured => {
                let user =
                    prompt::structured_prompt(&request.task_goal, &request.step.goal, context);
                self.structured
                    .generate(&prompt::structured_system_prompt(), &user, &options)
                    .await?
            }
            ExecutorKind::Vision => {
                let provider = self.vision.as_ref().ok_or_else(|| {
                    RuntimeError::internal("vision executor selected without a provider")
                })?;
                let image = match self.browser.screenshot(&request.route).await {
                    Ok(bytes) => STANDARD.encode(bytes),
                    Err(err) => {
                        return Ok(ExecutionOutcome::Failed {
                            action: None,
                            stage: "screenshot",
                            reason: err.to_string(),
                        })
                    }
                };
                let user = prompt::vision_prompt(&request.task_goal, &request.step.goal);
                provider
                    .generate_with_image(&prompt::vision_system_prompt(), &user, &image, &options)
                    .await?
            }
        };

        let action = match parse_action(&generation.content) {
            Ok(action) => action,
            Err(err) => {
                return Ok(ExecutionOutcome::Failed {
                    action: None,
                    stage: "parse",
                    reason: err.to_string(),
                })
            }
        };
        debug!(action = %action, model = %generation.model_name, "action parsed");

        if let Err(err) = self.perform(request, &action).await {
            return Ok(ExecutionOutcome::Failed {
                action: Some(action),
                stage: "perform",
                reason: err.to_string(),
            });
        }
        Ok(ExecutionOutcome::Performed { action })
    }

    async fn perform(&self, request: &StepRequest, action: &StepAction) -> Result<(), BrowserError> {
        let route = &request.route;
        match action {
            StepAction::ClickElement { id } => self.browser.click_element(route, *id).await,
            StepAction::ClickPoint { x, y } => self.browser.click(route, *x, *y).await,
            StepAction::TypeText { text } => self.browser.type_text(route, text).await,
            StepAction::PressKey { key } => self.browser.press_key(route, key).await,
            // The model judged the goal already met; verification decides.
            StepAction::Finish => Ok(()),
        }
    }
}

fn action_value(action: &StepAction) -> Value {
    serde_json::to_value(action).unwrap_or(Value::Null)
}
