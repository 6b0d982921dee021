//! Step configuration.
//!
//! A [`StepSpec`] declares one step of a task: the goal text handed to
//! the executor, the verifications that decide success, and the knobs
//! for snapshot ramping, canvas short-circuit and vision fallback. A
//! [`StepRequest`] binds a spec to a task and a page route.

use stride_core_types::PageRoute;
use stride_snapshot::{RampConfig, DEFAULT_LIMIT_BASE, DEFAULT_LIMIT_MAX, DEFAULT_LIMIT_STEP};
use stride_verify::spec::DEFAULT_MAX_SNAPSHOT_ATTEMPTS;
use stride_verify::Verification;

pub const DEFAULT_MAX_VISION_ATTEMPTS: u32 = 1;
pub const DEFAULT_MIN_ACTIONABLES: u32 = 3;

/// Declarative description of a single step.
#[derive(Clone, Debug)]
pub struct StepSpec {
    /// Goal text shown to the executor model.
    pub goal: String,
    /// Snapshot captures allowed during the ramp phase.
    pub max_snapshot_attempts: u32,
    /// Verifications run after the action, in declaration order.
    pub verifications: Vec<Verification>,
    /// Whether the vision executor may run at all.
    pub vision_enabled: bool,
    /// Vision selections allowed within the step, short-circuit included.
    pub max_vision_attempts: u32,
    /// Route canvas-heavy pages straight to vision.
    pub short_circuit_canvas: bool,
    /// Actionable-element count below which a canvas page is "sparse".
    pub min_actionables: u32,
    /// Snapshot confidence the ramp phase waits for, if any.
    pub min_confidence: Option<f64>,
    pub snapshot_limit_base: u32,
    pub snapshot_limit_step: u32,
    pub snapshot_limit_max: u32,
}

impl StepSpec {
    pub fn new(goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            max_snapshot_attempts: DEFAULT_MAX_SNAPSHOT_ATTEMPTS,
            verifications: Vec::new(),
            vision_enabled: false,
            max_vision_attempts: DEFAULT_MAX_VISION_ATTEMPTS,
            short_circuit_canvas: false,
            min_actionables: DEFAULT_MIN_ACTIONABLES,
            min_confidence: None,
            snapshot_limit_base: DEFAULT_LIMIT_BASE,
            snapshot_limit_step: DEFAULT_LIMIT_STEP,
            snapshot_limit_max: DEFAULT_LIMIT_MAX,
        }
    }

    /// Add a verification to run after the action.
    pub fn with_verification(mut self, verification: Verification) -> Self {
        self.verifications.push(verification);
        self
    }

    /// Allow the vision executor.
    pub fn with_vision(mut self) -> Self {
        self.vision_enabled = true;
        self
    }

    pub fn with_max_vision_attempts(mut self, attempts: u32) -> Self {
        self.max_vision_attempts = attempts;
        self
    }

    /// Enable the canvas short-circuit with the given sparseness bound.
    pub fn with_canvas_short_circuit(mut self, min_actionables: u32) -> Self {
        self.short_circuit_canvas = true;
        self.min_actionables = min_actionables;
        self
    }

    /// Require this snapshot confidence before executing.
    pub fn with_min_confidence(mut self, confidence: f64) -> Self {
        self.min_confidence = Some(confidence);
        self
    }

    pub fn with_max_snapshot_attempts(mut self, attempts: u32) -> Self {
        self.max_snapshot_attempts = attempts;
        self
    }

    pub fn with_snapshot_limits(mut self, base: u32, step: u32, max: u32) -> Self {
        self.snapshot_limit_base = base;
        self.snapshot_limit_step = step;
        self.snapshot_limit_max = max;
        self
    }

    /// Ramp configuration derived from the limit knobs.
    pub fn ramp_config(&self) -> RampConfig {
        RampConfig {
            base: self.snapshot_limit_base,
            step: self.snapshot_limit_step,
            max: self.snapshot_limit_max,
            min_confidence: self.min_confidence,
        }
    }
}

/// A step spec bound to the task and page it runs against.
#[derive(Clone, Debug)]
pub struct StepRequest {
    /// Overall task the step belongs to.
    pub task_goal: String,
    pub route: PageRoute,
    pub step: StepSpec,
}

impl StepRequest {
    pub fn new(task_goal: impl Into<String>, route: PageRoute, step: StepSpec) -> Self {
        Self {
            task_goal: task_goal.into(),
            route,
            step,
        }
    }
}
