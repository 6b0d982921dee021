//! Executor selection.
//!
//! Structured execution is the default path. Vision is chosen up front
//! only by the canvas short-circuit: the page hosts a `<canvas>`, the
//! snapshot found too few actionable elements to be worth prompting
//! over, and a vision provider is actually available. Vision selection
//! as a fallback after failed verifications is decided by the runner,
//! not here.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use stride_core_types::PageRoute;

use crate::browser::BrowserAdapter;
use crate::config::StepSpec;

/// Which executor carries out the step attempt.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorKind {
    Structured,
    Vision,
}

impl ExecutorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Structured => "structured",
            Self::Vision => "vision",
        }
    }
}

impl fmt::Display for ExecutorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an executor was chosen.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SelectionReason {
    /// Structured is the default.
    Default,
    /// Canvas page with too few actionable elements.
    CanvasShortCircuit { actionable_count: usize },
    /// Retry after required verifications failed.
    VisionFallback,
}

impl fmt::Display for SelectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("default"),
            Self::CanvasShortCircuit { actionable_count } => {
                write!(f, "canvas_short_circuit(actionable={actionable_count})")
            }
            Self::VisionFallback => f.write_str("vision_fallback"),
        }
    }
}

/// An executor together with the reason it was picked.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ExecutorChoice {
    pub kind: ExecutorKind,
    pub reason: SelectionReason,
}

/// Result of probing the page for a canvas surface.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CanvasProbe {
    pub has_canvas: bool,
}

pub const CANVAS_PROBE_SCRIPT: &str = "document.getElementsByTagName('canvas').length > 0";

/// Ask the page whether it hosts a canvas. Probe failures count as
/// "no canvas" so a broken script path never forces vision.
pub async fn probe_canvas(browser: &dyn BrowserAdapter, route: &PageRoute) -> CanvasProbe {
    match browser.evaluate(route, CANVAS_PROBE_SCRIPT).await {
        Ok(value) => {
            let has_canvas = value.as_bool().unwrap_or_else(|| truthy(&value));
            debug!(has_canvas, "canvas probe");
            CanvasProbe { has_canvas }
        }
        Err(err) => {
            warn!(error = %err, "canvas probe failed, assuming no canvas");
            CanvasProbe { has_canvas: false }
        }
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty() && s != "false",
        _ => false,
    }
}

/// Pick the executor for a fresh attempt.
pub fn select_executor(
    actionable_count: usize,
    spec: &StepSpec,
    canvas: Option<CanvasProbe>,
    vision_available: bool,
) -> ExecutorChoice {
    let canvas_page = canvas.map(|probe| probe.has_canvas).unwrap_or(false);
    if spec.short_circuit_canvas
        && vision_available
        && canvas_page
        && actionable_count < spec.min_actionables as usize
    {
        return ExecutorChoice {
            kind: ExecutorKind::Vision,
            reason: SelectionReason::CanvasShortCircuit { actionable_count },
        };
    }
    ExecutorChoice {
        kind: ExecutorKind::Structured,
        reason: SelectionReason::Default,
    }
}
