//! Snapshot limit ramp.
//!
//! When a capture reports low extraction confidence the page is usually
//! under-analyzed (still rendering, virtualized lists, late hydration).
//! Retrying with a larger element budget trades extraction cost for
//! completeness. `next_limit` is the pure decision function; `LimitRamp`
//! carries the per-step state so requested limits never move backwards
//! within a step unless explicitly reset.

use serde::{Deserialize, Serialize};

pub const DEFAULT_LIMIT_BASE: u32 = 60;
pub const DEFAULT_LIMIT_STEP: u32 = 40;
pub const DEFAULT_LIMIT_MAX: u32 = 220;

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct RampConfig {
    pub base: u32,
    pub step: u32,
    pub max: u32,
    /// Confidence below this triggers a larger limit on the next capture.
    /// `None` disables ramping entirely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_confidence: Option<f64>,
}

impl Default for RampConfig {
    fn default() -> Self {
        Self {
            base: DEFAULT_LIMIT_BASE,
            step: DEFAULT_LIMIT_STEP,
            max: DEFAULT_LIMIT_MAX,
            min_confidence: None,
        }
    }
}

impl RampConfig {
    pub fn new(base: u32, step: u32, max: u32) -> Self {
        Self {
            base,
            step,
            max,
            min_confidence: None,
        }
    }

    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = Some(min_confidence);
        self
    }
}

/// Limit for the next capture. First capture gets `base`; afterwards the
/// limit grows by `step` (clamped at `max`) only while the previous capture
/// reported confidence below the threshold, and holds otherwise. A capture
/// with no reported confidence counts as below the threshold.
pub fn next_limit(
    previous: Option<u32>,
    previous_confidence: Option<f64>,
    config: &RampConfig,
) -> u32 {
    let Some(previous) = previous else {
        return config.base.min(config.max);
    };
    match config.min_confidence {
        Some(threshold) if previous_confidence.unwrap_or(0.0) < threshold => {
            previous.saturating_add(config.step).min(config.max)
        }
        _ => previous,
    }
}

/// Per-step ramp state. Single writer; the owning step drives `advance`,
/// `record`, and (rarely) `reset`.
#[derive(Clone, Debug)]
pub struct LimitRamp {
    config: RampConfig,
    current: Option<u32>,
    last_confidence: Option<f64>,
    history: Vec<u32>,
}

impl LimitRamp {
    pub fn new(config: RampConfig) -> Self {
        Self {
            config,
            current: None,
            last_confidence: None,
            history: Vec::new(),
        }
    }

    /// Limit to use for the next capture. Clears the recorded confidence, so
    /// a capture that never reports back counts as degraded.
    pub fn advance(&mut self) -> u32 {
        let next = next_limit(self.current, self.last_confidence, &self.config);
        self.current = Some(next);
        self.last_confidence = None;
        self.history.push(next);
        next
    }

    /// Record the confidence reported by the capture made at the current
    /// limit.
    pub fn record(&mut self, confidence: Option<f64>) {
        self.last_confidence = confidence;
    }

    pub fn reset(&mut self) {
        self.current = None;
        self.last_confidence = None;
        self.history.clear();
    }

    pub fn current(&self) -> Option<u32> {
        self.current
    }

    /// Limits requested so far, in order.
    pub fn history(&self) -> &[u32] {
        &self.history
    }
}
