//! Snapshot probe.
//!
//! `SnapshotProbe` is the step's single window onto the page: it owns
//! the per-step [`LimitRamp`], drives the capture port and caches the
//! last good context for single-shot checks. The verification engine
//! sees it through the [`StateProbe`] port, so every capture made while
//! polling also feeds the ramp.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, warn};

use stride_core_types::PageRoute;
use stride_snapshot::{LimitRamp, RampConfig, SnapshotError, SnapshotOptions, SnapshotSource};
use stride_trace::{events, TraceScope, TraceSink};
use stride_verify::{StateProbe, VerifyContext};

pub struct SnapshotProbe {
    source: Arc<dyn SnapshotSource>,
    route: PageRoute,
    state: Mutex<ProbeState>,
    trace: Arc<dyn TraceSink>,
    scope: TraceScope,
}

struct ProbeState {
    ramp: LimitRamp,
    current: Option<VerifyContext>,
    captures: u32,
}

impl SnapshotProbe {
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        route: PageRoute,
        ramp: RampConfig,
        trace: Arc<dyn TraceSink>,
        scope: TraceScope,
    ) -> Self {
        Self {
            source,
            route,
            state: Mutex::new(ProbeState {
                ramp: LimitRamp::new(ramp),
                current: None,
                captures: 0,
            }),
            trace,
            scope,
        }
    }

    /// Limits requested so far, in capture order.
    pub fn limits(&self) -> Vec<u32> {
        self.state.lock().ramp.history().to_vec()
    }

    /// Total captures attempted, failed ones included.
    pub fn captures(&self) -> u32 {
        self.state.lock().captures
    }
}

#[async_trait]
impl StateProbe for SnapshotProbe {
    async fn refresh(&self) -> Result<VerifyContext, SnapshotError> {
        // The lock is released before the capture await.
        let limit = self.state.lock().ramp.advance();
        let options = SnapshotOptions::with_limit(limit);

        match self.source.capture(&self.route, options).await {
            Ok(snapshot) => {
                let confidence = snapshot.confidence();
                let status = if snapshot.is_success() { "success" } else { "error" };
                let element_count = snapshot.elements.len();
                self.trace.emit(events::snapshot(
                    self.scope.clone(),
                    limit,
                    status,
                    confidence,
                    element_count,
                ));
                debug!(limit, ?confidence, element_count, "snapshot captured");

                let context = VerifyContext::from_snapshot(snapshot);
                let mut state = self.state.lock();
                state.ramp.record(confidence);
                state.current = Some(context.clone());
                state.captures += 1;
                Ok(context)
            }
            Err(err) => {
                self.trace
                    .emit(events::snapshot(self.scope.clone(), limit, "unavailable", None, 0));
                warn!(limit, error = %err, "snapshot capture failed");
                // No confidence recorded, so a gated ramp grows next time.
                self.state.lock().captures += 1;
                Err(err)
            }
        }
    }

    fn current(&self) -> Option<VerifyContext> {
        self.state.lock().current.clone()
    }
}
