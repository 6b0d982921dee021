//! The page state view handed to predicates.

use std::sync::Arc;

use stride_snapshot::{Element, Snapshot, SnapshotDiagnostics};

/// Read-only view over one snapshot. Predicates receive a reference and must
/// not assume anything about element ids beyond this snapshot.
#[derive(Clone, Debug)]
pub struct VerifyContext {
    snapshot: Arc<Snapshot>,
}

impl VerifyContext {
    pub fn new(snapshot: Arc<Snapshot>) -> Self {
        Self { snapshot }
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self::new(Arc::new(snapshot))
    }

    pub fn url(&self) -> &str {
        &self.snapshot.url
    }

    pub fn elements(&self) -> &[Element] {
        &self.snapshot.elements
    }

    pub fn diagnostics(&self) -> Option<&SnapshotDiagnostics> {
        self.snapshot.diagnostics.as_ref()
    }

    pub fn confidence(&self) -> Option<f64> {
        self.snapshot.confidence()
    }

    /// The capture ran but reported `status: error`.
    pub fn is_degraded(&self) -> bool {
        !self.snapshot.is_success()
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }
}
