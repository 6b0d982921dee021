//! Capture port implemented by perception backends.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stride_core_types::PageRoute;

use crate::errors::SnapshotError;
use crate::model::Snapshot;
use crate::ramp::DEFAULT_LIMIT_BASE;

/// Knobs for one capture. `limit` bounds how many elements the backend
/// extracts and ranks; the runtime raises it through the ramp when
/// confidence comes back low.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SnapshotOptions {
    pub limit: u32,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT_BASE,
        }
    }
}

impl SnapshotOptions {
    pub fn with_limit(limit: u32) -> Self {
        Self { limit }
    }
}

/// Async snapshot producer. Implementations may fail outright or return a
/// degraded snapshot (`status: Error` or low diagnostics confidence); the
/// caller decides how to retry.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn capture(
        &self,
        route: &PageRoute,
        options: SnapshotOptions,
    ) -> Result<Snapshot, SnapshotError>;
}
