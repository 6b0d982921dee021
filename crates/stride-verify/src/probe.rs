//! Port through which the engine observes live page state.

use async_trait::async_trait;
use stride_snapshot::SnapshotError;

use crate::context::VerifyContext;

/// Supplies page state to the assertion engine. Implementations own the
/// capture policy (limit ramping, routing) so the engine only decides when
/// to look, never how.
#[async_trait]
pub trait StateProbe: Send + Sync {
    /// Capture fresh state from the live page.
    async fn refresh(&self) -> Result<VerifyContext, SnapshotError>;

    /// Most recent state without touching the page, if any capture has
    /// happened yet.
    fn current(&self) -> Option<VerifyContext>;
}
