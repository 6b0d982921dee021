//! Error type for snapshot capture.

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum SnapshotError {
    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("page is gone or detached")]
    PageGone,

    #[error("snapshot timed out after {0}ms")]
    Timeout(u64),

    #[error("internal snapshot error: {0}")]
    Internal(String),
}

impl SnapshotError {
    pub fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether a retry at a later attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Extraction(_) | Self::Timeout(_))
    }
}
