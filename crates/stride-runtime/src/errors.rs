//! Runtime error taxonomy.
//!
//! Failures fall into two families:
//! - Recoverable: browser action failures and unparseable model replies.
//!   These fold into the step outcome as failed verifications and never
//!   abort the step.
//! - Fatal: provider transport failures (`ProviderError`) and internal
//!   invariant breaks. These propagate out of `run_step`.

use thiserror::Error;

/// Top-level error returned by the step runner.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("provider failure: {0}")]
    Provider(#[from] ProviderError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl RuntimeError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Transport-level failure talking to a language or vision model.
#[derive(Clone, Debug, Error)]
pub enum ProviderError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("provider request failed: {0}")]
    Request(String),

    #[error("provider timed out after {0}ms")]
    Timeout(u64),

    #[error("provider does not support: {0}")]
    Unsupported(String),
}

/// Failure executing a primitive against the live page.
#[derive(Clone, Debug, Error)]
pub enum BrowserError {
    #[error("element not found: {0}")]
    ElementNotFound(u64),

    #[error("script evaluation failed: {0}")]
    Script(String),

    #[error("input delivery failed: {0}")]
    Input(String),

    #[error("screenshot failed: {0}")]
    Screenshot(String),
}

/// The model reply did not contain a usable action.
#[derive(Clone, Debug, Error)]
pub enum ActionParseError {
    #[error("no action verb recognized in reply: {0:?}")]
    Unrecognized(String),

    #[error("malformed {verb} action: {detail}")]
    Malformed { verb: &'static str, detail: String },
}
