//! Error type for verification setup.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("invalid predicate pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}
