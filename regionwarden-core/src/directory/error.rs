//! Directory and store errors

use thiserror::Error;

/// Failure reported by a capability implementation
#[derive(Debug, Clone, Error)]
pub enum DirectoryError {
    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("not found")]
    NotFound,

    #[error("storage failure: {0}")]
    Storage(String),
}
