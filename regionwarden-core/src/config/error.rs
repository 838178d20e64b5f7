//! Configuration errors

use thiserror::Error;

/// Failure while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}
