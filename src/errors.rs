//! Errors raised before a flow starts.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    InvalidEnv { key: String, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("{0} is required for this command")]
    Missing(&'static str),
}
