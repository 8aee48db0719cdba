//! Flow execution error types

use cdp_adapter::AdapterError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowError {
    /// Step list is empty, out of canonical order, or repeats a state
    #[error("invalid step sequence: {0}")]
    InvalidSequence(String),

    /// Browser-side failure, propagated as-is
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    /// A step gave up for its own reasons
    #[error("{0}")]
    Step(String),

    /// Snapshot could not be written
    #[error("snapshot failed: {0}")]
    Snapshot(String),
}

impl FlowError {
    pub fn step(message: impl Into<String>) -> Self {
        FlowError::Step(message.into())
    }
}
