//! Error types for gate construction

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum GateError {
    /// Poll interval of zero would spin
    #[error("poll interval must be greater than zero")]
    ZeroInterval,

    /// Interval longer than the whole budget
    #[error("poll interval {interval_ms}ms exceeds max wait {max_wait_ms}ms")]
    IntervalExceedsBudget { interval_ms: u64, max_wait_ms: u64 },

    /// URL pattern did not compile
    #[error("invalid URL pattern: {0}")]
    InvalidPattern(String),
}
