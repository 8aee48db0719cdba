//! Error types for the locator

use cdp_adapter::AdapterError;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum LocatorError {
    /// The candidate list had nothing to try
    #[error("Candidate list '{0}' is empty")]
    EmptyCandidates(String),

    /// The browser connection failed while probing a candidate
    #[error("Transport failure while resolving '{list}': {source}")]
    Transport {
        list: String,
        #[source]
        source: AdapterError,
    },
}

impl LocatorError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            LocatorError::Transport { source, .. } => source.retriable,
            LocatorError::EmptyCandidates(_) => false,
        }
    }
}
