use cdp_adapter::AdapterError;
use thiserror::Error;

use crate::model::InteractionStrategy;

/// Why a single strategy did not land.
#[derive(Clone, Debug, Error)]
pub enum ClickError {
    #[error("{strategy} interaction failed: {source}")]
    Strategy {
        strategy: InteractionStrategy,
        #[source]
        source: AdapterError,
    },
    #[error("{strategy} interaction did not finish within {timeout_ms}ms")]
    TimedOut {
        strategy: InteractionStrategy,
        timeout_ms: u64,
    },
    #[error("script interaction returned {0}")]
    ScriptRejected(serde_json::Value),
}
