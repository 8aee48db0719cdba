use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::model::InteractionStrategy;

/// Pause after a landed click while the page reacts; the site exposes no
/// readiness signal for its client-side transitions.
pub const AFTER_CLICK_SETTLE: Duration = Duration::from_millis(2000);

/// How long a human gets to act in the browser when automation gives up.
pub const OPERATOR_PAUSE: Duration = Duration::from_secs(30);

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClickPolicyView {
    pub strategies: Vec<InteractionStrategy>,
    pub strategy_timeout_ms: u64,
    pub after_click_ms: u64,
    pub operator_pause_ms: u64,
}

impl ClickPolicyView {
    pub fn strategy_timeout(&self) -> Duration {
        Duration::from_millis(self.strategy_timeout_ms)
    }

    pub fn after_click(&self) -> Duration {
        Duration::from_millis(self.after_click_ms)
    }

    pub fn operator_pause(&self) -> Duration {
        Duration::from_millis(self.operator_pause_ms)
    }
}

impl Default for ClickPolicyView {
    fn default() -> Self {
        Self {
            strategies: InteractionStrategy::CHAIN.to_vec(),
            strategy_timeout_ms: 3000,
            after_click_ms: AFTER_CLICK_SETTLE.as_millis() as u64,
            operator_pause_ms: OPERATOR_PAUSE.as_millis() as u64,
        }
    }
}
