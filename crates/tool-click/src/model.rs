use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::errors::ClickError;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Click,
    /// Activates a submit control; the script strategy submits its form.
    Submit,
}

/// One way of delivering an interaction, in the default fallback order.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionStrategy {
    /// Regular pointer click after scrolling into view.
    Direct,
    /// `this.click()` (or a form submit) run inside the page.
    Script,
    /// Pointer click at the box centre, ignoring overlays.
    Forced,
}

impl InteractionStrategy {
    pub const CHAIN: [InteractionStrategy; 3] = [
        InteractionStrategy::Direct,
        InteractionStrategy::Script,
        InteractionStrategy::Forced,
    ];
}

impl fmt::Display for InteractionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InteractionStrategy::Direct => "direct",
            InteractionStrategy::Script => "script",
            InteractionStrategy::Forced => "forced",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug)]
pub struct StrategyAttempt {
    pub strategy: InteractionStrategy,
    pub error: ClickError,
}

#[derive(Clone, Debug)]
pub enum ActionOutcome {
    Success { strategy: InteractionStrategy },
    /// Every strategy raised; one entry per strategy, in the order tried.
    Failure { attempts: Vec<StrategyAttempt> },
}

/// Outcome of one `perform` call.
#[derive(Clone, Debug)]
pub struct ActionReport {
    pub action: ActionKind,
    pub outcome: ActionOutcome,
    /// Strategies that failed before the one that succeeded.
    pub fallbacks: Vec<StrategyAttempt>,
    pub started_at: Instant,
    pub finished_at: Instant,
    pub latency_ms: u128,
}

impl ActionReport {
    pub fn new(action: ActionKind, started_at: Instant) -> Self {
        Self {
            action,
            outcome: ActionOutcome::Failure {
                attempts: Vec::new(),
            },
            fallbacks: Vec::new(),
            started_at,
            finished_at: started_at,
            latency_ms: 0,
        }
    }

    pub fn finish(mut self, finished_at: Instant) -> Self {
        self.finished_at = finished_at;
        self.latency_ms = finished_at
            .saturating_duration_since(self.started_at)
            .as_millis();
        self
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ActionOutcome::Success { .. })
    }

    pub fn strategy(&self) -> Option<InteractionStrategy> {
        match self.outcome {
            ActionOutcome::Success { strategy } => Some(strategy),
            ActionOutcome::Failure { .. } => None,
        }
    }

    /// One line per failed strategy, for step messages.
    pub fn failure_summary(&self) -> String {
        let attempts = match &self.outcome {
            ActionOutcome::Failure { attempts } => attempts.as_slice(),
            ActionOutcome::Success { .. } => self.fallbacks.as_slice(),
        };
        attempts
            .iter()
            .map(|attempt| attempt.error.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}
