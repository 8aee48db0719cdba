//! Core types for flow orchestration

use std::fmt;

use serde::Serialize;
use ticketpilot_core_types::{RunId, SnapshotRef};

/// Position in the purchase flow.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    NavigateToTarget,
    AwaitAvailability,
    SelectOptions,
    Authenticate,
    ChoosePaymentDelivery,
    AdvanceToConfirmation,
    Done,
    Aborted,
}

impl FlowState {
    /// The working states in the only order they may run.
    pub const CANONICAL: [FlowState; 6] = [
        FlowState::NavigateToTarget,
        FlowState::AwaitAvailability,
        FlowState::SelectOptions,
        FlowState::Authenticate,
        FlowState::ChoosePaymentDelivery,
        FlowState::AdvanceToConfirmation,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(self, FlowState::Done | FlowState::Aborted)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FlowState::NavigateToTarget => "navigate_to_target",
            FlowState::AwaitAvailability => "await_availability",
            FlowState::SelectOptions => "select_options",
            FlowState::Authenticate => "authenticate",
            FlowState::ChoosePaymentDelivery => "choose_payment_delivery",
            FlowState::AdvanceToConfirmation => "advance_to_confirmation",
            FlowState::Done => "done",
            FlowState::Aborted => "aborted",
        }
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Success,
    Failure,
    Skipped,
}

impl StepStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            StepStatus::Success => "success",
            StepStatus::Failure => "failure",
            StepStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a step produced. Not modified once the orchestrator records it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub status: StepStatus,
    pub diagnostic: Option<SnapshotRef>,
    pub message: Option<String>,
}

impl StepOutcome {
    pub fn success() -> Self {
        Self {
            status: StepStatus::Success,
            diagnostic: None,
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: StepStatus::Failure,
            diagnostic: None,
            message: Some(message.into()),
        }
    }

    pub fn skipped(message: impl Into<String>) -> Self {
        Self {
            status: StepStatus::Skipped,
            diagnostic: None,
            message: Some(message.into()),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_diagnostic(mut self, snapshot: SnapshotRef) -> Self {
        self.diagnostic = Some(snapshot);
        self
    }

    pub fn is_failure(&self) -> bool {
        self.status == StepStatus::Failure
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct StepRecord {
    pub state: FlowState,
    pub outcome: StepOutcome,
    pub elapsed_ms: u64,
}

/// Result of one orchestrated run.
#[derive(Clone, Debug, Serialize)]
pub struct FlowReport {
    pub run_id: RunId,
    pub final_state: FlowState,
    pub steps: Vec<StepRecord>,
    pub elapsed_ms: u64,
    pub cancelled: bool,
}

impl FlowReport {
    pub fn is_done(&self) -> bool {
        self.final_state == FlowState::Done
    }

    /// The step that aborted the run, if any.
    pub fn failed_step(&self) -> Option<&StepRecord> {
        self.steps.iter().find(|record| record.outcome.is_failure())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_done_and_aborted_are_terminal() {
        assert!(FlowState::CANONICAL.iter().all(|state| !state.is_terminal()));
        assert!(FlowState::Done.is_terminal());
        assert!(FlowState::Aborted.is_terminal());
    }

    #[test]
    fn outcome_serializes_snake_case() {
        let outcome = StepOutcome::skipped("no radios");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["message"], "no radios");
    }
}
