//! Sequential step runner

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use ticketpilot_core_types::{millis, RunId};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::errors::FlowError;
use crate::snapshot::SnapshotPort;
use crate::types::{FlowReport, FlowState, StepOutcome, StepRecord, StepStatus};

/// Handler for one working state.
///
/// `Err` is treated as a Failure outcome carrying the error text.
#[async_trait]
pub trait FlowStep<C>: Send + Sync
where
    C: Send + Sync,
{
    fn state(&self) -> FlowState;

    async fn run(&self, ctx: &C) -> Result<StepOutcome, FlowError>;
}

/// Runs steps in canonical order over a shared, read-only context.
///
/// A flow may leave states out (the login flow has no availability wait)
/// but never reorders or repeats them. `Done` follows the last step.
pub struct FlowOrchestrator<C>
where
    C: Send + Sync,
{
    run_id: RunId,
    ctx: Arc<C>,
    steps: Vec<Box<dyn FlowStep<C>>>,
    snapshots: Arc<dyn SnapshotPort>,
    cancel: CancellationToken,
}

impl<C> FlowOrchestrator<C>
where
    C: Send + Sync,
{
    pub fn new(
        run_id: RunId,
        ctx: Arc<C>,
        steps: Vec<Box<dyn FlowStep<C>>>,
        snapshots: Arc<dyn SnapshotPort>,
    ) -> Result<Self, FlowError> {
        validate_sequence(steps.iter().map(|step| step.state()))?;
        Ok(Self {
            run_id,
            ctx,
            steps,
            snapshots,
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn states(&self) -> Vec<FlowState> {
        self.steps.iter().map(|step| step.state()).collect()
    }

    pub fn context(&self) -> &Arc<C> {
        &self.ctx
    }

    #[instrument(skip_all, fields(run = %self.run_id.short()))]
    pub async fn run(&self) -> FlowReport {
        let started = Instant::now();
        let mut records = Vec::with_capacity(self.steps.len());
        let mut final_state = FlowState::Done;
        let mut cancelled = false;

        for (index, step) in self.steps.iter().enumerate() {
            let state = step.state();
            let step_started = Instant::now();

            let mut outcome = if self.cancel.is_cancelled() {
                cancelled = true;
                StepOutcome::failure("run cancelled")
            } else {
                info!(%state, "entering state");
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => {
                        cancelled = true;
                        StepOutcome::failure("run cancelled")
                    }
                    result = step.run(&self.ctx) => match result {
                        Ok(outcome) => outcome,
                        Err(err) => StepOutcome::failure(err.to_string()),
                    },
                }
            };

            match self.snapshots.capture(index + 1, state, outcome.status).await {
                Ok(snapshot) => {
                    if outcome.diagnostic.is_none() {
                        outcome.diagnostic = Some(snapshot);
                    }
                }
                Err(err) => warn!(%state, %err, "diagnostic snapshot failed"),
            }

            let elapsed_ms = millis(step_started.elapsed());
            match outcome.status {
                StepStatus::Success => info!(%state, elapsed_ms, "state succeeded"),
                StepStatus::Skipped => {
                    info!(%state, elapsed_ms, reason = ?outcome.message, "state skipped")
                }
                StepStatus::Failure => {
                    error!(%state, elapsed_ms, reason = ?outcome.message, "state failed")
                }
            }

            let failed = outcome.is_failure();
            records.push(StepRecord {
                state,
                outcome,
                elapsed_ms,
            });
            if failed {
                final_state = FlowState::Aborted;
                break;
            }
        }

        info!(final_state = %final_state, steps = records.len(), "flow finished");
        FlowReport {
            run_id: self.run_id.clone(),
            final_state,
            steps: records,
            elapsed_ms: millis(started.elapsed()),
            cancelled,
        }
    }
}

fn validate_sequence(states: impl Iterator<Item = FlowState>) -> Result<(), FlowError> {
    let mut previous: Option<FlowState> = None;
    let mut count = 0usize;
    for state in states {
        count += 1;
        if state.is_terminal() {
            return Err(FlowError::InvalidSequence(format!(
                "{state} is terminal and cannot have a handler"
            )));
        }
        if let Some(prev) = previous {
            if state <= prev {
                return Err(FlowError::InvalidSequence(format!(
                    "{state} cannot follow {prev}"
                )));
            }
        }
        previous = Some(state);
    }
    if count == 0 {
        return Err(FlowError::InvalidSequence("no steps".into()));
    }
    Ok(())
}
