//! The poll loop

use std::time::Duration;

use cdp_adapter::PageDriver;
use serde::Serialize;
use ticketpilot_core_types::millis;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, instrument};

use crate::conditions::GateCondition;
use crate::errors::GateError;

/// Default cadence of the "still waiting" log line.
pub const PROGRESS_EVERY: Duration = Duration::from_secs(60);

/// Budget for one wait.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollOptions {
    interval: Duration,
    max_wait: Duration,
    progress_every: Duration,
}

impl PollOptions {
    /// `max_wait` of zero is allowed and times out without evaluating.
    pub fn new(interval: Duration, max_wait: Duration) -> Result<Self, GateError> {
        if interval.is_zero() {
            return Err(GateError::ZeroInterval);
        }
        if !max_wait.is_zero() && interval > max_wait {
            return Err(GateError::IntervalExceedsBudget {
                interval_ms: millis(interval),
                max_wait_ms: millis(max_wait),
            });
        }
        Ok(Self {
            interval,
            max_wait,
            progress_every: PROGRESS_EVERY,
        })
    }

    pub fn with_progress_every(mut self, every: Duration) -> Self {
        self.progress_every = every;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    pub fn progress_every(&self) -> Duration {
        self.progress_every
    }
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct PollResult {
    pub found: bool,
    pub elapsed: Duration,
    /// Number of times the condition was evaluated
    pub attempts: u32,
}

impl PollResult {
    pub fn timed_out(&self) -> bool {
        !self.found
    }
}

/// Evaluates `condition` until it holds or `max_wait` has elapsed.
///
/// The boundary is inclusive: an evaluation that starts exactly at
/// `max_wait` still counts. Evaluation errors count as "not yet".
#[instrument(skip_all, fields(condition = %condition.describe(), max_wait_ms = millis(options.max_wait)))]
pub async fn await_condition(
    page: &dyn PageDriver,
    condition: &dyn GateCondition,
    options: &PollOptions,
) -> PollResult {
    let started = Instant::now();
    if options.max_wait.is_zero() {
        debug!("zero budget, not evaluating");
        return PollResult {
            found: false,
            elapsed: Duration::ZERO,
            attempts: 0,
        };
    }

    let mut attempts = 0u32;
    let mut next_progress = options.progress_every;
    loop {
        attempts += 1;
        let hit = match condition.evaluate(page).await {
            Ok(hit) => hit,
            Err(err) => {
                debug!(%err, attempts, "condition evaluation failed");
                false
            }
        };
        let elapsed = started.elapsed();

        if hit {
            info!(elapsed_s = elapsed.as_secs(), attempts, "condition met");
            return PollResult {
                found: true,
                elapsed,
                attempts,
            };
        }
        if elapsed >= options.max_wait {
            info!(elapsed_s = elapsed.as_secs(), attempts, "condition not met within budget");
            return PollResult {
                found: false,
                elapsed,
                attempts,
            };
        }
        if !options.progress_every.is_zero() && elapsed >= next_progress {
            info!(elapsed_s = elapsed.as_secs(), attempts, "still waiting");
            next_progress = elapsed + options.progress_every;
        }

        sleep(options.interval.min(options.max_wait - elapsed)).await;
    }
}
