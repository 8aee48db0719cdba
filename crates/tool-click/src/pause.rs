use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PauseOutcome {
    Elapsed,
    Cancelled,
}

/// Holds the flow for `duration` so a human can act in the browser window.
///
/// The pause never reports whether the human did anything; the caller
/// re-checks page state afterwards.
pub async fn operator_pause(
    reason: &str,
    duration: Duration,
    cancel: &CancellationToken,
) -> PauseOutcome {
    warn!(
        reason,
        seconds = duration.as_secs(),
        "automation stalled; please act manually in the browser"
    );
    tokio::select! {
        _ = cancel.cancelled() => {
            info!(reason, "operator pause cancelled");
            PauseOutcome::Cancelled
        }
        _ = tokio::time::sleep(duration) => {
            info!(reason, "operator pause over, resuming");
            PauseOutcome::Elapsed
        }
    }
}
