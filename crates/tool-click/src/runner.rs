use std::time::Instant;

use cdp_adapter::{ClickMode, ElementHandle};
use serde_json::Value;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::errors::ClickError;
use crate::model::{ActionKind, ActionOutcome, ActionReport, InteractionStrategy, StrategyAttempt};
use crate::pause::{operator_pause, PauseOutcome};
use crate::policy::ClickPolicyView;

const CLICK_FN: &str = "function() { this.click(); return true; }";

const SUBMIT_FN: &str = r#"function() {
    const submits = this.type === 'submit' || this.type === 'image';
    if (submits && this.form && typeof this.form.requestSubmit === 'function') {
        this.form.requestSubmit(this);
        return true;
    }
    this.click();
    return true;
}"#;

/// Tries each strategy of `policy` in order and stops at the first one that
/// does not raise. Failure is an outcome, not an error: the report carries
/// every strategy's error.
#[instrument(skip_all, fields(element = %element.key(), action = ?action))]
pub async fn perform(
    element: &dyn ElementHandle,
    action: ActionKind,
    policy: &ClickPolicyView,
) -> ActionReport {
    let mut report = ActionReport::new(action, Instant::now());
    let mut failures = Vec::new();

    for &strategy in &policy.strategies {
        match attempt(element, action, strategy, policy).await {
            Ok(()) => {
                info!(%strategy, fallbacks = failures.len(), "interaction landed");
                report.outcome = ActionOutcome::Success { strategy };
                report.fallbacks = failures;
                if policy.after_click_ms > 0 {
                    tokio::time::sleep(policy.after_click()).await;
                }
                return report.finish(Instant::now());
            }
            Err(error) => {
                warn!(%strategy, %error, "interaction strategy failed");
                failures.push(StrategyAttempt { strategy, error });
            }
        }
    }

    warn!(attempts = failures.len(), "every interaction strategy failed");
    report.outcome = ActionOutcome::Failure { attempts: failures };
    report.finish(Instant::now())
}

/// [`perform`], followed by one bounded operator pause when it fails.
///
/// The report still says Failure after the pause; whether the human
/// finished the job is for the caller to check.
pub async fn perform_or_pause(
    element: &dyn ElementHandle,
    action: ActionKind,
    policy: &ClickPolicyView,
    cancel: &CancellationToken,
) -> (ActionReport, Option<PauseOutcome>) {
    let report = perform(element, action, policy).await;
    if report.is_success() || policy.operator_pause_ms == 0 {
        return (report, None);
    }
    let pause = operator_pause(
        &format!("{action:?} on {}", element.key()),
        policy.operator_pause(),
        cancel,
    )
    .await;
    (report, Some(pause))
}

async fn attempt(
    element: &dyn ElementHandle,
    action: ActionKind,
    strategy: InteractionStrategy,
    policy: &ClickPolicyView,
) -> Result<(), ClickError> {
    let delivery = async {
        match strategy {
            InteractionStrategy::Direct => element
                .click(ClickMode::Normal)
                .await
                .map(|_| Value::Null),
            InteractionStrategy::Script => {
                let function = match action {
                    ActionKind::Click => CLICK_FN,
                    ActionKind::Submit => SUBMIT_FN,
                };
                element.call_js(function).await
            }
            InteractionStrategy::Forced => element
                .click(ClickMode::Forced)
                .await
                .map(|_| Value::Null),
        }
    };

    match timeout(policy.strategy_timeout(), delivery).await {
        Ok(Ok(Value::Bool(false))) => Err(ClickError::ScriptRejected(Value::Bool(false))),
        Ok(Ok(_)) => Ok(()),
        Ok(Err(source)) => Err(ClickError::Strategy { strategy, source }),
        Err(_) => Err(ClickError::TimedOut {
            strategy,
            timeout_ms: policy.strategy_timeout_ms,
        }),
    }
}
