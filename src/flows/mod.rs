//! Site flows for e+ built from the locator, picker, executor, gate and
//! orchestrator crates.

pub mod first_come;
pub mod lottery;
pub mod quick_purchase;
pub mod runner;
pub mod selectors;
pub mod steps;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use action_flow::{FlowError, FlowStep};
use action_gate::{await_condition, GateCondition, PollOptions, PollResult};
use action_locator::{resolve, CandidateList, LocatorError, ResolveOptions, Scope};
use cdp_adapter::{ElementHandle, ElementRef, PageDriver};
use tokio_util::sync::CancellationToken;
use tool_click::{ActionKind, ActionReport, ClickPolicyView, PauseOutcome};
use tool_select_option::SelectPolicyView;

use crate::config::FlowConfig;

pub use runner::execute;

/// Between filling the e-mail and the password field.
pub const TYPE_SETTLE: Duration = Duration::from_millis(500);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FlowKind {
    FirstCome,
    Login,
    Lottery,
    Purchase,
}

impl FlowKind {
    pub fn needs_event_id(self) -> bool {
        matches!(self, FlowKind::FirstCome)
    }

    pub fn authenticates(self) -> bool {
        matches!(self, FlowKind::FirstCome | FlowKind::Login)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FlowKind::FirstCome => "first-come",
            FlowKind::Login => "login",
            FlowKind::Lottery => "lottery",
            FlowKind::Purchase => "purchase",
        }
    }
}

impl fmt::Display for FlowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Everything a step may touch. Shared read-only across the run.
pub struct FlowContext {
    pub config: Arc<FlowConfig>,
    pub page: Arc<dyn PageDriver>,
    pub cancel: CancellationToken,
}

impl FlowContext {
    pub fn new(config: Arc<FlowConfig>, page: Arc<dyn PageDriver>, cancel: CancellationToken) -> Self {
        Self {
            config,
            page,
            cancel,
        }
    }

    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions::new(self.config.timing.selector_timeout())
    }

    pub fn click_policy(&self) -> ClickPolicyView {
        ClickPolicyView {
            strategy_timeout_ms: self.config.timing.strategy_timeout_ms,
            operator_pause_ms: self.config.timing.operator_pause_ms,
            ..ClickPolicyView::default()
        }
    }

    pub fn select_policy(&self) -> SelectPolicyView {
        SelectPolicyView {
            skip_leading_placeholder: self.config.selection.skip_leading_placeholder,
            settle_ms: self.config.timing.settle_ms,
            ..SelectPolicyView::default()
        }
    }

    /// First element of `candidates` on the page; `None` is a normal answer.
    pub async fn find(&self, candidates: &CandidateList) -> Result<Option<ElementRef>, FlowError> {
        self.find_in(Scope::Page(self.page.as_ref()), candidates).await
    }

    pub async fn find_within(
        &self,
        container: &dyn ElementHandle,
        candidates: &CandidateList,
    ) -> Result<Option<ElementRef>, FlowError> {
        self.find_in(Scope::Within(container), candidates).await
    }

    async fn find_in(
        &self,
        scope: Scope<'_>,
        candidates: &CandidateList,
    ) -> Result<Option<ElementRef>, FlowError> {
        resolve(scope, candidates, &self.resolve_options())
            .await
            .map(|found| found.map(|resolved| resolved.element))
            .map_err(locator_error)
    }

    pub async fn click(&self, element: &dyn ElementHandle, action: ActionKind) -> ActionReport {
        tool_click::perform(element, action, &self.click_policy()).await
    }

    /// Click, with one operator pause if every strategy fails.
    pub async fn click_or_pause(&self, element: &dyn ElementHandle, action: ActionKind) -> ActionReport {
        tool_click::perform_or_pause(element, action, &self.click_policy(), &self.cancel)
            .await
            .0
    }

    pub async fn operator_pause(&self, reason: &str, duration: Duration) -> PauseOutcome {
        tool_click::operator_pause(reason, duration, &self.cancel).await
    }

    pub async fn wait_for(
        &self,
        condition: &dyn GateCondition,
        interval: Duration,
        max_wait: Duration,
    ) -> Result<PollResult, FlowError> {
        let options = PollOptions::new(interval, max_wait)
            .map_err(|err| FlowError::step(err.to_string()))?
            .with_progress_every(self.config.timing.progress_every());
        Ok(await_condition(self.page.as_ref(), condition, &options).await)
    }

    /// Polls at the configured interval, or faster when `budget` is shorter.
    pub async fn wait_within(
        &self,
        condition: &dyn GateCondition,
        budget: Duration,
    ) -> Result<PollResult, FlowError> {
        let interval = self.config.timing.poll_interval();
        let interval = if budget.is_zero() { interval } else { interval.min(budget) };
        self.wait_for(condition, interval, budget).await
    }
}

pub type StepList = Vec<Box<dyn FlowStep<FlowContext>>>;

/// Steps for `kind`, in canonical order.
pub fn build_steps(kind: FlowKind, config: &FlowConfig, url: Option<&str>) -> StepList {
    match kind {
        FlowKind::FirstCome => first_come::steps(config),
        FlowKind::Login => steps::login_steps(config),
        FlowKind::Lottery => lottery::steps(url.unwrap_or_default()),
        FlowKind::Purchase => quick_purchase::steps(url.unwrap_or_default()),
    }
}

fn locator_error(err: LocatorError) -> FlowError {
    match err {
        LocatorError::Transport { source, .. } => FlowError::Adapter(source),
        other => FlowError::step(other.to_string()),
    }
}
