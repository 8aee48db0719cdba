//! Steps shared by several flows.

use action_flow::{FlowError, FlowState, FlowStep, StepOutcome};
use action_gate::{login_heuristic, DocumentReady};
use action_locator::CandidateList;
use async_trait::async_trait;
use ticketpilot_core_types::{millis, redact};
use tool_click::ActionKind;
use tracing::{debug, info, warn};

use super::{selectors, FlowContext, StepList, TYPE_SETTLE};
use crate::config::FlowConfig;

/// Top page, then credentials.
pub fn login_steps(config: &FlowConfig) -> StepList {
    vec![
        Box::new(NavigateStep::new(config.target.top_url())),
        Box::new(AuthenticateStep::standalone()),
    ]
}

/// Loads `url` and waits for the document to finish loading.
pub struct NavigateStep {
    url: String,
}

impl NavigateStep {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl FlowStep<FlowContext> for NavigateStep {
    fn state(&self) -> FlowState {
        FlowState::NavigateToTarget
    }

    async fn run(&self, ctx: &FlowContext) -> Result<StepOutcome, FlowError> {
        info!(url = %redact::url(&self.url), "opening target page");
        let navigation = ctx.page.navigate(&self.url).await?;
        if let Some(status) = navigation.status.filter(|status| *status >= 400) {
            return Ok(StepOutcome::failure(format!(
                "{} answered HTTP {status}",
                redact::url(&navigation.url)
            )));
        }

        let ready = ctx
            .wait_within(&DocumentReady, ctx.config.timing.page_ready())
            .await?;
        if !ready.found {
            warn!(waited_ms = millis(ready.elapsed), "document not complete; continuing");
        }
        Ok(StepOutcome::success())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AuthMode {
    /// The purchase flow already sits on the login form.
    DuringPurchase,
    /// Starts from the top page; the post-login heuristic decides.
    Standalone,
}

pub struct AuthenticateStep {
    mode: AuthMode,
}

impl AuthenticateStep {
    pub fn during_purchase() -> Self {
        Self {
            mode: AuthMode::DuringPurchase,
        }
    }

    pub fn standalone() -> Self {
        Self {
            mode: AuthMode::Standalone,
        }
    }
}

#[async_trait]
impl FlowStep<FlowContext> for AuthenticateStep {
    fn state(&self) -> FlowState {
        FlowState::Authenticate
    }

    async fn run(&self, ctx: &FlowContext) -> Result<StepOutcome, FlowError> {
        if self.mode == AuthMode::Standalone {
            match ctx.find(&selectors::top_login_link()).await? {
                Some(link) => {
                    let report = ctx.click(link.as_ref(), ActionKind::Click).await;
                    if !report.is_success() {
                        warn!(summary = %report.failure_summary(), "login link did not respond");
                    }
                }
                None => {
                    let url = ctx.page.current_url().await?;
                    if !url.contains("login") {
                        info!("no login link on the page; assuming an existing session");
                        return Ok(StepOutcome::success().with_message("already logged in"));
                    }
                }
            }
        }

        let Some(email) = ctx.find(&selectors::email_input()).await? else {
            return Ok(StepOutcome::failure("e-mail input not found"));
        };
        let Some(password) = ctx.find(&selectors::password_input()).await? else {
            return Ok(StepOutcome::failure("password input not found"));
        };

        let credentials = &ctx.config.credentials;
        info!(user = %redact::email(&credentials.email), "filling credentials");
        email.fill(&credentials.email).await?;
        tokio::time::sleep(TYPE_SETTLE).await;
        password.fill(&credentials.password).await?;

        match ctx.find(&selectors::login_submit()).await? {
            Some(submit) => {
                let report = ctx.click_or_pause(submit.as_ref(), ActionKind::Submit).await;
                if !report.is_success() {
                    warn!(summary = %report.failure_summary(), "login submit failed; operator had a chance to finish");
                }
            }
            None if self.mode == AuthMode::Standalone => {
                return Ok(StepOutcome::failure("login submit not found"));
            }
            None => warn!("login submit not found; relying on the operator"),
        }

        let heuristic = login_heuristic();
        let result = ctx
            .wait_within(&heuristic, ctx.config.timing.page_ready())
            .await?;
        match (result.found, self.mode) {
            (true, _) => Ok(StepOutcome::success()),
            (false, AuthMode::DuringPurchase) => {
                warn!("login not confirmed by url; continuing");
                Ok(StepOutcome::success().with_message("login unconfirmed"))
            }
            (false, AuthMode::Standalone) => Ok(StepOutcome::failure("still on the login page")),
        }
    }
}

/// Clicks the first element of `candidates`, handing over to the operator
/// when it is missing or does not respond. Returns whether it was clicked.
pub async fn click_or_hand_over(
    ctx: &FlowContext,
    candidates: &CandidateList,
) -> Result<bool, FlowError> {
    match ctx.find(candidates).await? {
        Some(element) => {
            let report = ctx.click_or_pause(element.as_ref(), ActionKind::Click).await;
            Ok(report.is_success())
        }
        None => {
            let reason = format!("{} not found", candidates.label());
            ctx.operator_pause(&reason, ctx.config.timing.operator_pause())
                .await;
            Ok(false)
        }
    }
}

/// Sets the quantity control to one ticket: a select first, a text input
/// second. A missing control is left alone.
pub async fn set_single_quantity(ctx: &FlowContext) -> Result<(), FlowError> {
    let Some(control) = ctx.find(&selectors::quantity_control()).await? else {
        info!("no quantity control on the page");
        return Ok(());
    };
    if let Err(err) = control.select("1").await {
        debug!(%err, "quantity is not a select; typing it");
        control.fill("1").await?;
    }
    Ok(())
}
