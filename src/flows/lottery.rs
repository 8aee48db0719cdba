//! Lottery entry: open the entry form, ask for one ticket and stop on the
//! confirmation page for the operator.

use action_flow::{FlowError, FlowState, FlowStep, StepOutcome};
use async_trait::async_trait;
use tool_click::PauseOutcome;
use tracing::{info, warn};

use super::steps::{click_or_hand_over, set_single_quantity, NavigateStep};
use super::{selectors, FlowContext, StepList};

pub fn steps(url: &str) -> StepList {
    vec![
        Box::new(NavigateStep::new(url)),
        Box::new(EntryStep),
        Box::new(ConfirmStep),
    ]
}

pub struct EntryStep;

#[async_trait]
impl FlowStep<FlowContext> for EntryStep {
    fn state(&self) -> FlowState {
        FlowState::SelectOptions
    }

    async fn run(&self, ctx: &FlowContext) -> Result<StepOutcome, FlowError> {
        let clicked = click_or_hand_over(ctx, &selectors::lottery_entry()).await?;
        if !clicked {
            warn!("entry form opened by hand, if at all");
        }
        set_single_quantity(ctx).await?;
        let outcome = StepOutcome::success();
        Ok(if clicked {
            outcome
        } else {
            outcome.with_message("entry button handled by the operator")
        })
    }
}

/// Finds the review button and leaves it, and the entry itself, to a human.
/// The candidates include plain submit controls, so nothing here clicks.
pub struct ConfirmStep;

#[async_trait]
impl FlowStep<FlowContext> for ConfirmStep {
    fn state(&self) -> FlowState {
        FlowState::AdvanceToConfirmation
    }

    async fn run(&self, ctx: &FlowContext) -> Result<StepOutcome, FlowError> {
        if ctx.find(&selectors::lottery_confirm()).await?.is_none() {
            return Ok(StepOutcome::failure("confirm button not found"));
        }
        info!("confirm button found; review and submit the entry by hand");
        let pause = ctx
            .operator_pause("review lottery entry", ctx.config.timing.operator_pause())
            .await;
        Ok(match pause {
            PauseOutcome::Elapsed => StepOutcome::success(),
            PauseOutcome::Cancelled => StepOutcome::success().with_message("review cut short"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use action_flow::StepStatus;
    use cdp_adapter::scripted::{Interaction, ScriptedElement, ScriptedPage};
    use ticketpilot_core_types::AnchorDescriptor;
    use tokio_util::sync::CancellationToken;

    use crate::config::FlowConfig;

    fn context(page: &ScriptedPage) -> FlowContext {
        let mut config = FlowConfig::default();
        config.timing.operator_pause_ms = 5_000;
        FlowContext::new(Arc::new(config), Arc::new(page.clone()), CancellationToken::new())
    }

    #[tokio::test(start_paused = true)]
    async fn entry_clicks_apply_and_selects_one_ticket() {
        let page = ScriptedPage::new();
        let apply = page.add(ScriptedElement::new("button").text("応募する"));
        let quantity = page.add(ScriptedElement::select_with_options(&[("1", "1"), ("2", "2")]).attr(
            "name",
            "quantity",
        ));
        let ctx = context(&page);

        let outcome = EntryStep.run(&ctx).await.unwrap();

        assert_eq!(outcome.status, StepStatus::Success);
        assert!(page.was_clicked(&apply));
        assert_eq!(quantity.value().as_deref(), Some("1"));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_entry_button_waits_for_operator() {
        let page = ScriptedPage::new();
        let input = page.add(ScriptedElement::new("input").attr("name", "quantity"));
        let ctx = context(&page);

        let started = tokio::time::Instant::now();
        let outcome = EntryStep.run(&ctx).await.unwrap();

        assert_eq!(outcome.status, StepStatus::Success);
        assert_eq!(outcome.message.as_deref(), Some("entry button handled by the operator"));
        assert!(started.elapsed() >= Duration::from_secs(5));
        assert!(page
            .interactions()
            .contains(&Interaction::Fill { key: input.key().to_string(), text: "1".into() }));
    }

    #[tokio::test(start_paused = true)]
    async fn confirm_pauses_without_clicking() {
        let page = ScriptedPage::new();
        let confirm = page.add(ScriptedElement::new("button").text("確認画面へ"));
        let ctx = context(&page);

        let started = tokio::time::Instant::now();
        let outcome = ConfirmStep.run(&ctx).await.unwrap();

        assert_eq!(outcome.status, StepStatus::Success);
        assert!(!page.was_clicked(&confirm));
        assert!(started.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn final_entry_submit_is_never_clicked() {
        let page = ScriptedPage::new();
        let submit = page.add(
            ScriptedElement::new("input")
                .attr("type", "submit")
                .attr("value", "この内容で申し込む")
                .matching(AnchorDescriptor::css("input[type='submit']")),
        );
        let ctx = context(&page);

        let outcome = ConfirmStep.run(&ctx).await.unwrap();

        assert_eq!(outcome.status, StepStatus::Success);
        assert!(!page.was_clicked(&submit));
        assert!(page.interactions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn confirm_without_button_fails() {
        let page = ScriptedPage::new();
        page.add(ScriptedElement::new("div").matching(AnchorDescriptor::css("div.notice")));
        let ctx = context(&page);

        let outcome = ConfirmStep.run(&ctx).await.unwrap();
        assert_eq!(outcome.status, StepStatus::Failure);
    }
}
