//! Quick purchase from a direct ticket URL.

use action_flow::{FlowError, FlowState, FlowStep, StepOutcome};
use async_trait::async_trait;
use tool_click::ActionKind;
use tracing::{info, warn};

use super::steps::{click_or_hand_over, set_single_quantity, NavigateStep};
use super::{selectors, FlowContext, StepList};

pub fn steps(url: &str) -> StepList {
    vec![
        Box::new(NavigateStep::new(url)),
        Box::new(ChooseTicketStep),
        Box::new(CartStep),
    ]
}

/// Purchase button, first seat type if offered, one ticket.
pub struct ChooseTicketStep;

#[async_trait]
impl FlowStep<FlowContext> for ChooseTicketStep {
    fn state(&self) -> FlowState {
        FlowState::SelectOptions
    }

    async fn run(&self, ctx: &FlowContext) -> Result<StepOutcome, FlowError> {
        let clicked = click_or_hand_over(ctx, &selectors::purchase_button()).await?;

        if let Some(seat) = ctx.find(&selectors::seat_choice_button()).await? {
            let report = ctx.click(seat.as_ref(), ActionKind::Click).await;
            if !report.is_success() {
                warn!(summary = %report.failure_summary(), "seat type button did not respond");
            }
        }
        set_single_quantity(ctx).await?;

        Ok(if clicked {
            StepOutcome::success()
        } else {
            StepOutcome::success().with_message("purchase button handled by the operator")
        })
    }
}

/// Cart / next, then the operator finishes the order.
pub struct CartStep;

#[async_trait]
impl FlowStep<FlowContext> for CartStep {
    fn state(&self) -> FlowState {
        FlowState::AdvanceToConfirmation
    }

    async fn run(&self, ctx: &FlowContext) -> Result<StepOutcome, FlowError> {
        let Some(cart) = ctx.find(&selectors::cart_button()).await? else {
            return Ok(StepOutcome::failure("cart button not found"));
        };
        let report = ctx.click(cart.as_ref(), ActionKind::Click).await;
        if !report.is_success() {
            return Ok(StepOutcome::failure(format!(
                "cart button did not respond: {}",
                report.failure_summary()
            )));
        }
        info!("order review open; complete the purchase by hand");
        ctx.operator_pause("review order", ctx.config.timing.operator_pause())
            .await;
        Ok(StepOutcome::success())
    }
}
