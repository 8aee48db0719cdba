//! First-come ticket flow: wait for the sale to open, then walk the
//! purchase pages up to the confirmation screen.

use std::time::Duration;

use action_flow::{FlowError, FlowState, FlowStep, StepOutcome};
use action_gate::GateCondition;
use action_locator::{resolve, CandidateList, LocatorError, ResolveOptions, Scope};
use async_trait::async_trait;
use cdp_adapter::{AdapterError, ElementRef, PageDriver};
use tool_click::ActionKind;
use tool_select_option::{choose_radio, radio_entries, PreferenceSet, RadioRule};
use tracing::{info, warn};

use super::selectors::{self, EVENT_CONTAINER};
use super::steps::{AuthenticateStep, NavigateStep};
use super::{FlowContext, StepList};
use crate::config::{FlowConfig, MethodConfig};

pub const FAMIMA: &str = "ファミリーマート";
pub const SEVEN: &str = "セブン-イレブン";

pub fn steps(config: &FlowConfig) -> StepList {
    vec![
        Box::new(NavigateStep::new(config.target.event_url())),
        Box::new(AwaitAvailabilityStep),
        Box::new(SelectTicketsStep),
        Box::new(AuthenticateStep::during_purchase()),
        Box::new(PaymentDeliveryStep),
        Box::new(AdvanceStep),
    ]
}

/// A visible "次へ" inside the container of the last `受付中` marker.
pub struct SalesOpen;

impl SalesOpen {
    pub async fn locate(&self, page: &dyn PageDriver) -> Result<Option<ElementRef>, AdapterError> {
        let markers = page.query_all(&selectors::accepting_marker()).await?;
        let Some(marker) = markers.last() else {
            return Ok(None);
        };
        let Some(container) = marker.closest(EVENT_CONTAINER).await? else {
            return Ok(None);
        };
        let probe = ResolveOptions::new(Duration::ZERO);
        match resolve(
            Scope::Within(container.as_ref()),
            &selectors::next_in_container(),
            &probe,
        )
        .await
        {
            Ok(found) => Ok(found.map(|resolved| resolved.element)),
            Err(LocatorError::Transport { source, .. }) => Err(source),
            Err(_) => Ok(None),
        }
    }
}

#[async_trait]
impl GateCondition for SalesOpen {
    async fn evaluate(&self, page: &dyn PageDriver) -> Result<bool, AdapterError> {
        Ok(self.locate(page).await?.is_some())
    }

    fn describe(&self) -> String {
        format!("next button next to {:?}", selectors::ACCEPTING_MARKER)
    }
}

pub struct AwaitAvailabilityStep;

#[async_trait]
impl FlowStep<FlowContext> for AwaitAvailabilityStep {
    fn state(&self) -> FlowState {
        FlowState::AwaitAvailability
    }

    async fn run(&self, ctx: &FlowContext) -> Result<StepOutcome, FlowError> {
        let timing = &ctx.config.timing;
        let poll = ctx
            .wait_for(&SalesOpen, timing.poll_interval(), timing.max_poll())
            .await?;
        if !poll.found {
            return Ok(StepOutcome::failure(format!(
                "sales did not open within {}s ({} checks)",
                poll.elapsed.as_secs(),
                poll.attempts
            )));
        }
        info!(waited_s = poll.elapsed.as_secs(), "sales open");

        let Some(next) = SalesOpen.locate(ctx.page.as_ref()).await? else {
            return Ok(StepOutcome::failure("next button vanished after sales opened"));
        };
        let report = ctx.click_or_pause(next.as_ref(), ActionKind::Click).await;
        if report.is_success() {
            Ok(StepOutcome::success())
        } else {
            Ok(StepOutcome::failure(format!(
                "next button did not respond: {}",
                report.failure_summary()
            )))
        }
    }
}

/// Performance, seat type and quantity, then the login button.
pub struct SelectTicketsStep;

impl SelectTicketsStep {
    fn controls(config: &FlowConfig) -> [(&'static str, CandidateList, PreferenceSet); 3] {
        let selection = &config.selection;
        [
            (
                "performance",
                selectors::performance_select(),
                PreferenceSet::new()
                    .maybe_keyword(selection.performance_keyword.as_deref())
                    .index(selection.performance_index),
            ),
            (
                "seat type",
                selectors::seat_type_select(),
                PreferenceSet::new()
                    .maybe_keyword(selection.seat_type_keyword.as_deref())
                    .index(selection.seat_type_index),
            ),
            (
                "quantity",
                selectors::quantity_select(),
                PreferenceSet::new().count(selection.ticket_count),
            ),
        ]
    }
}

#[async_trait]
impl FlowStep<FlowContext> for SelectTicketsStep {
    fn state(&self) -> FlowState {
        FlowState::SelectOptions
    }

    async fn run(&self, ctx: &FlowContext) -> Result<StepOutcome, FlowError> {
        let policy = ctx.select_policy();
        for (name, candidates, preferences) in Self::controls(&ctx.config) {
            let Some(control) = ctx.find(&candidates).await? else {
                warn!(control = name, "select control not found; skipping");
                continue;
            };
            match tool_select_option::apply(control.as_ref(), &preferences, &policy).await {
                Ok(report) => match &report.choice {
                    Some(choice) => info!(
                        control = name,
                        label = %choice.label,
                        matched_by = ?choice.matched_by,
                        "option selected"
                    ),
                    None => warn!(
                        control = name,
                        options = report.option_count,
                        "no option matched the preferences"
                    ),
                },
                Err(err) => warn!(control = name, %err, "selection failed; skipping"),
            }
        }

        let Some(login) = ctx.find(&selectors::purchase_login_button()).await? else {
            return Ok(StepOutcome::failure("login button not found"));
        };
        let report = ctx.click(login.as_ref(), ActionKind::Click).await;
        if report.is_success() {
            Ok(StepOutcome::success())
        } else {
            Ok(StepOutcome::failure(format!(
                "login button did not respond: {}",
                report.failure_summary()
            )))
        }
    }
}

/// Delivery priority: Family Mart first unless Seven-Eleven is asked for.
pub fn delivery_rules(methods: &MethodConfig) -> Vec<RadioRule> {
    let wanted = methods.delivery_method.to_lowercase();
    let mut stores = [FAMIMA, SEVEN];
    if wanted.contains("セブン") || wanted.contains("seven") {
        stores.reverse();
    }
    stores
        .into_iter()
        .map(|store| RadioRule::LabelContains(store.to_string()))
        .chain([RadioRule::First])
        .collect()
}

/// Payment priority: convenience-store payment (value `3`), the chosen
/// store by label, then credit card when configured, then anything.
pub fn payment_rules(methods: &MethodConfig, chosen_store: Option<&str>) -> Vec<RadioRule> {
    let mut rules = vec![RadioRule::Value("3".into())];
    if let Some(store) = chosen_store {
        rules.push(RadioRule::LabelContains(store.to_string()));
    }
    if methods.payment_method.contains("クレジット") {
        rules.push(RadioRule::Value("1".into()));
        rules.push(RadioRule::LabelContains("クレジット".into()));
    }
    rules.push(RadioRule::First);
    rules
}

/// Which store a delivery label names, if any.
pub fn store_in(label: &str) -> Option<&'static str> {
    [FAMIMA, SEVEN]
        .into_iter()
        .find(|store| tool_select_option::normalize::contains_normalized(label, store))
}

pub struct PaymentDeliveryStep;

impl PaymentDeliveryStep {
    /// Clicks the radio picked by `rules`; returns its label.
    async fn pick(
        ctx: &FlowContext,
        group: &str,
        selector: &str,
        rules: &[RadioRule],
    ) -> Result<Option<String>, FlowError> {
        let radios = ctx
            .page
            .query_all(&ticketpilot_core_types::AnchorDescriptor::css(selector))
            .await?;
        if radios.is_empty() {
            info!(group, "radio group not on this page");
            return Ok(None);
        }
        let entries = radio_entries(&radios)
            .await
            .map_err(|err| FlowError::step(format!("{group}: {err}")))?;
        let Some(index) = choose_radio(&entries, rules) else {
            return Ok(None);
        };
        let report = ctx.click(radios[index].as_ref(), ActionKind::Click).await;
        if !report.is_success() {
            warn!(group, summary = %report.failure_summary(), "radio click failed");
            return Ok(None);
        }
        info!(group, label = %entries[index].label, value = %entries[index].value, "radio chosen");
        Ok(Some(entries[index].label.clone()))
    }
}

#[async_trait]
impl FlowStep<FlowContext> for PaymentDeliveryStep {
    fn state(&self) -> FlowState {
        FlowState::ChoosePaymentDelivery
    }

    async fn run(&self, ctx: &FlowContext) -> Result<StepOutcome, FlowError> {
        let methods = &ctx.config.methods;
        let delivery = Self::pick(
            ctx,
            "delivery",
            selectors::DELIVERY_RADIOS,
            &delivery_rules(methods),
        )
        .await?;
        let store = delivery.as_deref().and_then(store_in);
        let payment = Self::pick(
            ctx,
            "payment",
            selectors::PAYMENT_RADIOS,
            &payment_rules(methods, store),
        )
        .await?;

        match (delivery, payment) {
            (None, None) => Ok(StepOutcome::skipped("no payment or delivery choice made")),
            _ => Ok(StepOutcome::success()),
        }
    }
}

/// "次へ" to the confirmation page. The flow ends there.
pub struct AdvanceStep;

#[async_trait]
impl FlowStep<FlowContext> for AdvanceStep {
    fn state(&self) -> FlowState {
        FlowState::AdvanceToConfirmation
    }

    async fn run(&self, ctx: &FlowContext) -> Result<StepOutcome, FlowError> {
        let Some(next) = ctx.find(&selectors::advance_button()).await? else {
            return Ok(StepOutcome::failure("next button not found"));
        };
        let report = ctx.click(next.as_ref(), ActionKind::Click).await;
        if report.is_success() {
            info!("confirmation page reached; final submission is left to the operator");
            Ok(StepOutcome::success())
        } else {
            Ok(StepOutcome::failure(format!(
                "next button did not respond: {}",
                report.failure_summary()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use action_flow::StepStatus;
    use cdp_adapter::scripted::{Interaction, ScriptedElement, ScriptedPage};
    use cdp_adapter::ClickMode;
    use serde_json::json;
    use ticketpilot_core_types::AnchorDescriptor;
    use tokio_util::sync::CancellationToken;

    fn context_with(page: &ScriptedPage, tweak: impl FnOnce(&mut FlowConfig)) -> FlowContext {
        let mut config = FlowConfig::default();
        config.timing.poll_interval_ms = 2_000;
        config.timing.max_poll_ms = 10_000;
        config.timing.operator_pause_ms = 1_000;
        tweak(&mut config);
        FlowContext::new(Arc::new(config), Arc::new(page.clone()), CancellationToken::new())
    }

    fn context(page: &ScriptedPage) -> FlowContext {
        context_with(page, |_| {})
    }

    /// A performance row that opens after `closed_polls` checks.
    fn event_row(page: &ScriptedPage, closed_polls: u32) -> ScriptedElement {
        let next = ScriptedElement::new("button").text("次へ");
        let container = ScriptedElement::new("li").child(next.clone());
        page.add(
            ScriptedElement::new("span")
                .text("受付中")
                .matching(selectors::accepting_marker())
                .inside(EVENT_CONTAINER, container.clone())
                .appears_after(closed_polls),
        );
        page.add(container);
        next
    }

    #[tokio::test(start_paused = true)]
    async fn availability_clicks_next_once_open() {
        let page = ScriptedPage::new();
        let next = event_row(&page, 2);
        let ctx = context(&page);

        let outcome = AwaitAvailabilityStep.run(&ctx).await.unwrap();

        assert_eq!(outcome.status, StepStatus::Success);
        assert!(page.was_clicked(&next));
    }

    #[tokio::test(start_paused = true)]
    async fn availability_times_out_into_failure() {
        let page = ScriptedPage::new();
        let ctx = context(&page);

        let started = tokio::time::Instant::now();
        let outcome = AwaitAvailabilityStep.run(&ctx).await.unwrap();

        assert_eq!(outcome.status, StepStatus::Failure);
        assert!(outcome.message.unwrap().contains("did not open"));
        assert!(started.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn marker_without_container_does_not_count() {
        let page = ScriptedPage::new();
        page.add(
            ScriptedElement::new("span")
                .text("受付中")
                .matching(selectors::accepting_marker()),
        );
        assert!(!SalesOpen.evaluate(&page).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn hidden_next_button_does_not_count() {
        let page = ScriptedPage::new();
        let container =
            ScriptedElement::new("li").child(ScriptedElement::new("button").text("次へ").hidden());
        page.add(
            ScriptedElement::new("span")
                .matching(selectors::accepting_marker())
                .inside(EVENT_CONTAINER, container),
        );
        assert!(!SalesOpen.evaluate(&page).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn unresponsive_next_button_fails_after_pause() {
        let page = ScriptedPage::new();
        let next = ScriptedElement::new("button")
            .text("次へ")
            .fail_click(ClickMode::Normal)
            .fail_click(ClickMode::Forced)
            .fail_script();
        let container = ScriptedElement::new("li").child(next);
        page.add(
            ScriptedElement::new("span")
                .matching(selectors::accepting_marker())
                .inside(EVENT_CONTAINER, container.clone()),
        );
        page.add(container);
        let ctx = context(&page);

        let started = tokio::time::Instant::now();
        let outcome = AwaitAvailabilityStep.run(&ctx).await.unwrap();

        assert_eq!(outcome.status, StepStatus::Failure);
        assert!(started.elapsed() >= Duration::from_secs(1));
    }

    fn select_in_row(page: &ScriptedPage, header: &str, options: &[(&str, &str)]) -> ScriptedElement {
        page.add(
            ScriptedElement::select_with_options(options).matching(AnchorDescriptor::xpath(
                format!("//tr[.//th[contains(normalize-space(),'{header}')]]//select"),
            )),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn ticket_selection_uses_keywords_counts_and_indices() {
        let page = ScriptedPage::new();
        let performance = select_in_row(
            &page,
            "公演日時",
            &[
                ("選択して下さい", ""),
                ("2025/11/15 18:00", "PERF1"),
                ("2025/11/16 18:00", "PERF2"),
            ],
        );
        let seat = select_in_row(&page, "席種", &[("Ｓ席", "S"), ("Ａ席", "A")]);
        let quantity = select_in_row(&page, "枚数", &[("1枚", "A/1"), ("2枚", "A/2")]);
        let login = page.add(ScriptedElement::new("button").text("ログイン"));
        let ctx = context_with(&page, |config| {
            config.selection.seat_type_keyword = Some("A席".into());
            config.selection.ticket_count = 2;
        });

        let outcome = SelectTicketsStep.run(&ctx).await.unwrap();

        assert_eq!(outcome.status, StepStatus::Success);
        assert_eq!(performance.value().as_deref(), Some("PERF1"));
        assert_eq!(seat.value().as_deref(), Some("A"));
        assert_eq!(quantity.value().as_deref(), Some("A/2"));
        assert!(page.was_clicked(&login));
    }

    #[tokio::test(start_paused = true)]
    async fn quantity_without_count_labels_is_left_alone() {
        let page = ScriptedPage::new();
        let quantity = select_in_row(
            &page,
            "枚数",
            &[("選択してください", ""), ("1", "1"), ("2", "2"), ("3", "3")],
        );
        page.add(ScriptedElement::new("button").text("ログイン"));
        let ctx = context_with(&page, |config| config.selection.ticket_count = 2);

        let outcome = SelectTicketsStep.run(&ctx).await.unwrap();

        assert_eq!(outcome.status, StepStatus::Success);
        assert_ne!(quantity.value().as_deref(), Some("3"));
        assert!(!page
            .interactions()
            .iter()
            .any(|i| matches!(i, Interaction::Select { key, .. } if key == quantity.key())));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_controls_are_skipped_but_login_is_required() {
        let page = ScriptedPage::new();
        let ctx = context(&page);

        let outcome = SelectTicketsStep.run(&ctx).await.unwrap();

        assert_eq!(outcome.status, StepStatus::Failure);
        assert_eq!(outcome.message.as_deref(), Some("login button not found"));
    }

    #[test]
    fn delivery_prefers_family_mart_by_default() {
        let rules = delivery_rules(&MethodConfig::default());
        assert_eq!(rules[0], RadioRule::LabelContains(FAMIMA.into()));
        assert_eq!(rules.last(), Some(&RadioRule::First));
    }

    #[test]
    fn delivery_prefers_seven_when_asked() {
        let methods = MethodConfig {
            delivery_method: "Seven-Eleven".into(),
            ..MethodConfig::default()
        };
        assert_eq!(delivery_rules(&methods)[0], RadioRule::LabelContains(SEVEN.into()));
    }

    #[test]
    fn payment_rules_follow_store_then_credit() {
        let rules = payment_rules(&MethodConfig::default(), Some(SEVEN));
        assert_eq!(
            rules,
            vec![
                RadioRule::Value("3".into()),
                RadioRule::LabelContains(SEVEN.into()),
                RadioRule::Value("1".into()),
                RadioRule::LabelContains("クレジット".into()),
                RadioRule::First,
            ]
        );

        let cash = MethodConfig {
            payment_method: "コンビニ".into(),
            ..MethodConfig::default()
        };
        assert_eq!(
            payment_rules(&cash, None),
            vec![RadioRule::Value("3".into()), RadioRule::First]
        );
    }

    #[test]
    fn store_is_read_from_delivery_label() {
        assert_eq!(store_in("ファミリーマート店頭受取"), Some(FAMIMA));
        assert_eq!(store_in("セブン-イレブン 発券"), Some(SEVEN));
        assert_eq!(store_in("スマチケ"), None);
    }

    fn radio(page: &ScriptedPage, group: &str, value: &str, label: &str) -> ScriptedElement {
        page.add(
            ScriptedElement::new("input")
                .attr("value", value)
                .script_result(json!(label))
                .matching(AnchorDescriptor::css(group)),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn payment_and_delivery_radios_follow_priorities() {
        let page = ScriptedPage::new();
        let _smart = radio(&page, selectors::DELIVERY_RADIOS, "5", "スマチケ");
        let seven = radio(&page, selectors::DELIVERY_RADIOS, "2", "セブン-イレブン");
        let famima = radio(&page, selectors::DELIVERY_RADIOS, "4", "ファミリーマート");
        let card = radio(&page, selectors::PAYMENT_RADIOS, "1", "クレジットカード");
        let store_pay = radio(&page, selectors::PAYMENT_RADIOS, "3", "コンビニ支払");
        let ctx = context(&page);

        let outcome = PaymentDeliveryStep.run(&ctx).await.unwrap();

        assert_eq!(outcome.status, StepStatus::Success);
        assert!(page.was_clicked(&famima));
        assert!(!page.was_clicked(&seven));
        assert!(page.was_clicked(&store_pay));
        assert!(!page.was_clicked(&card));
    }

    #[tokio::test(start_paused = true)]
    async fn no_radio_groups_is_skipped() {
        let page = ScriptedPage::new();
        let ctx = context(&page);

        let outcome = PaymentDeliveryStep.run(&ctx).await.unwrap();
        assert_eq!(outcome.status, StepStatus::Skipped);
    }

    #[tokio::test(start_paused = true)]
    async fn advance_clicks_next_and_nothing_else() {
        let page = ScriptedPage::new();
        let next = page.add(ScriptedElement::new("button").text("次へ"));
        let ctx = context(&page);

        let outcome = AdvanceStep.run(&ctx).await.unwrap();

        assert_eq!(outcome.status, StepStatus::Success);
        assert_eq!(
            page.interactions(),
            vec![Interaction::Click {
                key: next.key().to_string(),
                mode: ClickMode::Normal
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn advance_without_button_fails() {
        let page = ScriptedPage::new();
        let ctx = context(&page);

        let outcome = AdvanceStep.run(&ctx).await.unwrap();
        assert_eq!(outcome.status, StepStatus::Failure);
    }
}
