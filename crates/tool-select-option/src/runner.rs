use std::time::Instant;

use cdp_adapter::{AnchorDescriptor, ElementHandle};
use tracing::{debug, info, instrument, warn};

use crate::errors::SelectError;
use crate::model::{OptionEntry, PreferenceSet, SelectReport};
use crate::picker::choose_with_phrases;
use crate::policy::SelectPolicyView;

/// Reads `(label, value)` pairs from a `<select>` in document order. An
/// option without a `value` attribute submits its text, so the label stands
/// in for it.
pub async fn read_options(control: &dyn ElementHandle) -> Result<Vec<OptionEntry>, SelectError> {
    let nodes = control.query_all(&AnchorDescriptor::css("option")).await?;
    let mut options = Vec::with_capacity(nodes.len());
    for node in nodes {
        let label = node.inner_text().await?.trim().to_string();
        let value = match node.attribute("value").await? {
            Some(value) => value,
            None => label.clone(),
        };
        options.push(OptionEntry { label, value });
    }
    Ok(options)
}

/// Chooses an option for `preferences` and selects it on `control`.
///
/// A report without a choice means no preference matched; the control is
/// left untouched in that case.
#[instrument(skip_all, fields(control = %control.key()))]
pub async fn apply(
    control: &dyn ElementHandle,
    preferences: &PreferenceSet,
    policy: &SelectPolicyView,
) -> Result<SelectReport, SelectError> {
    let mut report = SelectReport::new(Instant::now());
    let options = read_options(control).await?;
    report.option_count = options.len();
    if options.is_empty() {
        return Err(SelectError::NoOptions);
    }
    debug!(count = options.len(), ?preferences, "choosing option");

    match choose_with_phrases(
        &options,
        preferences,
        policy.skip_leading_placeholder,
        &policy.placeholder_phrases,
    ) {
        Some(choice) => {
            control.select(&choice.value).await?;
            info!(
                label = %choice.label,
                position = choice.position,
                matched_by = %choice.matched_by,
                "option selected"
            );
            if policy.settle_ms > 0 {
                tokio::time::sleep(policy.settle()).await;
            }
            report.choice = Some(choice);
        }
        None => {
            warn!(?preferences, "no option matched");
        }
    }

    Ok(report.finish(Instant::now()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MatchKind;
    use cdp_adapter::scripted::{Interaction, ScriptedElement, ScriptedPage};

    fn quick_policy() -> SelectPolicyView {
        SelectPolicyView {
            settle_ms: 0,
            ..SelectPolicyView::default()
        }
    }

    #[tokio::test]
    async fn applies_count_preference_to_control() {
        let page = ScriptedPage::new();
        let select = page.add(ScriptedElement::select_with_options(&[
            ("選択して下さい", ""),
            ("S席(1枚)", "A/1"),
            ("S席(2枚)", "A/2"),
        ]));

        let report = apply(&select, &PreferenceSet::new().count(2).index(0), &quick_policy())
            .await
            .unwrap();
        let choice = report.choice.expect("count matched");
        assert_eq!(choice.value, "A/2");
        assert_eq!(choice.matched_by, MatchKind::Count);
        assert_eq!(report.option_count, 3);
        assert_eq!(select.value().as_deref(), Some("A/2"));
        assert!(page.interactions().contains(&Interaction::Select {
            key: select.key().to_string(),
            value: "A/2".into(),
        }));
    }

    #[tokio::test]
    async fn unmatched_preferences_leave_control_alone() {
        let page = ScriptedPage::new();
        let select = page.add(ScriptedElement::select_with_options(&[("東京", "T")]));

        let report = apply(&select, &PreferenceSet::new().keyword("大阪"), &quick_policy())
            .await
            .unwrap();
        assert!(!report.selected());
        assert!(select.value().is_none());
        assert!(page.interactions().is_empty());
    }

    #[tokio::test]
    async fn empty_select_is_an_error() {
        let select = ScriptedElement::new("select");
        let outcome = apply(&select, &PreferenceSet::new().index(0), &quick_policy()).await;
        assert!(matches!(outcome, Err(SelectError::NoOptions)));
    }

    #[tokio::test]
    async fn missing_value_attribute_falls_back_to_label() {
        let select = ScriptedElement::new("select").child(
            ScriptedElement::new("option")
                .matching(AnchorDescriptor::css("option"))
                .text(" 一般 "),
        );
        let options = read_options(&select).await.unwrap();
        assert_eq!(options, vec![OptionEntry::new("一般", "一般")]);
    }

    #[tokio::test(start_paused = true)]
    async fn settles_after_selection() {
        let select = ScriptedElement::select_with_options(&[("a", "a")]);
        let started = tokio::time::Instant::now();
        apply(&select, &PreferenceSet::new().index(0), &SelectPolicyView::default())
            .await
            .unwrap();
        assert!(started.elapsed() >= crate::policy::SELECT_SETTLE);
    }
}
