//! Choosing one radio out of a group by priority rules.

use cdp_adapter::ElementRef;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::SelectError;
use crate::model::OptionEntry;
use crate::normalize::contains_normalized;

/// Label of a radio: `label[for=id]`, else the enclosing `<label>`.
pub const LABEL_FN: &str = r#"function() {
    let text = '';
    if (this.id) {
        const byFor = document.querySelector('label[for="' + CSS.escape(this.id) + '"]');
        if (byFor) text = byFor.innerText || byFor.textContent || '';
    }
    if (!text) {
        const wrapping = this.closest('label');
        if (wrapping) text = wrapping.innerText || wrapping.textContent || '';
    }
    return text.trim();
}"#;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum RadioRule {
    Value(String),
    LabelContains(String),
    First,
}

/// Index of the radio picked by the first rule that matches anything.
pub fn choose_radio(entries: &[OptionEntry], rules: &[RadioRule]) -> Option<usize> {
    rules.iter().find_map(|rule| match rule {
        RadioRule::Value(value) => entries.iter().position(|entry| entry.value == *value),
        RadioRule::LabelContains(phrase) => entries
            .iter()
            .position(|entry| contains_normalized(&entry.label, phrase)),
        RadioRule::First => (!entries.is_empty()).then_some(0),
    })
}

/// Reads label and value for each radio.
pub async fn radio_entries(radios: &[ElementRef]) -> Result<Vec<OptionEntry>, SelectError> {
    let mut entries = Vec::with_capacity(radios.len());
    for radio in radios {
        let value = radio.attribute("value").await?.unwrap_or_default();
        let label = match radio.call_js(LABEL_FN).await {
            Ok(label) => label.as_str().unwrap_or_default().to_string(),
            Err(err) => {
                debug!(radio = %radio.key(), %err, "label lookup failed");
                String::new()
            }
        };
        entries.push(OptionEntry { label, value });
    }
    Ok(entries)
}
