use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Phrases a leading "please choose" option carries on the target sites.
pub const DEFAULT_PLACEHOLDER_PHRASES: &[&str] = &[
    "選択して下さい",
    "選択してください",
    "お選びください",
    "please select",
];

/// Pause after a selection so dependent controls can repopulate.
pub const SELECT_SETTLE: Duration = Duration::from_millis(500);

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SelectPolicyView {
    pub skip_leading_placeholder: bool,
    pub placeholder_phrases: Vec<String>,
    pub settle_ms: u64,
}

impl SelectPolicyView {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

impl Default for SelectPolicyView {
    fn default() -> Self {
        Self {
            skip_leading_placeholder: true,
            placeholder_phrases: DEFAULT_PLACEHOLDER_PHRASES
                .iter()
                .map(|phrase| phrase.to_string())
                .collect(),
            settle_ms: SELECT_SETTLE.as_millis() as u64,
        }
    }
}
