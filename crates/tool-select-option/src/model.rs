use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// One `<option>` (or radio) as read from the page.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct OptionEntry {
    pub label: String,
    pub value: String,
}

impl OptionEntry {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

impl<L: Into<String>, V: Into<String>> From<(L, V)> for OptionEntry {
    fn from((label, value): (L, V)) -> Self {
        Self::new(label, value)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum MatchKind {
    Keyword,
    Count,
    Index,
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MatchKind::Keyword => "keyword",
            MatchKind::Count => "count",
            MatchKind::Index => "index",
        };
        f.write_str(label)
    }
}

/// A single way of naming the wanted option.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum SelectionPreference {
    /// Substring of the normalized label
    Keyword(String),
    /// Ticket quantity, matched against "n枚" labels or ".../n" values
    Count(u32),
    /// Zero-based position, after the placeholder when one is skipped
    Index(usize),
}

/// Any combination of preferences. They are always consulted as
/// keyword, then count, then index, whatever order they were set in.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct PreferenceSet {
    keyword: Option<String>,
    count: Option<u32>,
    index: Option<usize>,
}

impl PreferenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blank keywords are ignored.
    pub fn keyword(mut self, keyword: impl Into<String>) -> Self {
        let keyword = keyword.into();
        if !keyword.trim().is_empty() {
            self.keyword = Some(keyword);
        }
        self
    }

    pub fn maybe_keyword(self, keyword: Option<&str>) -> Self {
        match keyword {
            Some(keyword) => self.keyword(keyword),
            None => self,
        }
    }

    pub fn count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    pub fn index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.keyword.is_none() && self.count.is_none() && self.index.is_none()
    }

    /// Preferences in precedence order.
    pub fn ordered(&self) -> Vec<SelectionPreference> {
        let mut out = Vec::with_capacity(3);
        if let Some(keyword) = &self.keyword {
            out.push(SelectionPreference::Keyword(keyword.clone()));
        }
        if let Some(count) = self.count {
            out.push(SelectionPreference::Count(count));
        }
        if let Some(index) = self.index {
            out.push(SelectionPreference::Index(index));
        }
        out
    }
}

impl From<SelectionPreference> for PreferenceSet {
    fn from(preference: SelectionPreference) -> Self {
        match preference {
            SelectionPreference::Keyword(keyword) => PreferenceSet::new().keyword(keyword),
            SelectionPreference::Count(count) => PreferenceSet::new().count(count),
            SelectionPreference::Index(index) => PreferenceSet::new().index(index),
        }
    }
}

/// The option a preference settled on.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub value: String,
    pub label: String,
    pub position: usize,
    pub matched_by: MatchKind,
}

/// Outcome of applying preferences to a live control.
#[derive(Clone, Debug)]
pub struct SelectReport {
    pub choice: Option<Choice>,
    pub option_count: usize,
    pub started_at: Instant,
    pub finished_at: Instant,
    pub latency_ms: u128,
}

impl SelectReport {
    pub fn new(started_at: Instant) -> Self {
        Self {
            choice: None,
            option_count: 0,
            started_at,
            finished_at: started_at,
            latency_ms: 0,
        }
    }

    pub fn finish(mut self, finished_at: Instant) -> Self {
        self.finished_at = finished_at;
        self.latency_ms = finished_at
            .saturating_duration_since(self.started_at)
            .as_millis();
        self
    }

    pub fn selected(&self) -> bool {
        self.choice.is_some()
    }
}
