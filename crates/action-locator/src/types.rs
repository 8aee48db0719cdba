//! Core types for the locator

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use cdp_adapter::{ElementHandle, ElementRef, PageDriver};

use crate::matchers::{AnchorMatcher, Matcher};
use ticketpilot_core_types::AnchorDescriptor;

/// Default pause between probes of one candidate.
pub const RESOLVE_POLL: Duration = Duration::from_millis(100);

/// Where a matcher searches.
#[derive(Clone, Copy)]
pub enum Scope<'a> {
    Page(&'a dyn PageDriver),
    Within(&'a dyn ElementHandle),
}

impl fmt::Debug for Scope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Page(_) => f.write_str("Scope::Page"),
            Scope::Within(element) => write!(f, "Scope::Within({})", element.key()),
        }
    }
}

/// Ordered candidates for one logical target, tried first to last.
#[derive(Clone, Debug)]
pub struct CandidateList {
    label: String,
    matchers: Vec<Arc<dyn Matcher>>,
}

impl CandidateList {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            matchers: Vec::new(),
        }
    }

    /// Builds a list from plain descriptors.
    pub fn from_anchors(
        label: impl Into<String>,
        anchors: impl IntoIterator<Item = AnchorDescriptor>,
    ) -> Self {
        anchors
            .into_iter()
            .fold(Self::new(label), |list, anchor| list.with_anchor(anchor))
    }

    pub fn with_anchor(self, anchor: AnchorDescriptor) -> Self {
        self.with_matcher(Arc::new(AnchorMatcher::new(anchor)))
    }

    pub fn with_matcher(mut self, matcher: Arc<dyn Matcher>) -> Self {
        self.matchers.push(matcher);
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn matchers(&self) -> &[Arc<dyn Matcher>] {
        &self.matchers
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}

/// Resolution budget for one call.
#[derive(Clone, Debug)]
pub struct ResolveOptions {
    pub timeout_per_candidate: Duration,
    pub require_visible: bool,
    pub poll_interval: Duration,
}

impl ResolveOptions {
    pub fn new(timeout_per_candidate: Duration) -> Self {
        Self {
            timeout_per_candidate,
            require_visible: true,
            poll_interval: RESOLVE_POLL,
        }
    }

    pub fn allow_hidden(mut self) -> Self {
        self.require_visible = false;
        self
    }
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

/// Successful resolution.
#[derive(Clone, Debug)]
pub struct Resolved {
    pub element: ElementRef,
    /// Position of the winning matcher in the list
    pub candidate_index: usize,
    pub matcher: String,
}
