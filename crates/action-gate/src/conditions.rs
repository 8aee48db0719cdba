//! Page conditions the poller can wait on

use std::fmt;

use async_trait::async_trait;
use cdp_adapter::{AdapterError, PageDriver};
use regex::Regex;
use ticketpilot_core_types::redact;
use tracing::trace;

use crate::errors::GateError;

/// A yes/no question about the current page.
#[async_trait]
pub trait GateCondition: Send + Sync {
    async fn evaluate(&self, page: &dyn PageDriver) -> Result<bool, AdapterError>;

    /// Short label for logs.
    fn describe(&self) -> String;
}

/// `document.readyState === "complete"`
#[derive(Clone, Copy, Debug, Default)]
pub struct DocumentReady;

#[async_trait]
impl GateCondition for DocumentReady {
    async fn evaluate(&self, page: &dyn PageDriver) -> Result<bool, AdapterError> {
        let state = page.evaluate("document.readyState").await?;
        Ok(state.as_str() == Some("complete"))
    }

    fn describe(&self) -> String {
        "document ready".into()
    }
}

/// Predicate on the current URL.
#[derive(Clone, Debug)]
pub enum UrlCondition {
    Contains(String),
    NotContains(String),
    Matches(Regex),
}

impl UrlCondition {
    pub fn matches(pattern: &str) -> Result<Self, GateError> {
        Regex::new(pattern)
            .map(UrlCondition::Matches)
            .map_err(|err| GateError::InvalidPattern(err.to_string()))
    }

    pub fn test(&self, url: &str) -> bool {
        match self {
            UrlCondition::Contains(needle) => url.contains(needle.as_str()),
            UrlCondition::NotContains(needle) => !url.contains(needle.as_str()),
            UrlCondition::Matches(re) => re.is_match(url),
        }
    }
}

impl fmt::Display for UrlCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrlCondition::Contains(needle) => write!(f, "url contains {needle:?}"),
            UrlCondition::NotContains(needle) => write!(f, "url lacks {needle:?}"),
            UrlCondition::Matches(re) => write!(f, "url matches /{}/", re.as_str()),
        }
    }
}

#[async_trait]
impl GateCondition for UrlCondition {
    async fn evaluate(&self, page: &dyn PageDriver) -> Result<bool, AdapterError> {
        let url = page.current_url().await?;
        let hit = self.test(&url);
        trace!(url = %redact::url(&url), hit, "url check");
        Ok(hit)
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

/// Holds when any inner condition holds; evaluated in order.
pub struct AnyOf(pub Vec<Box<dyn GateCondition>>);

#[async_trait]
impl GateCondition for AnyOf {
    async fn evaluate(&self, page: &dyn PageDriver) -> Result<bool, AdapterError> {
        for condition in &self.0 {
            if condition.evaluate(page).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn describe(&self) -> String {
        let parts: Vec<_> = self.0.iter().map(|c| c.describe()).collect();
        format!("any of [{}]", parts.join(", "))
    }
}

/// Post-login heuristic: the URL no longer mentions `login`, or mentions
/// `mypage`. Unverified against the site; treat a miss as a warning.
pub fn login_heuristic() -> AnyOf {
    AnyOf(vec![
        Box::new(UrlCondition::NotContains("login".into())),
        Box::new(UrlCondition::Contains("mypage".into())),
    ])
}
