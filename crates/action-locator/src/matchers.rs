//! Matchers: the "locate by predicate" capability behind each candidate

use std::fmt;

use async_trait::async_trait;
use cdp_adapter::{AdapterError, ElementRef};
use ticketpilot_core_types::AnchorDescriptor;

use crate::types::Scope;

/// One way of finding an element.
#[async_trait]
pub trait Matcher: Send + Sync + fmt::Debug + fmt::Display {
    /// Elements in `scope` this matcher accepts, in document order.
    async fn locate(&self, scope: Scope<'_>) -> Result<Vec<ElementRef>, AdapterError>;
}

/// Matches a single [`AnchorDescriptor`].
#[derive(Clone, Debug)]
pub struct AnchorMatcher {
    anchor: AnchorDescriptor,
}

impl AnchorMatcher {
    pub fn new(anchor: AnchorDescriptor) -> Self {
        Self { anchor }
    }
}

impl fmt::Display for AnchorMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.anchor, f)
    }
}

#[async_trait]
impl Matcher for AnchorMatcher {
    async fn locate(&self, scope: Scope<'_>) -> Result<Vec<ElementRef>, AdapterError> {
        match scope {
            Scope::Page(page) => page.query_all(&self.anchor).await,
            Scope::Within(element) => element.query_all(&self.anchor).await,
        }
    }
}
