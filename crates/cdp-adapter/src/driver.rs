//! The narrow surface the flow layers consume from the browser.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use ticketpilot_core_types::AnchorDescriptor;

use crate::error::AdapterError;

pub type ElementRef = Arc<dyn ElementHandle>;

/// How a pointer click is delivered.
///
/// `Forced` dispatches at the element's box centre without scrolling or
/// waiting, so overlays and running animations do not block it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ClickMode {
    Normal,
    Forced,
}

/// Result of a completed navigation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Navigation {
    pub url: String,
    pub status: Option<u16>,
}

#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Loads `url` and waits for the document. Network failures are errors.
    async fn navigate(&self, url: &str) -> Result<Navigation, AdapterError>;

    async fn query_all(&self, anchor: &AnchorDescriptor) -> Result<Vec<ElementRef>, AdapterError>;

    async fn query(&self, anchor: &AnchorDescriptor) -> Result<Option<ElementRef>, AdapterError> {
        Ok(self.query_all(anchor).await?.into_iter().next())
    }

    /// Evaluates an expression in the page and returns its JSON value.
    async fn evaluate(&self, script: &str) -> Result<Value, AdapterError>;

    async fn current_url(&self) -> Result<String, AdapterError>;

    /// Writes a full-page PNG to `path`.
    async fn capture_snapshot(&self, path: &Path) -> Result<(), AdapterError>;
}

#[async_trait]
pub trait ElementHandle: Send + Sync + fmt::Debug {
    /// Stable identity of the underlying node within the current document.
    fn key(&self) -> String;

    async fn is_visible(&self) -> Result<bool, AdapterError>;

    async fn inner_text(&self) -> Result<String, AdapterError>;

    async fn attribute(&self, name: &str) -> Result<Option<String>, AdapterError>;

    async fn click(&self, mode: ClickMode) -> Result<(), AdapterError>;

    /// Replaces the control's value with `text`.
    async fn fill(&self, text: &str) -> Result<(), AdapterError>;

    /// Selects the `<option>` whose value is `value` and fires change events.
    async fn select(&self, value: &str) -> Result<(), AdapterError>;

    /// Descendants of this element matching `anchor`, in document order.
    async fn query_all(&self, anchor: &AnchorDescriptor) -> Result<Vec<ElementRef>, AdapterError>;

    /// Nearest ancestor (or self) matching the CSS selector.
    async fn closest(&self, selector: &str) -> Result<Option<ElementRef>, AdapterError>;

    /// Calls `function` with the element bound to `this`. Only primitive
    /// return values survive the round trip.
    async fn call_js(&self, function: &str) -> Result<Value, AdapterError>;
}
