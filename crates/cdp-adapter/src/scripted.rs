//! In-memory [`PageDriver`] for tests.
//!
//! Elements are registered with the descriptors they answer to. Text and
//! attribute descriptors also match on the element's tag, text and
//! attributes, so most fixtures only register CSS and XPath anchors.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use ticketpilot_core_types::AnchorDescriptor;

use crate::driver::{ClickMode, ElementHandle, ElementRef, Navigation, PageDriver};
use crate::error::{AdapterError, AdapterErrorKind};

static NEXT_ELEMENT: AtomicU64 = AtomicU64::new(1);

/// Something the page observed, in call order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Interaction {
    Click { key: String, mode: ClickMode },
    ScriptClick { key: String },
    Fill { key: String, text: String },
    Select { key: String, value: String },
}

impl Interaction {
    pub fn key(&self) -> &str {
        match self {
            Interaction::Click { key, .. }
            | Interaction::ScriptClick { key }
            | Interaction::Fill { key, .. }
            | Interaction::Select { key, .. } => key,
        }
    }
}

struct PageState {
    url: String,
    elements: Vec<ScriptedElement>,
    navigations: Vec<String>,
    snapshots: Vec<PathBuf>,
    evaluations: Vec<String>,
    eval_rules: Vec<(String, Value)>,
    interactions: Vec<Interaction>,
    fail_navigation: bool,
}

impl Default for PageState {
    fn default() -> Self {
        Self {
            url: "about:blank".to_string(),
            elements: Vec::new(),
            navigations: Vec::new(),
            snapshots: Vec::new(),
            evaluations: Vec::new(),
            eval_rules: vec![("readyState".to_string(), Value::from("complete"))],
            interactions: Vec::new(),
            fail_navigation: false,
        }
    }
}

#[derive(Clone, Default)]
pub struct ScriptedPage {
    state: Arc<Mutex<PageState>>,
}

impl ScriptedPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a top-level element (its children come along).
    pub fn add(&self, element: ScriptedElement) -> ScriptedElement {
        element.attach(Arc::downgrade(&self.state));
        self.state.lock().elements.push(element.clone());
        element
    }

    pub fn remove(&self, element: &ScriptedElement) {
        self.state
            .lock()
            .elements
            .retain(|existing| existing.inner.key != element.inner.key);
    }

    pub fn set_url(&self, url: impl Into<String>) {
        self.state.lock().url = url.into();
    }

    pub fn url(&self) -> String {
        self.state.lock().url.clone()
    }

    /// `evaluate` returns `value` for scripts containing `needle`. Later
    /// rules win over earlier ones.
    pub fn on_evaluate(&self, needle: impl Into<String>, value: Value) {
        self.state.lock().eval_rules.insert(0, (needle.into(), value));
    }

    pub fn fail_navigation(&self, fail: bool) {
        self.state.lock().fail_navigation = fail;
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().navigations.clone()
    }

    pub fn snapshots(&self) -> Vec<PathBuf> {
        self.state.lock().snapshots.clone()
    }

    pub fn evaluations(&self) -> Vec<String> {
        self.state.lock().evaluations.clone()
    }

    pub fn interactions(&self) -> Vec<Interaction> {
        self.state.lock().interactions.clone()
    }

    pub fn was_clicked(&self, element: &ScriptedElement) -> bool {
        self.interactions().iter().any(|interaction| {
            matches!(
                interaction,
                Interaction::Click { .. } | Interaction::ScriptClick { .. }
            ) && interaction.key() == element.key()
        })
    }

    fn all_elements(&self) -> Vec<ScriptedElement> {
        let roots = self.state.lock().elements.clone();
        let mut out = Vec::new();
        for root in roots {
            root.flatten_into(&mut out);
        }
        out
    }
}

#[async_trait]
impl PageDriver for ScriptedPage {
    async fn navigate(&self, url: &str) -> Result<Navigation, AdapterError> {
        let mut state = self.state.lock();
        if state.fail_navigation {
            return Err(AdapterError::new(AdapterErrorKind::NavFailed)
                .with_hint(format!("scripted failure for {url}")));
        }
        state.url = url.to_string();
        state.navigations.push(url.to_string());
        Ok(Navigation {
            url: url.to_string(),
            status: Some(200),
        })
    }

    async fn query_all(&self, anchor: &AnchorDescriptor) -> Result<Vec<ElementRef>, AdapterError> {
        Ok(present_matches(self.all_elements(), anchor))
    }

    async fn evaluate(&self, script: &str) -> Result<Value, AdapterError> {
        let mut state = self.state.lock();
        state.evaluations.push(script.to_string());
        Ok(state
            .eval_rules
            .iter()
            .find(|(needle, _)| script.contains(needle.as_str()))
            .map(|(_, value)| value.clone())
            .unwrap_or(Value::Null))
    }

    async fn current_url(&self) -> Result<String, AdapterError> {
        Ok(self.url())
    }

    async fn capture_snapshot(&self, path: &Path) -> Result<(), AdapterError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|err| {
                AdapterError::new(AdapterErrorKind::Io).with_hint(err.to_string())
            })?;
        }
        tokio::fs::write(path, b"scripted snapshot")
            .await
            .map_err(|err| AdapterError::new(AdapterErrorKind::Io).with_hint(err.to_string()))?;
        self.state.lock().snapshots.push(path.to_path_buf());
        Ok(())
    }
}

fn present_matches(candidates: Vec<ScriptedElement>, anchor: &AnchorDescriptor) -> Vec<ElementRef> {
    candidates
        .into_iter()
        .filter(|element| element.matches(anchor) && element.consume_presence())
        .map(|element| Arc::new(element) as ElementRef)
        .collect()
}

struct ElementState {
    anchors: Vec<AnchorDescriptor>,
    text: String,
    attributes: HashMap<String, String>,
    visible: bool,
    hidden_probes: u32,
    absent_probes: u32,
    children: Vec<ScriptedElement>,
    containers: Vec<(String, ScriptedElement)>,
    failing_modes: Vec<ClickMode>,
    fail_script: bool,
    script_result: Value,
    navigates_to: Option<String>,
    value: Option<String>,
    page: Weak<Mutex<PageState>>,
}

struct ElementInner {
    key: String,
    tag: String,
    state: Mutex<ElementState>,
}

#[derive(Clone)]
pub struct ScriptedElement {
    inner: Arc<ElementInner>,
}

impl std::fmt::Debug for ScriptedElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedElement")
            .field("key", &self.inner.key)
            .finish()
    }
}

impl ScriptedElement {
    pub fn new(tag: impl Into<String>) -> Self {
        let tag = tag.into();
        let id = NEXT_ELEMENT.fetch_add(1, Ordering::Relaxed);
        Self {
            inner: Arc::new(ElementInner {
                key: format!("{tag}#{id}"),
                tag,
                state: Mutex::new(ElementState {
                    anchors: Vec::new(),
                    text: String::new(),
                    attributes: HashMap::new(),
                    visible: true,
                    hidden_probes: 0,
                    absent_probes: 0,
                    children: Vec::new(),
                    containers: Vec::new(),
                    failing_modes: Vec::new(),
                    fail_script: false,
                    script_result: Value::Null,
                    navigates_to: None,
                    value: None,
                    page: Weak::new(),
                }),
            }),
        }
    }

    /// A `<select>` whose `<option>` children carry the given labels and values.
    pub fn select_with_options(options: &[(&str, &str)]) -> Self {
        let select = Self::new("select");
        for (label, value) in options {
            select.push_child(
                Self::new("option")
                    .matching(AnchorDescriptor::css("option"))
                    .text(*label)
                    .attr("value", *value),
            );
        }
        select
    }

    pub fn key(&self) -> &str {
        &self.inner.key
    }

    pub fn matching(self, anchor: AnchorDescriptor) -> Self {
        self.inner.state.lock().anchors.push(anchor);
        self
    }

    pub fn text(self, text: impl Into<String>) -> Self {
        self.inner.state.lock().text = text.into();
        self
    }

    pub fn attr(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.inner
            .state
            .lock()
            .attributes
            .insert(name.into(), value.into());
        self
    }

    pub fn hidden(self) -> Self {
        self.inner.state.lock().visible = false;
        self
    }

    /// `is_visible` reports false for the first `probes` calls.
    pub fn visible_after(self, probes: u32) -> Self {
        self.inner.state.lock().hidden_probes = probes;
        self
    }

    /// Page queries skip this element for the first `probes` matches.
    pub fn appears_after(self, probes: u32) -> Self {
        self.inner.state.lock().absent_probes = probes;
        self
    }

    pub fn child(self, child: ScriptedElement) -> Self {
        self.push_child(child);
        self
    }

    /// Makes `closest(selector)` answer with `container`.
    pub fn inside(self, selector: impl Into<String>, container: ScriptedElement) -> Self {
        self.inner
            .state
            .lock()
            .containers
            .push((selector.into(), container));
        self
    }

    pub fn fail_click(self, mode: ClickMode) -> Self {
        self.inner.state.lock().failing_modes.push(mode);
        self
    }

    pub fn fail_script(self) -> Self {
        self.inner.state.lock().fail_script = true;
        self
    }

    pub fn script_result(self, value: Value) -> Self {
        self.inner.state.lock().script_result = value;
        self
    }

    /// A successful click moves the page to `url`.
    pub fn navigates_to(self, url: impl Into<String>) -> Self {
        self.inner.state.lock().navigates_to = Some(url.into());
        self
    }

    /// Last value set through `fill` or `select`.
    pub fn value(&self) -> Option<String> {
        self.inner.state.lock().value.clone()
    }

    fn push_child(&self, child: ScriptedElement) {
        let page = self.inner.state.lock().page.clone();
        child.attach(page);
        self.inner.state.lock().children.push(child);
    }

    fn attach(&self, page: Weak<Mutex<PageState>>) {
        let children = {
            let mut state = self.inner.state.lock();
            state.page = page.clone();
            state.children.clone()
        };
        for child in children {
            child.attach(page.clone());
        }
    }

    fn flatten_into(&self, out: &mut Vec<ScriptedElement>) {
        out.push(self.clone());
        let children = self.inner.state.lock().children.clone();
        for child in children {
            child.flatten_into(out);
        }
    }

    fn descendants(&self) -> Vec<ScriptedElement> {
        let mut out = Vec::new();
        let children = self.inner.state.lock().children.clone();
        for child in children {
            child.flatten_into(&mut out);
        }
        out
    }

    fn matches(&self, anchor: &AnchorDescriptor) -> bool {
        let state = self.inner.state.lock();
        if state.anchors.contains(anchor) {
            return true;
        }
        match anchor {
            AnchorDescriptor::Text { tag, phrase } => {
                *tag == self.inner.tag && state.text.contains(phrase.as_str())
            }
            AnchorDescriptor::Attribute {
                tag,
                name,
                contains,
            } => {
                *tag == self.inner.tag
                    && state
                        .attributes
                        .get(name)
                        .map(|value| value.contains(contains.as_str()))
                        .unwrap_or(false)
            }
            AnchorDescriptor::Css(_) | AnchorDescriptor::XPath(_) => false,
        }
    }

    fn consume_presence(&self) -> bool {
        let mut state = self.inner.state.lock();
        if state.absent_probes > 0 {
            state.absent_probes -= 1;
            false
        } else {
            true
        }
    }

    fn record(&self, interaction: Interaction, follow_link: bool) {
        let (page, target) = {
            let state = self.inner.state.lock();
            (state.page.upgrade(), state.navigates_to.clone())
        };
        if let Some(page) = page {
            let mut page = page.lock();
            page.interactions.push(interaction);
            if follow_link {
                if let Some(url) = target {
                    page.url = url;
                }
            }
        }
    }
}

#[async_trait]
impl ElementHandle for ScriptedElement {
    fn key(&self) -> String {
        self.inner.key.clone()
    }

    async fn is_visible(&self) -> Result<bool, AdapterError> {
        let mut state = self.inner.state.lock();
        if state.hidden_probes > 0 {
            state.hidden_probes -= 1;
            return Ok(false);
        }
        Ok(state.visible)
    }

    async fn inner_text(&self) -> Result<String, AdapterError> {
        Ok(self.inner.state.lock().text.clone())
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, AdapterError> {
        Ok(self.inner.state.lock().attributes.get(name).cloned())
    }

    async fn click(&self, mode: ClickMode) -> Result<(), AdapterError> {
        if self.inner.state.lock().failing_modes.contains(&mode) {
            return Err(AdapterError::new(AdapterErrorKind::Internal)
                .with_hint(format!("scripted {mode:?} click failure")));
        }
        self.record(
            Interaction::Click {
                key: self.inner.key.clone(),
                mode,
            },
            true,
        );
        Ok(())
    }

    async fn fill(&self, text: &str) -> Result<(), AdapterError> {
        self.inner.state.lock().value = Some(text.to_string());
        self.record(
            Interaction::Fill {
                key: self.inner.key.clone(),
                text: text.to_string(),
            },
            false,
        );
        Ok(())
    }

    async fn select(&self, value: &str) -> Result<(), AdapterError> {
        let known = self.descendants().iter().any(|option| {
            option.inner.tag == "option"
                && option.inner.state.lock().attributes.get("value").map(String::as_str)
                    == Some(value)
        });
        if !known {
            return Err(AdapterError::new(AdapterErrorKind::TargetNotFound)
                .with_hint(format!("option with value {value:?} not present")));
        }
        self.inner.state.lock().value = Some(value.to_string());
        self.record(
            Interaction::Select {
                key: self.inner.key.clone(),
                value: value.to_string(),
            },
            false,
        );
        Ok(())
    }

    async fn query_all(&self, anchor: &AnchorDescriptor) -> Result<Vec<ElementRef>, AdapterError> {
        Ok(present_matches(self.descendants(), anchor))
    }

    async fn closest(&self, selector: &str) -> Result<Option<ElementRef>, AdapterError> {
        let state = self.inner.state.lock();
        Ok(state
            .containers
            .iter()
            .find(|(candidate, _)| candidate == selector)
            .map(|(_, container)| Arc::new(container.clone()) as ElementRef))
    }

    async fn call_js(&self, function: &str) -> Result<Value, AdapterError> {
        let (fail, result) = {
            let state = self.inner.state.lock();
            (state.fail_script, state.script_result.clone())
        };
        if fail {
            return Err(AdapterError::new(AdapterErrorKind::Script)
                .with_hint("scripted script failure"));
        }
        if function.contains("this.click()") {
            self.record(Interaction::ScriptClick { key: self.inner.key.clone() }, true);
            return Ok(Value::Bool(true));
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn text_descriptor_matches_tag_and_phrase() {
        let page = ScriptedPage::new();
        page.add(ScriptedElement::new("button").text("次へ進む"));
        page.add(ScriptedElement::new("a").text("次へ"));

        let found = page
            .query_all(&AnchorDescriptor::text("button", "次へ"))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].inner_text().await.unwrap(), "次へ進む");
    }

    #[tokio::test]
    async fn delayed_element_appears_after_probes() {
        let page = ScriptedPage::new();
        let anchor = AnchorDescriptor::css("#late");
        page.add(
            ScriptedElement::new("div")
                .matching(anchor.clone())
                .appears_after(2),
        );

        assert!(page.query(&anchor).await.unwrap().is_none());
        assert!(page.query(&anchor).await.unwrap().is_none());
        assert!(page.query(&anchor).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn click_follows_link_and_records() {
        let page = ScriptedPage::new();
        let link = page.add(ScriptedElement::new("a").navigates_to("https://example.test/next"));

        link.click(ClickMode::Normal).await.unwrap();
        assert_eq!(page.url(), "https://example.test/next");
        assert!(page.was_clicked(&link));
    }

    #[tokio::test]
    async fn select_rejects_unknown_value() {
        let page = ScriptedPage::new();
        let select = page.add(ScriptedElement::select_with_options(&[("A", "a"), ("B", "b")]));

        assert!(select.select("c").await.is_err());
        select.select("b").await.unwrap();
        assert_eq!(select.value().as_deref(), Some("b"));
    }
}
