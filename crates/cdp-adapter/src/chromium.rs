//! [`PageDriver`] over a chromiumoxide page.
//!
//! Text and XPath descriptors have no native query in CDP, so they are
//! evaluated in-page: matches get a one-off marker attribute, are collected
//! with a CSS query, then unmarked.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::layout::Point;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use serde_json::Value;
use ticketpilot_core_types::AnchorDescriptor;
use tokio::time::timeout;
use tracing::debug;
use uuid::Uuid;

use crate::driver::{ClickMode, ElementHandle, ElementRef, Navigation, PageDriver};
use crate::error::{AdapterError, AdapterErrorKind};

const MARK_ATTR: &str = "data-tp-mark";

const VISIBLE_FN: &str = r#"function() {
    if (!this.isConnected) return false;
    const style = window.getComputedStyle(this);
    if (style.visibility === 'hidden' || style.display === 'none') return false;
    const rect = this.getBoundingClientRect();
    return rect.width > 0 && rect.height > 0;
}"#;

const CENTER_FN: &str = r#"function() {
    const rect = this.getBoundingClientRect();
    return JSON.stringify({ x: rect.left + rect.width / 2, y: rect.top + rect.height / 2 });
}"#;

const NAV_STATUS_JS: &str = r#"(() => {
    const entry = performance.getEntriesByType('navigation')[0];
    return entry && entry.responseStatus ? entry.responseStatus : null;
})()"#;

fn cdp_error(op: &str, err: CdpError) -> AdapterError {
    let kind = match &err {
        CdpError::JavascriptException(_) => AdapterErrorKind::Script,
        CdpError::Timeout => AdapterErrorKind::NavTimeout,
        _ => AdapterErrorKind::CdpIo,
    };
    AdapterError::new(kind).with_hint(format!("{op}: {err}"))
}

fn js_string(raw: &str) -> String {
    serde_json::to_string(raw).unwrap_or_else(|_| "\"\"".to_string())
}

async fn bounded<T, F>(deadline: Duration, op: &str, fut: F) -> Result<T, AdapterError>
where
    F: Future<Output = Result<T, CdpError>>,
{
    match timeout(deadline, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(cdp_error(op, err)),
        Err(_) => Err(AdapterError::timed_out(op)),
    }
}

/// In-page collector that marks matches of a text or XPath descriptor.
/// `root` is the JS expression of the search root.
fn marking_script(anchor: &AnchorDescriptor, root: &str, token: &str) -> Option<String> {
    let collect = match anchor {
        AnchorDescriptor::Text { tag, phrase } => format!(
            "Array.from(({root}).querySelectorAll({tag})).filter(el => ((el.innerText || el.textContent || '')).includes({phrase}))",
            tag = js_string(tag),
            phrase = js_string(phrase),
        ),
        AnchorDescriptor::XPath(expr) => format!(
            "(() => {{ const snap = document.evaluate({expr}, {root}, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); const out = []; for (let i = 0; i < snap.snapshotLength; i++) {{ const node = snap.snapshotItem(i); if (node.nodeType === 1) out.push(node); }} return out; }})()",
            expr = js_string(expr),
        ),
        AnchorDescriptor::Css(_) | AnchorDescriptor::Attribute { .. } => return None,
    };
    Some(format!(
        "const found = {collect}; found.forEach(el => el.setAttribute({attr}, {token})); return found.length;",
        attr = js_string(MARK_ATTR),
        token = js_string(token),
    ))
}

fn marker_selector(token: &str) -> String {
    format!("[{MARK_ATTR}=\"{token}\"]")
}

fn unmark_script(token: &str) -> String {
    format!(
        "document.querySelectorAll({sel}).forEach(el => el.removeAttribute({attr}))",
        sel = js_string(&marker_selector(token)),
        attr = js_string(MARK_ATTR),
    )
}

#[derive(Clone)]
pub struct ChromiumPage {
    page: Page,
    deadline: Duration,
}

impl ChromiumPage {
    pub fn new(page: Page, deadline: Duration) -> Self {
        Self { page, deadline }
    }

    pub fn inner(&self) -> &Page {
        &self.page
    }

    fn wrap(&self, elements: Vec<Element>) -> Vec<ElementRef> {
        elements
            .into_iter()
            .map(|element| {
                Arc::new(ChromiumElement {
                    page: self.clone(),
                    element,
                }) as ElementRef
            })
            .collect()
    }

    async fn find_css(&self, selector: &str) -> Result<Vec<ElementRef>, AdapterError> {
        let found = bounded(self.deadline, "find_elements", self.page.find_elements(selector)).await?;
        Ok(self.wrap(found))
    }

    async fn eval_value(&self, op: &str, script: String) -> Result<Value, AdapterError> {
        let result = bounded(self.deadline, op, self.page.evaluate(script)).await?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    /// Collects elements marked by `token`, then removes the marks.
    async fn take_marked(&self, token: &str) -> Result<Vec<ElementRef>, AdapterError> {
        let found = self.find_css(&marker_selector(token)).await?;
        if let Err(err) = self.eval_value("unmark", unmark_script(token)).await {
            debug!(?err, "failed to clear query markers");
        }
        Ok(found)
    }
}

#[async_trait]
impl PageDriver for ChromiumPage {
    async fn navigate(&self, url: &str) -> Result<Navigation, AdapterError> {
        match timeout(self.deadline, self.page.goto(url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => {
                return Err(AdapterError::new(AdapterErrorKind::NavFailed)
                    .with_hint(format!("goto {url}: {err}")))
            }
            Err(_) => return Err(AdapterError::timed_out("navigate")),
        }
        let status = self
            .eval_value("navigation status", NAV_STATUS_JS.to_string())
            .await
            .ok()
            .and_then(|value| value.as_u64())
            .and_then(|status| u16::try_from(status).ok());
        let url = self.current_url().await.unwrap_or_else(|_| url.to_string());
        Ok(Navigation { url, status })
    }

    async fn query_all(&self, anchor: &AnchorDescriptor) -> Result<Vec<ElementRef>, AdapterError> {
        if let Some(css) = anchor.to_css() {
            return self.find_css(&css).await;
        }
        let token = Uuid::new_v4().simple().to_string();
        let Some(body) = marking_script(anchor, "document", &token) else {
            return Ok(Vec::new());
        };
        self.eval_value("mark", format!("(() => {{ {body} }})()"))
            .await?;
        self.take_marked(&token).await
    }

    async fn evaluate(&self, script: &str) -> Result<Value, AdapterError> {
        self.eval_value("evaluate", script.to_string()).await
    }

    async fn current_url(&self) -> Result<String, AdapterError> {
        let url = bounded(self.deadline, "url", self.page.url()).await?;
        Ok(url.unwrap_or_default())
    }

    async fn capture_snapshot(&self, path: &Path) -> Result<(), AdapterError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|err| {
                AdapterError::new(AdapterErrorKind::Io).with_hint(err.to_string())
            })?;
        }
        let params = ScreenshotParams::builder().full_page(true).build();
        bounded(
            self.deadline,
            "screenshot",
            self.page.save_screenshot(params, path),
        )
        .await?;
        Ok(())
    }
}

pub struct ChromiumElement {
    page: ChromiumPage,
    element: Element,
}

impl std::fmt::Debug for ChromiumElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromiumElement")
            .field("backend_node_id", &self.element.backend_node_id)
            .finish()
    }
}

impl ChromiumElement {
    async fn call(&self, op: &str, function: String) -> Result<Value, AdapterError> {
        let returns = bounded(
            self.page.deadline,
            op,
            self.element.call_js_fn(function, false),
        )
        .await?;
        if let Some(details) = returns.exception_details {
            return Err(AdapterError::new(AdapterErrorKind::Script)
                .with_hint(format!("{op}: {}", details.text)));
        }
        Ok(returns.result.value.unwrap_or(Value::Null))
    }
}

#[async_trait]
impl ElementHandle for ChromiumElement {
    fn key(&self) -> String {
        format!("{:?}", self.element.backend_node_id)
    }

    async fn is_visible(&self) -> Result<bool, AdapterError> {
        let value = self.call("is_visible", VISIBLE_FN.to_string()).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn inner_text(&self) -> Result<String, AdapterError> {
        let text = bounded(self.page.deadline, "inner_text", self.element.inner_text()).await?;
        Ok(text.unwrap_or_default())
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, AdapterError> {
        bounded(self.page.deadline, "attribute", self.element.attribute(name)).await
    }

    async fn click(&self, mode: ClickMode) -> Result<(), AdapterError> {
        match mode {
            ClickMode::Normal => {
                bounded(self.page.deadline, "click", self.element.click()).await?;
            }
            ClickMode::Forced => {
                let raw = self.call("box centre", CENTER_FN.to_string()).await?;
                let centre: Value = raw
                    .as_str()
                    .and_then(|text| serde_json::from_str(text).ok())
                    .unwrap_or(Value::Null);
                let (Some(x), Some(y)) = (centre["x"].as_f64(), centre["y"].as_f64()) else {
                    return Err(AdapterError::new(AdapterErrorKind::TargetNotFound)
                        .with_hint("element has no layout box"));
                };
                bounded(
                    self.page.deadline,
                    "forced click",
                    self.page.page.click(Point { x, y }),
                )
                .await?;
            }
        }
        Ok(())
    }

    async fn fill(&self, text: &str) -> Result<(), AdapterError> {
        self.call(
            "clear",
            "function() { this.focus(); this.value = ''; this.dispatchEvent(new Event('input', { bubbles: true })); return true; }".to_string(),
        )
        .await?;
        bounded(self.page.deadline, "type", self.element.type_str(text)).await?;
        self.call(
            "commit",
            "function() { this.dispatchEvent(new Event('change', { bubbles: true })); return true; }".to_string(),
        )
        .await?;
        Ok(())
    }

    async fn select(&self, value: &str) -> Result<(), AdapterError> {
        let function = format!(
            "function() {{ const v = {value}; const opt = Array.from(this.options || []).find(o => o.value === v); if (!opt) return false; this.value = v; this.dispatchEvent(new Event('input', {{ bubbles: true }})); this.dispatchEvent(new Event('change', {{ bubbles: true }})); return true; }}",
            value = js_string(value),
        );
        let applied = self.call("select", function).await?;
        if applied.as_bool() == Some(true) {
            Ok(())
        } else {
            Err(AdapterError::new(AdapterErrorKind::TargetNotFound)
                .with_hint(format!("option with value {value:?} not present")))
        }
    }

    async fn query_all(&self, anchor: &AnchorDescriptor) -> Result<Vec<ElementRef>, AdapterError> {
        if let Some(css) = anchor.to_css() {
            let found =
                bounded(self.page.deadline, "find_elements", self.element.find_elements(css))
                    .await?;
            return Ok(self.page.wrap(found));
        }
        let token = Uuid::new_v4().simple().to_string();
        let Some(body) = marking_script(anchor, "this", &token) else {
            return Ok(Vec::new());
        };
        self.call("mark", format!("function() {{ {body} }}")).await?;
        self.page.take_marked(&token).await
    }

    async fn closest(&self, selector: &str) -> Result<Option<ElementRef>, AdapterError> {
        let token = Uuid::new_v4().simple().to_string();
        let function = format!(
            "function() {{ const found = this.closest({sel}); if (!found) return false; found.setAttribute({attr}, {token}); return true; }}",
            sel = js_string(selector),
            attr = js_string(MARK_ATTR),
            token = js_string(&token),
        );
        let marked = self.call("closest", function).await?;
        if marked.as_bool() != Some(true) {
            return Ok(None);
        }
        Ok(self.page.take_marked(&token).await?.into_iter().next())
    }

    async fn call_js(&self, function: &str) -> Result<Value, AdapterError> {
        self.call("call_js", function.to_string()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marking_script_escapes_phrase() {
        let anchor = AnchorDescriptor::text("button", "次へ \"now\"");
        let script = marking_script(&anchor, "document", "tok").unwrap();
        assert!(script.contains("querySelectorAll(\"button\")"));
        assert!(script.contains("\\\"now\\\""));
        assert!(script.contains("data-tp-mark"));
    }

    #[test]
    fn css_descriptors_are_not_marked() {
        assert!(marking_script(&AnchorDescriptor::css("select"), "document", "t").is_none());
        assert!(marking_script(
            &AnchorDescriptor::attribute("select", "name", "seat"),
            "this",
            "t"
        )
        .is_none());
    }

    #[test]
    fn xpath_script_uses_root() {
        let anchor = AnchorDescriptor::xpath("//tr[.//th]//select");
        let script = marking_script(&anchor, "this", "tok").unwrap();
        assert!(script.contains("document.evaluate(\"//tr[.//th]//select\", this"));
    }
}
