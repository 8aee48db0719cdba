//! Candidate resolution

use std::sync::Arc;

use cdp_adapter::{AdapterError, ElementRef};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, instrument, warn};

use crate::errors::LocatorError;
use crate::matchers::Matcher;
use crate::types::{CandidateList, ResolveOptions, Resolved, Scope};

/// Tries each candidate exactly once, in order.
///
/// Steps:
/// 1. Probe the candidate until it yields an element (visible, when
///    required) or its `timeout_per_candidate` runs out.
/// 2. On a hit, return it; later candidates are never consulted.
/// 3. Transport failures abort the whole call; any other adapter error
///    only disqualifies the current candidate.
#[instrument(skip_all, fields(list = %candidates.label(), count = candidates.len()))]
pub async fn resolve(
    scope: Scope<'_>,
    candidates: &CandidateList,
    options: &ResolveOptions,
) -> Result<Option<Resolved>, LocatorError> {
    if candidates.is_empty() {
        return Err(LocatorError::EmptyCandidates(candidates.label().to_string()));
    }

    for (index, matcher) in candidates.matchers().iter().enumerate() {
        debug!(candidate = %matcher, index, "probing candidate");
        match probe(scope, matcher, options).await {
            Ok(Some(element)) => {
                info!(candidate = %matcher, index, "resolved {}", candidates.label());
                return Ok(Some(Resolved {
                    element,
                    candidate_index: index,
                    matcher: matcher.to_string(),
                }));
            }
            Ok(None) => {
                debug!(candidate = %matcher, index, "candidate did not match");
            }
            Err(err) if err.is_transport() => {
                return Err(LocatorError::Transport {
                    list: candidates.label().to_string(),
                    source: err,
                });
            }
            Err(err) => {
                warn!(candidate = %matcher, index, %err, "candidate lookup failed");
            }
        }
    }

    debug!("no candidate matched {}", candidates.label());
    Ok(None)
}

async fn probe(
    scope: Scope<'_>,
    matcher: &Arc<dyn Matcher>,
    options: &ResolveOptions,
) -> Result<Option<ElementRef>, AdapterError> {
    let started = Instant::now();
    loop {
        for element in matcher.locate(scope).await? {
            if !options.require_visible || visible(&element).await {
                return Ok(Some(element));
            }
        }

        let elapsed = started.elapsed();
        if elapsed >= options.timeout_per_candidate {
            return Ok(None);
        }
        let remaining = options.timeout_per_candidate - elapsed;
        sleep(options.poll_interval.min(remaining)).await;
    }
}

async fn visible(element: &ElementRef) -> bool {
    match element.is_visible().await {
        Ok(flag) => flag,
        Err(err) => {
            debug!(element = %element.key(), %err, "visibility probe failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cdp_adapter::scripted::{ScriptedElement, ScriptedPage};
    use std::time::Duration;
    use ticketpilot_core_types::AnchorDescriptor;
    use tokio_test::assert_ok;

    fn opts(ms: u64) -> ResolveOptions {
        ResolveOptions::new(Duration::from_millis(ms))
    }

    #[tokio::test(start_paused = true)]
    async fn earlier_candidate_wins_even_when_slower() {
        let page = ScriptedPage::new();
        let slow = page.add(
            ScriptedElement::new("button")
                .matching(AnchorDescriptor::css("#slow"))
                .appears_after(3),
        );
        page.add(ScriptedElement::new("button").matching(AnchorDescriptor::css("#fast")));

        let list = CandidateList::from_anchors(
            "next",
            [AnchorDescriptor::css("#slow"), AnchorDescriptor::css("#fast")],
        );
        let resolved = assert_ok!(resolve(Scope::Page(&page), &list, &opts(1_000)).await)
            .expect("slow candidate resolves within its budget");
        assert_eq!(resolved.candidate_index, 0);
        assert_eq!(resolved.element.key(), slow.key());
    }

    #[tokio::test(start_paused = true)]
    async fn candidate_past_its_budget_yields_to_next() {
        let page = ScriptedPage::new();
        page.add(
            ScriptedElement::new("button")
                .matching(AnchorDescriptor::css("#late"))
                .appears_after(1_000),
        );
        let fallback =
            page.add(ScriptedElement::new("button").matching(AnchorDescriptor::css("#fallback")));

        let list = CandidateList::from_anchors(
            "next",
            [AnchorDescriptor::css("#late"), AnchorDescriptor::css("#fallback")],
        );
        let resolved = resolve(Scope::Page(&page), &list, &opts(500))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.candidate_index, 1);
        assert_eq!(resolved.element.key(), fallback.key());
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_list_is_none_not_error() {
        let page = ScriptedPage::new();
        let list = CandidateList::from_anchors(
            "missing",
            [AnchorDescriptor::css("#a"), AnchorDescriptor::text("a", "次へ")],
        );
        let outcome = resolve(Scope::Page(&page), &list, &opts(200)).await;
        assert!(matches!(outcome, Ok(None)));
    }

    #[tokio::test]
    async fn zero_budget_probes_once() {
        let page = ScriptedPage::new();
        page.add(
            ScriptedElement::new("div")
                .matching(AnchorDescriptor::css("#x"))
                .appears_after(1),
        );
        let list = CandidateList::from_anchors("x", [AnchorDescriptor::css("#x")]);
        assert!(resolve(Scope::Page(&page), &list, &opts(0))
            .await
            .unwrap()
            .is_none());
        assert!(resolve(Scope::Page(&page), &list, &opts(0))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn resolving_twice_returns_same_element() {
        let page = ScriptedPage::new();
        page.add(ScriptedElement::new("a").text("ログイン"));
        page.add(ScriptedElement::new("a").text("ログインはこちら"));

        let list = CandidateList::from_anchors("login", [AnchorDescriptor::text("a", "ログイン")]);
        let first = resolve(Scope::Page(&page), &list, &opts(0)).await.unwrap().unwrap();
        let second = resolve(Scope::Page(&page), &list, &opts(0)).await.unwrap().unwrap();
        assert_eq!(first.element.key(), second.element.key());
    }

    #[tokio::test(start_paused = true)]
    async fn hidden_elements_need_opt_in() {
        let page = ScriptedPage::new();
        let hidden = page.add(
            ScriptedElement::new("input")
                .matching(AnchorDescriptor::css("input[name='login_id']"))
                .hidden(),
        );
        let list =
            CandidateList::from_anchors("email", [AnchorDescriptor::css("input[name='login_id']")]);

        assert!(resolve(Scope::Page(&page), &list, &opts(300))
            .await
            .unwrap()
            .is_none());
        let found = resolve(Scope::Page(&page), &list, &opts(0).allow_hidden())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.element.key(), hidden.key());
    }

    #[tokio::test]
    async fn scoped_resolution_stays_inside_container() {
        let page = ScriptedPage::new();
        page.add(ScriptedElement::new("button").text("次へ"));
        let inner = ScriptedElement::new("button").text("次へ");
        let container = page.add(ScriptedElement::new("li").child(inner.clone()));

        let list = CandidateList::from_anchors("next", [AnchorDescriptor::text("button", "次へ")]);
        let found = resolve(Scope::Within(&container), &list, &opts(0))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.element.key(), inner.key());
    }

    #[tokio::test]
    async fn transport_failure_propagates() {
        #[derive(Debug)]
        struct Broken;

        impl std::fmt::Display for Broken {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("broken")
            }
        }

        #[async_trait]
        impl Matcher for Broken {
            async fn locate(&self, _scope: Scope<'_>) -> Result<Vec<ElementRef>, AdapterError> {
                Err(AdapterError::new(cdp_adapter::AdapterErrorKind::CdpIo))
            }
        }

        let page = ScriptedPage::new();
        let list = CandidateList::new("broken").with_matcher(Arc::new(Broken));
        let outcome = resolve(Scope::Page(&page), &list, &opts(0)).await;
        assert!(matches!(outcome, Err(LocatorError::Transport { .. })));
    }

    #[tokio::test]
    async fn empty_list_is_rejected() {
        let page = ScriptedPage::new();
        let outcome = resolve(Scope::Page(&page), &CandidateList::new("none"), &opts(0)).await;
        assert!(matches!(outcome, Err(LocatorError::EmptyCandidates(_))));
    }
}
