//! Click primitive - resolve by selector list or visible text, then click

use std::time::Duration;

use async_trait::async_trait;
use cdp_adapter::{poll_until, ElementQuery, PageController, PollPolicy, Probe};
use pageflow_core_types::StepParams;
use tracing::{debug, info, warn};

use super::{css_candidates, find_first, pause};
use crate::errors::ActionError;
use crate::registry::ActionHandler;
use crate::types::{ActionReport, Tempo};

const SELECTOR_TIMEOUT: Duration = Duration::from_secs(3);
const TEXT_TIMEOUT: Duration = Duration::from_secs(5);
const INTERACTABLE_WAIT: PollPolicy =
    PollPolicy::new(Duration::from_millis(500), Duration::from_secs(10));

/// `click` / `press`.
///
/// Steps:
/// 1. Try each comma-separated selector from `submit_button` (or `selector`)
/// 2. Fall back to visible text from `submit_text` (or `text`)
/// 3. Scroll into view and wait until interactable
/// 4. Click and let the page settle
pub struct ClickAction {
    tempo: Tempo,
}

impl ClickAction {
    pub fn new(tempo: Tempo) -> Self {
        Self { tempo }
    }
}

#[async_trait]
impl ActionHandler for ClickAction {
    async fn run(
        &self,
        page: &dyn PageController,
        params: &StepParams,
    ) -> Result<ActionReport, ActionError> {
        let mut candidates = params
            .first_str(&["submit_button", "selector"])
            .map(|selectors| css_candidates(selectors, SELECTOR_TIMEOUT))
            .unwrap_or_default();
        if let Some(text) = params.first_str(&["submit_text", "text"]) {
            candidates.push((ElementQuery::Text(text.to_string()), TEXT_TIMEOUT));
        }

        let button = find_first(page, &candidates)
            .await?
            .ok_or_else(|| ActionError::ElementNotFound("Button not found".into()))?;
        info!(element = %button, "Clicking");

        page.scroll_into_view(&button).await?;
        let button_ref = &button;
        let ready = poll_until(INTERACTABLE_WAIT, move || async move {
            match page.is_interactable(button_ref).await {
                Ok(true) => Probe::Ready(()),
                Ok(false) => Probe::Pending,
                Err(err) => {
                    debug!(?err, "interactable probe failed");
                    Probe::Pending
                }
            }
        })
        .await;
        if ready.is_none() {
            warn!(element = %button, "element never became interactable");
            return Err(ActionError::Timeout("Button not interactable".into()));
        }

        page.click(&button).await?;
        pause(self.tempo.click_settle).await;
        Ok(ActionReport::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdp_adapter::testing::{PageCall, ScriptedPage};
    use serde_json::json;

    fn params(value: serde_json::Value) -> StepParams {
        StepParams::new(value.as_object().cloned().unwrap())
    }

    #[tokio::test]
    async fn tries_selectors_in_order() {
        let page = ScriptedPage::new();
        let second = ElementQuery::Css("[data-testid=\"send-button\"]".into());
        page.set_element(second.clone(), true);

        ClickAction::new(Tempo::immediate())
            .run(
                &page,
                &params(json!({"submit_button": "#missing, [data-testid=\"send-button\"]"})),
            )
            .await
            .unwrap();

        let calls = page.calls();
        assert_eq!(calls[0], PageCall::Find(ElementQuery::Css("#missing".into())));
        assert!(calls.ends_with(&[PageCall::ScrollIntoView(second.clone()), PageCall::Click(second)]));
    }

    #[tokio::test]
    async fn falls_back_to_visible_text() {
        let page = ScriptedPage::new();
        page.set_element(ElementQuery::Text("Send".into()), true);
        ClickAction::new(Tempo::immediate())
            .run(&page, &params(json!({"selector": "#nope", "submit_text": "Send"})))
            .await
            .unwrap();
        assert!(page
            .calls()
            .contains(&PageCall::Click(ElementQuery::Text("Send".into()))));
    }

    #[tokio::test]
    async fn missing_button_is_reported() {
        let page = ScriptedPage::new();
        let err = ClickAction::new(Tempo::immediate())
            .run(&page, &params(json!({"submit_button": "#go"})))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Button not found");
    }

    #[tokio::test(start_paused = true)]
    async fn never_interactable_times_out_without_clicking() {
        let page = ScriptedPage::new();
        page.set_element(ElementQuery::Css("#go".into()), true);
        page.set_interactable(false);
        let started = tokio::time::Instant::now();

        let err = ClickAction::new(Tempo::immediate())
            .run(&page, &params(json!({"submit_button": "#go"})))
            .await
            .unwrap_err();

        assert!(matches!(err, ActionError::Timeout(_)));
        assert_eq!(started.elapsed(), Duration::from_secs(10));
        assert!(!page
            .calls()
            .iter()
            .any(|call| matches!(call, PageCall::Click(_))));
    }
}
