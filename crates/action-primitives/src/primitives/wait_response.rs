//! Wait primitive - block until the busy marker clears

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use cdp_adapter::bridge::js_string;
use cdp_adapter::{poll_until, PageController, PollPolicy, Probe, ScriptBridge};
use pageflow_core_types::StepParams;
use tracing::{debug, info, warn};

use super::pause;
use crate::errors::ActionError;
use crate::registry::ActionHandler;
use crate::types::{ActionReport, Tempo};

pub const DEFAULT_BUSY_SELECTOR: &str = "[data-testid=\"stop-button\"]";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Script answering `generating` while `selector` is present, else `complete`.
pub fn busy_state_script(selector: &str) -> String {
    format!(
        "const stopBtn = document.querySelector({});\nif (stopBtn) return 'generating';\nelse return 'complete';",
        js_string(selector)
    )
}

/// `wait_response`.
///
/// Busy marker comes from `wait_for_selector` (defaults to the chat stop
/// button); the bound from `wait_timeout` seconds. Idle without any busy
/// observation counts as already complete.
pub struct WaitResponseAction {
    tempo: Tempo,
}

impl WaitResponseAction {
    pub fn new(tempo: Tempo) -> Self {
        Self { tempo }
    }
}

#[async_trait]
impl ActionHandler for WaitResponseAction {
    async fn run(
        &self,
        page: &dyn PageController,
        params: &StepParams,
    ) -> Result<ActionReport, ActionError> {
        let timeout = params.duration_secs("wait_timeout", DEFAULT_TIMEOUT);
        let selector = params
            .str("wait_for_selector")
            .filter(|raw| !raw.trim().is_empty())
            .unwrap_or(DEFAULT_BUSY_SELECTOR);
        let script = busy_state_script(selector);
        info!("Waiting for response (timeout: {}s)...", timeout.as_secs());

        let bridge = ScriptBridge::new(page);
        let seen_busy = AtomicBool::new(false);
        let (bridge, script, seen) = (&bridge, script.as_str(), &seen_busy);
        let finished = poll_until(PollPolicy::new(POLL_INTERVAL, timeout), move || async move {
            match bridge.execute(script).await.as_deref() {
                Ok("generating") => {
                    if !seen.swap(true, Ordering::SeqCst) {
                        info!("Response is generating...");
                    }
                    Probe::Pending
                }
                Ok("complete") => Probe::Ready(seen.load(Ordering::SeqCst)),
                Ok(other) => {
                    debug!(state = other, "unexpected busy state");
                    Probe::Pending
                }
                Err(err) => {
                    warn!(?err, "busy state probe failed");
                    Probe::Pending
                }
            }
        })
        .await;

        match finished {
            Some(true) => {
                info!("Response complete!");
                pause(self.tempo.response_settle).await;
                Ok(ActionReport::new())
            }
            Some(false) => {
                info!("Response ready (no generation seen)");
                Ok(ActionReport::new())
            }
            None => {
                warn!("Response wait timeout");
                Err(ActionError::Timeout("Response wait timeout".into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdp_adapter::testing::ScriptedPage;
    use serde_json::json;
    use tokio::time::Instant;

    fn params(value: serde_json::Value) -> StepParams {
        StepParams::new(value.as_object().cloned().unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn idle_without_busy_is_immediate() {
        let page = ScriptedPage::new();
        page.on_script("#spinner", "complete");
        let started = Instant::now();

        WaitResponseAction::new(Tempo::default())
            .run(&page, &params(json!({"wait_for_selector": "#spinner"})))
            .await
            .unwrap();

        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(page.scripts_containing("#spinner"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn busy_then_idle_settles() {
        let page = ScriptedPage::new();
        page.on_script_seq(
            "stop-button",
            vec![json!("generating"), json!("generating"), json!("complete")],
        );
        let started = Instant::now();

        WaitResponseAction::new(Tempo::default())
            .run(&page, &StepParams::default())
            .await
            .unwrap();

        // two busy polls, then the settle pause
        assert_eq!(started.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_busy_times_out() {
        let page = ScriptedPage::new();
        page.on_script("stop-button", "generating");
        let started = Instant::now();

        let err = WaitResponseAction::new(Tempo::immediate())
            .run(&page, &params(json!({"wait_timeout": "5"})))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Response wait timeout");
        assert_eq!(started.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn script_errors_are_retried() {
        let page = ScriptedPage::new();
        page.on_script_results(
            "stop-button",
            vec![Err("context destroyed"), Ok(json!(null)), Ok(json!("complete"))],
        );

        WaitResponseAction::new(Tempo::immediate())
            .run(&page, &StepParams::default())
            .await
            .unwrap();
        assert_eq!(page.scripts_containing("stop-button"), 3);
    }
}
