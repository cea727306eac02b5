//! Workflow processor

use std::path::{Path, PathBuf};
use std::sync::Arc;

use action_primitives::{ActionReport, ActionRegistry};
use auth_gate::{AuthGate, LoginWait};
use cdp_adapter::{with_session, PageController, ScriptBridge, SessionConfig, SessionLauncher};
use pageflow_core_types::{RunId, StepParams, StepResult, WorkflowResult, WorkflowStep};
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use crate::errors::FlowError;
use crate::types::Pacing;

/// Executes workflows step by step against one page.
///
/// Per step: navigate and settle, clear the gateway if it blocks, wait for
/// login when asked, move on to `target_url`, then dispatch by step type.
/// Steps never run concurrently and the first failure ends the run.
pub struct WorkflowProcessor {
    registry: Arc<ActionRegistry>,
    auth: AuthGate,
    pacing: Pacing,
    output_dir: PathBuf,
}

impl WorkflowProcessor {
    /// Create a processor that persists artifacts under `output_dir`
    pub fn new(registry: Arc<ActionRegistry>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            auth: AuthGate::default(),
            pacing: Pacing::default(),
            output_dir: output_dir.into(),
        }
    }

    pub fn with_auth(mut self, auth: AuthGate) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    /// Launch a session, run `steps` on its page, and tear the session down.
    ///
    /// Only session setup failures come back as `Err`; step failures are
    /// recorded in the returned result.
    pub async fn run(
        &self,
        launcher: &dyn SessionLauncher,
        config: &SessionConfig,
        steps: &[WorkflowStep],
    ) -> Result<WorkflowResult, FlowError> {
        let run_id = RunId::new();
        info!(run = %run_id, steps = steps.len(), "Starting workflow");

        let result = with_session(launcher, config, |page| async move {
            self.execute(page.as_ref(), steps).await
        })
        .await?;

        info!(run = %run_id, success = result.success, "=== Workflow complete ===");
        Ok(result)
    }

    /// Run `steps` in order on an already acquired page.
    pub async fn execute(&self, page: &dyn PageController, steps: &[WorkflowStep]) -> WorkflowResult {
        let mut results = Vec::with_capacity(steps.len());

        for (idx, step) in steps.iter().enumerate() {
            info!(
                "=== Step {}: {} ===",
                idx + 1,
                step.name.as_deref().unwrap_or("Unnamed")
            );

            let result = self.execute_step(page, idx, step).await;
            let succeeded = result.success;
            results.push(result);

            if !succeeded {
                break;
            }
            if idx + 1 < steps.len() {
                pause(self.pacing.inter_step()).await;
            }
        }

        WorkflowResult::from_steps(results)
    }

    /// Run one step; any error becomes the step's failure reason.
    async fn execute_step(
        &self,
        page: &dyn PageController,
        idx: usize,
        step: &WorkflowStep,
    ) -> StepResult {
        let mut result = StepResult::pending(step.display_name(idx), step.kind());
        if let Err(err) = self.run_step(page, step, &mut result).await {
            warn!("Error in step: {err}");
            result.fail(err.to_string());
        }
        result
    }

    async fn run_step(
        &self,
        page: &dyn PageController,
        step: &WorkflowStep,
        result: &mut StepResult,
    ) -> Result<(), FlowError> {
        if let Some(url) = step.url() {
            self.navigate(page, url).await?;
        }

        if step.wait_login() {
            self.wait_for_login(page, step).await?;
        }

        if let Some(target) = step.target_url() {
            info!("Navigating to target: {target}");
            page.goto(target).await?;
            pause(self.pacing.settle()).await;
        }

        self.dispatch(page, step, result).await
    }

    /// Navigate, settle, then deal with the gateway interstitial and block page.
    async fn navigate(&self, page: &dyn PageController, url: &str) -> Result<(), FlowError> {
        info!("Navigating to: {url}");
        page.goto(url).await?;
        pause(self.pacing.settle()).await;

        let current = ScriptBridge::new(page).get_url().await?;
        debug!(url = %current, "landed");
        if self.auth.profile().is_gateway_redirect(&current) {
            self.auth.target_site().submit_gateway_form(page, &current).await;
        }

        let gateway = self.auth.gateway();
        if gateway.error_present(page).await?
            && !gateway
                .wait_for_auth(page, self.pacing.gateway_timeout())
                .await
        {
            return Err(FlowError::GatewayAuthFailed);
        }
        Ok(())
    }

    /// Handler is chosen from the step's declared URL, not the landed one.
    async fn wait_for_login(
        &self,
        page: &dyn PageController,
        step: &WorkflowStep,
    ) -> Result<(), FlowError> {
        let handler = self.auth.handler_for_url(step.url().unwrap_or_default());
        let wait = LoginWait {
            timeout: step.login_timeout(self.pacing.login_timeout()),
            check_selector: step.login_check(),
            label: step.name.as_deref().unwrap_or_default(),
        };
        info!(site = ?handler.kind(), timeout_secs = wait.timeout.as_secs(), "Waiting for login");

        if handler.wait_for_login(page, &wait).await {
            Ok(())
        } else {
            Err(FlowError::LoginTimeout)
        }
    }

    async fn dispatch(
        &self,
        page: &dyn PageController,
        step: &WorkflowStep,
        result: &mut StepResult,
    ) -> Result<(), FlowError> {
        let params = self.params_for(step);

        match step.kind() {
            "navigate" => {}
            "input" => {
                self.registry.execute("input", page, &params).await?;
                if step.submit_button().is_some() {
                    self.registry.execute("click", page, &params).await?;
                }
                if step.wait_for_selector().is_some() {
                    self.registry.execute("wait_response", page, &params).await?;
                }
            }
            kind @ ("download" | "extract") => {
                let report = self.registry.execute(kind, page, &params).await?;
                merge(result, report);
            }
            other => match self.registry.execute(other, page, &params).await {
                Ok(report) => merge(result, report),
                Err(err) if err.is_unknown_action() => {
                    warn!(step_type = other, "No action registered for step type, skipping");
                    result.insert_field("skipped", true);
                }
                Err(err) => return Err(err.into()),
            },
        }

        result.succeed();
        Ok(())
    }

    fn params_for(&self, step: &WorkflowStep) -> StepParams {
        step.action_params().with_output_dir(&self.output_dir)
    }
}

fn merge(result: &mut StepResult, report: ActionReport) {
    for (key, value) in report.fields {
        result.insert_field(key, value);
    }
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_primitives::Tempo;
    use cdp_adapter::testing::{PageCall, ScriptedLauncher, ScriptedPage};
    use cdp_adapter::ElementQuery;
    use pageflow_core_types::parse_workflow;
    use serde_json::json;
    use tempfile::tempdir;
    use tokio::time::Instant;

    fn processor(dir: &Path) -> WorkflowProcessor {
        WorkflowProcessor::new(
            Arc::new(ActionRegistry::with_builtins(Tempo::immediate())),
            dir,
        )
        .with_pacing(Pacing::immediate())
    }

    fn gateway_marker() -> ElementQuery {
        ElementQuery::ClassName("error-code".into())
    }

    #[tokio::test(start_paused = true)]
    async fn gateway_block_page_is_refreshed_away() {
        let dir = tempdir().unwrap();
        let page = ScriptedPage::new();
        page.set_element_seq(gateway_marker(), vec![true, true, false]);
        let steps = parse_workflow(r#"[{"url": "https://portal.example.com/"}]"#).unwrap();

        let result = processor(dir.path()).execute(&page, &steps).await;

        assert!(result.success);
        assert_eq!(
            page.calls().iter().filter(|c| **c == PageCall::Reload).count(),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn gateway_that_never_clears_fails_the_step() {
        let dir = tempdir().unwrap();
        let page = ScriptedPage::new();
        page.set_element(gateway_marker(), true);
        let pacing = Pacing {
            gateway_timeout_secs: 10,
            ..Pacing::immediate()
        };
        let steps = parse_workflow(
            r#"[{"url": "https://portal.example.com/"}, {"type": "extract"}]"#,
        )
        .unwrap();

        let result = processor(dir.path())
            .with_pacing(pacing)
            .execute(&page, &steps)
            .await;

        assert!(!result.success);
        assert_eq!(result.steps.len(), 1);
        assert_eq!(result.last_error(), Some("Zscaler auth failed"));
        assert_eq!(page.scripts_containing("copy-turn-action-button"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn gateway_interstitial_gets_its_form_submitted() {
        let dir = tempdir().unwrap();
        let page = ScriptedPage::new();
        page.redirect("https://chatgpt.com/", "https://chat.openai.com/?_sm_nck=1");
        page.on_script("zscaler.net", "submitted");
        let steps = parse_workflow(r#"[{"url": "https://chatgpt.com/"}]"#).unwrap();

        let result = processor(dir.path()).execute(&page, &steps).await;

        assert!(result.success);
        assert_eq!(page.scripts_containing("form.submit()"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn login_timeout_uses_step_bound() {
        let dir = tempdir().unwrap();
        let page = ScriptedPage::new();
        let steps = parse_workflow(
            r##"[{"name": "Portal", "url": "https://portal.example.com/login",
                 "wait_login": true, "login_timeout": 4, "login_check": "#me"}]"##,
        )
        .unwrap();
        let started = Instant::now();

        let result = processor(dir.path()).execute(&page, &steps).await;

        assert!(!result.success);
        assert_eq!(result.steps[0].name, "Portal");
        assert_eq!(result.last_error(), Some("Login timeout"));
        assert_eq!(started.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn logged_in_target_site_then_target_url() {
        let dir = tempdir().unwrap();
        let page = ScriptedPage::new();
        page.on_script("not_logged_in", "logged_in");
        let steps = parse_workflow(
            r#"[{"url": "https://chatgpt.com/", "wait_login": true,
                 "target_url": "https://chatgpt.com/g/trading"}]"#,
        )
        .unwrap();

        let result = processor(dir.path()).execute(&page, &steps).await;

        assert!(result.success);
        let gotos: Vec<_> = page
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                PageCall::Goto(url) => Some(url),
                _ => None,
            })
            .collect();
        assert_eq!(gotos, vec!["https://chatgpt.com/", "https://chatgpt.com/g/trading"]);
    }

    #[tokio::test(start_paused = true)]
    async fn extract_fields_land_on_the_step() {
        let dir = tempdir().unwrap();
        let page = ScriptedPage::new();
        page.on_script("copy-turn-action-button", "BUY 7203 x100");
        let steps = parse_workflow(r#"[{"type": "extract", "save_as": "answer.txt"}]"#).unwrap();

        let result = processor(dir.path()).execute(&page, &steps).await;

        assert!(result.success);
        let step = &result.steps[0];
        assert_eq!(step.field("extracted_text"), Some(&json!("BUY 7203 x100")));
        assert_eq!(step.field("text_length"), Some(&json!(13)));
        let saved = std::fs::read_to_string(dir.path().join("answer.txt")).unwrap();
        assert_eq!(saved, "BUY 7203 x100");
    }

    #[tokio::test(start_paused = true)]
    async fn inter_step_pause_is_skipped_after_last_step() {
        let dir = tempdir().unwrap();
        let page = ScriptedPage::new();
        let pacing = Pacing {
            inter_step_ms: 2000,
            ..Pacing::immediate()
        };
        let steps = parse_workflow(r#"[{"type": "navigate"}, {"type": "navigate"}]"#).unwrap();
        let started = Instant::now();

        let result = processor(dir.path())
            .with_pacing(pacing)
            .execute(&page, &steps)
            .await;

        assert!(result.success);
        assert_eq!(result.steps[1].name, "Step 1");
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn run_releases_the_session() {
        let dir = tempdir().unwrap();
        let page = ScriptedPage::new();
        let launcher = ScriptedLauncher::new(page.clone());
        let config = SessionConfig::new(dir.path().join("profile"), dir.path().join("out"));
        let steps = parse_workflow(r#"[{"url": "https://example.com"}]"#).unwrap();

        let result = processor(&config.download_dir)
            .run(&launcher, &config, &steps)
            .await
            .unwrap();

        assert!(result.success);
        assert!(page.calls().ends_with(&[PageCall::Close, PageCall::Shutdown]));
    }

    #[tokio::test(start_paused = true)]
    async fn launch_failure_is_an_error_not_a_result() {
        let dir = tempdir().unwrap();
        let launcher = ScriptedLauncher::new(ScriptedPage::new()).failing_launch();
        let config = SessionConfig::new(dir.path().join("profile"), dir.path().join("out"));

        let err = processor(dir.path())
            .run(&launcher, &config, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::Adapter(_)));
    }
}
