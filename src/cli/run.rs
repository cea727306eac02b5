use std::path::{Path, PathBuf};
use std::sync::Arc;

use action_flow::WorkflowProcessor;
use action_primitives::ActionRegistry;
use anyhow::{Context, Result};
use auth_gate::AuthGate;
use cdp_adapter::ChromiumLauncher;
use clap::Args;
use pageflow_core_types::{is_truthy, parse_workflow, WorkflowResult, WorkflowStep};
use tracing::info;

use super::output;
use crate::config::Config;
use crate::errors::CliError;

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Workflow as a JSON array of step objects
    #[arg(
        long,
        value_name = "JSON",
        required_unless_present = "workflow_file",
        conflicts_with = "workflow_file"
    )]
    pub workflow: Option<String>,

    /// Read the workflow JSON from a file instead
    #[arg(long, value_name = "PATH")]
    pub workflow_file: Option<PathBuf>,

    /// Directory for extracted text and downloads
    #[arg(long, value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Run without a window (1/true/yes/on)
    #[arg(long, value_name = "BOOL", default_value = "false")]
    pub headless: String,
}

pub async fn cmd_run(args: RunArgs, config: &Config) -> Result<bool> {
    let raw = match (&args.workflow, &args.workflow_file) {
        (Some(raw), _) => raw.clone(),
        (None, Some(path)) => {
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| CliError::InputFile {
                    path: path.clone(),
                    source,
                })?
        }
        (None, None) => "[]".to_string(),
    };
    let steps = parse_workflow(&raw).map_err(CliError::from)?;
    let output_dir = prepare_output_dir(&args.output_dir)?;

    let result = execute_workflow(config, &steps, &output_dir, is_truthy(&args.headless)).await?;
    output::emit(&output::verdict(&result));
    Ok(result.success)
}

/// Creates the directory and returns it as an absolute path.
pub(crate) fn prepare_output_dir(path: &Path) -> Result<PathBuf, CliError> {
    let io_err = |source| CliError::OutputDir {
        path: path.to_path_buf(),
        source,
    };
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().map_err(io_err)?.join(path)
    };
    std::fs::create_dir_all(&absolute).map_err(io_err)?;
    Ok(absolute)
}

/// One Chromium session for the whole workflow, configured from `config`.
pub(crate) async fn execute_workflow(
    config: &Config,
    steps: &[WorkflowStep],
    output_dir: &Path,
    headless: bool,
) -> Result<WorkflowResult> {
    let registry = Arc::new(ActionRegistry::with_builtins(config.tempo.clone()));
    let processor = WorkflowProcessor::new(registry, output_dir)
        .with_auth(AuthGate::new(config.site.clone()))
        .with_pacing(config.pacing.clone());
    let session = config.session_config(output_dir, headless);

    info!(
        steps = steps.len(),
        output = %output_dir.display(),
        headless,
        "Running workflow"
    );
    processor
        .run(&ChromiumLauncher, &session, steps)
        .await
        .context("Browser session failed")
}
