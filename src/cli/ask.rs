use std::path::PathBuf;

use action_flow::templates::{
    chat_round_trip, latest_response_file, response_file_name, DEFAULT_CHAT_URL,
    RESPONSE_FILE_PREFIX,
};
use anyhow::Result;
use chrono::Local;
use clap::Args;
use pageflow_core_types::is_truthy;
use serde_json::Value;
use tracing::{info, warn};

use super::output;
use super::run::{execute_workflow, prepare_output_dir};
use crate::config::Config;
use crate::errors::CliError;

#[derive(Args, Clone, Debug)]
pub struct AskArgs {
    /// Prompt text to send
    #[arg(
        long,
        value_name = "TEXT",
        required_unless_present = "prompt_file",
        conflicts_with = "prompt_file"
    )]
    pub prompt: Option<String>,

    /// Read the prompt from a file instead
    #[arg(long, value_name = "PATH")]
    pub prompt_file: Option<PathBuf>,

    /// Directory the response file is written to
    #[arg(long, value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Run without a window (1/true/yes/on)
    #[arg(long, value_name = "BOOL", default_value = "false")]
    pub headless: String,

    /// Chat application URL
    #[arg(long, default_value = DEFAULT_CHAT_URL)]
    pub url: String,
}

pub async fn cmd_ask(args: AskArgs, config: &Config) -> Result<bool> {
    let prompt = match (&args.prompt, &args.prompt_file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => {
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| CliError::InputFile {
                    path: path.clone(),
                    source,
                })?
        }
        (None, None) => String::new(),
    };
    if prompt.trim().is_empty() {
        return Err(CliError::EmptyPrompt.into());
    }

    let output_dir = prepare_output_dir(&args.output_dir)?;
    let save_as = response_file_name(Local::now());
    let steps = chat_round_trip(&args.url, &prompt, &save_as);

    let result = execute_workflow(config, &steps, &output_dir, is_truthy(&args.headless)).await?;

    let mut verdict = output::verdict(&result);
    match latest_response_file(&output_dir, RESPONSE_FILE_PREFIX) {
        Ok(Some(path)) => {
            info!("Latest response: {}", path.display());
            if let Value::Object(map) = &mut verdict {
                map.insert(
                    "response_file".to_string(),
                    Value::String(path.display().to_string()),
                );
            }
        }
        Ok(None) => warn!("No response file written"),
        Err(err) => warn!(?err, "cannot scan output directory"),
    }
    output::emit(&verdict);
    Ok(result.success)
}
