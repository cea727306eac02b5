use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};

use super::commands::Commands;
use super::env::CliArgs;
use super::runtime::{init_logging, load_config, LoadedConfig};
use super::{cmd_actions, cmd_ask, cmd_run, output};

/// Exit status is success only when the command's workflow succeeded. Setup
/// failures still leave a `{"success": false, "error": ...}` line on stdout.
pub async fn run() -> ExitCode {
    let cli = CliArgs::parse();

    if let Err(err) = init_logging(&cli.log_level, cli.debug) {
        output::emit(&output::failure(format!("{err:#}")));
        return ExitCode::FAILURE;
    }

    info!("Starting pageflow v{}", env!("CARGO_PKG_VERSION"));

    match dispatch(&cli).await {
        Ok(true) => {
            info!("Command completed successfully");
            ExitCode::SUCCESS
        }
        Ok(false) => {
            warn!("Workflow finished with a failed step");
            ExitCode::FAILURE
        }
        Err(err) => {
            error!("Command failed: {err:#}");
            output::emit(&output::failure(format!("{err:#}")));
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(cli: &CliArgs) -> Result<bool> {
    let LoadedConfig { config, .. } = load_config(cli.config.as_ref()).await?;

    match cli.command.clone() {
        Commands::Run(args) => cmd_run(args, &config).await,
        Commands::Ask(args) => cmd_ask(args, &config).await,
        Commands::Actions => cmd_actions(&config),
    }
}
