use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    pageflow_cli::cli::app::run().await
}
