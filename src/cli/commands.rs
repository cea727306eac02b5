use clap::Subcommand;

use super::ask::AskArgs;
use super::run::RunArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Run a JSON workflow and print the result as JSON
    Run(RunArgs),

    /// Send one prompt to the chat application and save the answer
    Ask(AskArgs),

    /// List registered action names, aliases included
    Actions,
}
