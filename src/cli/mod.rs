pub mod actions;
pub mod app;
pub mod ask;
pub mod commands;
pub mod env;
pub mod output;
pub mod run;
pub mod runtime;

pub use actions::cmd_actions;
pub use ask::{cmd_ask, AskArgs};
pub use run::{cmd_run, RunArgs};
