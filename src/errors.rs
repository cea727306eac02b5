//! Error handling module

use std::path::PathBuf;

use pageflow_core_types::WorkflowInputError;
use thiserror::Error;

/// Failures that stop a command before any step runs.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    MalformedWorkflow(#[from] WorkflowInputError),

    #[error("cannot read {}: {source}", path.display())]
    InputFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot create output directory {}: {source}", path.display())]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("prompt is empty")]
    EmptyPrompt,
}
