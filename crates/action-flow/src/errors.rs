//! Flow execution error types

use action_primitives::ActionError;
use cdp_adapter::AdapterError;
use pageflow_core_types::WorkflowInputError;
use thiserror::Error;

/// Flow execution errors
///
/// Everything raised inside a step is rendered into that step's `error`
/// string; only `MalformedInput` and `Setup` escape a run.
#[derive(Debug, Error)]
pub enum FlowError {
    /// Workflow could not be decoded
    #[error("Malformed workflow: {0}")]
    MalformedInput(String),

    /// No login signal before the step's login timeout
    #[error("Login timeout")]
    LoginTimeout,

    /// The network gateway's block page never cleared
    #[error("Zscaler auth failed")]
    GatewayAuthFailed,

    /// Action primitive error
    #[error(transparent)]
    Action(#[from] ActionError),

    /// Page controller or session error
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    /// Output directory or session could not be prepared
    #[error("Setup failed: {0}")]
    Setup(String),
}

impl From<WorkflowInputError> for FlowError {
    fn from(err: WorkflowInputError) -> Self {
        FlowError::MalformedInput(err.to_string())
    }
}
