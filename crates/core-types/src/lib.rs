//! Shared primitives for the pageflow workflow engine.
//!
//! Steps come in as loosely-typed JSON records; everything above this crate reads
//! them through [`WorkflowStep`] and [`StepParams`] so that field aliases and
//! lenient value coercion live in one place.

mod params;
mod result;
mod step;

pub use params::StepParams;
pub use result::{StepResult, WorkflowResult};
pub use step::{WorkflowStep, DEFAULT_STEP_TYPE};

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// Shared error type for decoding workflow input.
#[derive(Debug, Error, Clone)]
pub enum WorkflowInputError {
    #[error("workflow is not valid JSON: {0}")]
    Json(String),
    #[error("workflow must be a JSON array of step objects")]
    NotAnArray,
}

/// Identifier attached to one workflow run for log correlation.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Interpret a free-form flag value: `1/true/yes/on`, case-insensitive.
pub fn is_truthy(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Decode a serialized workflow (a JSON array of step objects).
pub fn parse_workflow(raw: &str) -> Result<Vec<WorkflowStep>, WorkflowInputError> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|err| WorkflowInputError::Json(err.to_string()))?;
    if !value.is_array() {
        return Err(WorkflowInputError::NotAnArray);
    }
    serde_json::from_value(value).map_err(|err| WorkflowInputError::Json(err.to_string()))
}
