use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const RESERVED_KEYS: [&str; 4] = ["name", "type", "success", "error"];

/// Outcome of one attempted step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub name: String,

    #[serde(rename = "type")]
    pub step_type: String,

    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Handler-specific fields (`extracted_text`, `download_path`, ...).
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl StepResult {
    /// A not-yet-successful result; callers flip it with [`StepResult::succeed`].
    pub fn pending(name: impl Into<String>, step_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            step_type: step_type.into(),
            success: false,
            error: None,
            fields: Map::new(),
        }
    }

    pub fn succeed(&mut self) {
        self.success = true;
        self.error = None;
    }

    pub fn fail(&mut self, reason: impl Into<String>) {
        self.success = false;
        self.error = Some(reason.into());
    }

    /// Adds a handler field. Keys that collide with the fixed envelope are dropped.
    pub fn insert_field(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        if RESERVED_KEYS.contains(&key.as_str()) {
            return;
        }
        self.fields.insert(key, value.into());
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

/// Aggregate outcome of a workflow run.
///
/// `success` holds iff every produced step succeeded; steps after the first
/// failure are never attempted and have no entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub success: bool,
    pub steps: Vec<StepResult>,
}

impl WorkflowResult {
    pub fn from_steps(steps: Vec<StepResult>) -> Self {
        let success = steps.iter().all(|step| step.success);
        Self { success, steps }
    }

    pub fn last_error(&self) -> Option<&str> {
        self.steps.last().and_then(|step| step.error.as_deref())
    }
}
