use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::params::StepParams;

/// Step type used when a step omits `type`.
pub const DEFAULT_STEP_TYPE: &str = "navigate";

/// One declarative interaction step.
///
/// Only `name` and `type` are structural; every other field (selectors, payload
/// text, timeouts, URLs) is kept verbatim in `params` and read through the
/// accessors below. Unrecognized fields are carried along untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    #[serde(
        default,
        deserialize_with = "scalar_label",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,

    #[serde(
        rename = "type",
        default,
        deserialize_with = "scalar_label",
        skip_serializing_if = "Option::is_none"
    )]
    pub step_type: Option<String>,

    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl WorkflowStep {
    pub fn new(step_type: impl Into<String>) -> Self {
        Self {
            name: None,
            step_type: Some(step_type.into()),
            params: Map::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Declared step type, falling back to `navigate`.
    pub fn kind(&self) -> &str {
        self.step_type.as_deref().unwrap_or(DEFAULT_STEP_TYPE)
    }

    /// Name used in results; unnamed steps are labelled by their position.
    pub fn display_name(&self, index: usize) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("Step {index}"))
    }

    /// Parameter view handed to action handlers (everything except name/type).
    pub fn action_params(&self) -> StepParams {
        StepParams::new(self.params.clone())
    }

    pub fn url(&self) -> Option<&str> {
        non_empty(self.params.get("url"))
    }

    pub fn target_url(&self) -> Option<&str> {
        non_empty(self.params.get("target_url"))
    }

    pub fn wait_login(&self) -> bool {
        self.action_params().flag("wait_login", false)
    }

    pub fn login_timeout(&self, default: Duration) -> Duration {
        self.action_params().duration_secs("login_timeout", default)
    }

    pub fn login_check(&self) -> Option<&str> {
        non_empty(self.params.get("login_check"))
    }

    pub fn submit_button(&self) -> Option<&str> {
        non_empty(self.params.get("submit_button"))
    }

    pub fn wait_for_selector(&self) -> Option<&str> {
        non_empty(self.params.get("wait_for_selector"))
    }
}

/// Accepts any JSON value for `name`/`type`; non-strings are rendered as JSON.
fn scalar_label<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(label) => Some(label),
        other => Some(other.to_string()),
    })
}

fn non_empty(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .filter(|raw| !raw.trim().is_empty())
}
