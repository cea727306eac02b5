use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::{Map, Value};

use crate::is_truthy;

/// Read-only view over a step's free-form parameters.
///
/// Values arrive from hand-written workflow files, so numbers may be strings and
/// flags may be `"yes"`; the accessors coerce rather than reject.
#[derive(Clone, Debug, Default)]
pub struct StepParams {
    values: Map<String, Value>,
    output_dir: Option<PathBuf>,
}

impl StepParams {
    pub fn new(values: Map<String, Value>) -> Self {
        Self {
            values,
            output_dir: None,
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Directory for persisted artifacts (extracted text, downloads).
    pub fn output_dir(&self) -> Option<&Path> {
        self.output_dir.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key).filter(|value| !value.is_null())
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// First key present as a string, in priority order (`input_selector` before
    /// `selector`, and so on). An empty string still counts as present.
    pub fn first_str(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| self.str(key))
    }

    pub fn flag(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::String(raw)) => is_truthy(raw),
            Some(Value::Number(num)) => num.as_f64().map(|n| n != 0.0).unwrap_or(default),
            _ => default,
        }
    }

    pub fn duration_secs(&self, key: &str, default: Duration) -> Duration {
        let seconds = match self.get(key) {
            Some(Value::Number(num)) => num.as_f64(),
            Some(Value::String(raw)) => raw.trim().parse::<f64>().ok(),
            _ => None,
        };
        match seconds {
            Some(secs) if secs.is_finite() && secs >= 0.0 => Duration::from_secs_f64(secs),
            _ => default,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }
}
