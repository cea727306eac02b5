//! Core data types for action primitives

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Handler-specific fields produced by a successful action.
///
/// The processor merges these into the step result as-is.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActionReport {
    pub fields: Map<String, Value>,
}

impl ActionReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

/// Fixed pauses the built-in actions take to let the host application react.
///
/// These are pacing only; bounded waits carry their own timeouts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tempo {
    #[serde(with = "millis")]
    pub field_focus: Duration,
    #[serde(with = "millis")]
    pub clear_settle: Duration,
    #[serde(with = "millis")]
    pub typing_settle: Duration,
    #[serde(with = "millis")]
    pub click_settle: Duration,
    #[serde(with = "millis")]
    pub response_settle: Duration,
}

impl Default for Tempo {
    fn default() -> Self {
        Self {
            field_focus: Duration::from_millis(500),
            clear_settle: Duration::from_millis(200),
            typing_settle: Duration::from_secs(1),
            click_settle: Duration::from_millis(1500),
            response_settle: Duration::from_secs(2),
        }
    }
}

impl Tempo {
    /// No pauses at all.
    pub fn immediate() -> Self {
        Self {
            field_focus: Duration::ZERO,
            clear_settle: Duration::ZERO,
            typing_settle: Duration::ZERO,
            click_settle: Duration::ZERO,
            response_settle: Duration::ZERO,
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
