//! The one JSON object a command leaves on stdout.

use pageflow_core_types::WorkflowResult;
use serde_json::{json, Value};

pub fn failure(error: impl std::fmt::Display) -> Value {
    json!({ "success": false, "error": error.to_string() })
}

pub fn verdict(result: &WorkflowResult) -> Value {
    serde_json::to_value(result).unwrap_or_else(|err| failure(format!("cannot encode result: {err}")))
}

/// Single line, non-ASCII kept as-is.
pub fn emit(value: &Value) {
    println!("{value}");
}
