//! Remote script bridge: run a script, get a plain string back.

use serde_json::Value;
use tracing::debug;

use crate::error::AdapterError;
use crate::page::PageController;

/// Thin wrapper over [`PageController::evaluate`] that normalizes the result
/// envelope into a scalar string.
#[derive(Clone, Copy)]
pub struct ScriptBridge<'a> {
    page: &'a dyn PageController,
}

impl<'a> ScriptBridge<'a> {
    pub fn new(page: &'a dyn PageController) -> Self {
        Self { page }
    }

    pub async fn execute(&self, script: &str) -> Result<String, AdapterError> {
        let response = self.page.evaluate(script).await?;
        let text = normalize_envelope(&response);
        debug!(target: "script-bridge", len = text.len(), "script evaluated");
        Ok(text)
    }

    pub async fn get_url(&self) -> Result<String, AdapterError> {
        self.execute("return window.location.href").await
    }

    /// Full visible text of the document body.
    pub async fn get_page_text(&self) -> Result<String, AdapterError> {
        self.execute("return document.body.innerText").await
    }

    pub async fn element_exists(&self, selector: &str) -> Result<bool, AdapterError> {
        let script = format!(
            "return document.querySelector({}) !== null",
            js_string(selector)
        );
        let result = self.execute(&script).await?;
        Ok(result.trim().eq_ignore_ascii_case("true"))
    }
}

/// Unwraps the evaluation envelope.
///
/// The transport may hand back a bare scalar, `{result: value}`, or the full
/// `{result: {result: {value}}}` shape; all three yield the same string.
pub fn normalize_envelope(response: &Value) -> String {
    let Value::Object(top) = response else {
        return scalar_text(response);
    };
    match top.get("result") {
        Some(Value::Object(result)) => match result.get("result") {
            Some(Value::Object(inner)) => inner.get("value").map(scalar_text).unwrap_or_default(),
            _ => scalar_text(&Value::Object(result.clone())),
        },
        Some(result) => scalar_text(result),
        None => scalar_text(response),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(num) => num.to_string(),
        other => other.to_string(),
    }
}

/// Quotes `raw` as a JavaScript string literal.
pub fn js_string(raw: &str) -> String {
    Value::String(raw.to_string()).to_string()
}
