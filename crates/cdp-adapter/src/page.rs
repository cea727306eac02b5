//! Remote page controller surface consumed by the higher layers.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AdapterError;

/// How an element is located on the page.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementQuery {
    Css(String),
    Id(String),
    ClassName(String),
    /// Any element whose own text contains the string.
    Text(String),
}

impl ElementQuery {
    /// CSS form of the query; `None` for text lookups.
    pub fn css(&self) -> Option<String> {
        match self {
            ElementQuery::Css(selector) => Some(selector.clone()),
            ElementQuery::Id(id) => Some(format!("[id=\"{}\"]", escape_attr(id))),
            ElementQuery::ClassName(class) => Some(format!(".{}", class.trim())),
            ElementQuery::Text(_) => None,
        }
    }

    /// XPath used to resolve [`ElementQuery::Text`].
    pub fn text_xpath(text: &str) -> String {
        format!("//*[contains(text(), {})]", xpath_literal(text))
    }
}

impl fmt::Display for ElementQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementQuery::Css(selector) => write!(f, "css={selector}"),
            ElementQuery::Id(id) => write!(f, "id={id}"),
            ElementQuery::ClassName(class) => write!(f, "class={class}"),
            ElementQuery::Text(text) => write!(f, "text={text}"),
        }
    }
}

/// Opaque reference to an element resolved by [`PageController::find`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementHandle {
    pub id: u64,
    pub query: ElementQuery,
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "element#{} ({})", self.id, self.query)
    }
}

/// Minimal capability set needed to drive one browser tab.
///
/// `evaluate` returns the transport's raw envelope; use
/// [`crate::bridge::ScriptBridge`] to get a plain string out of it.
#[async_trait]
pub trait PageController: Send + Sync {
    async fn goto(&self, url: &str) -> Result<(), AdapterError>;

    /// Runs a function body (scripts may `return`) in the page.
    async fn evaluate(&self, script: &str) -> Result<Value, AdapterError>;

    /// Resolves `query`, retrying until `timeout`. Absence is `Ok(None)`.
    async fn find(
        &self,
        query: &ElementQuery,
        timeout: Duration,
    ) -> Result<Option<ElementHandle>, AdapterError>;

    async fn click(&self, element: &ElementHandle) -> Result<(), AdapterError>;

    /// Sends `text` as individual key events.
    async fn type_text(&self, element: &ElementHandle, text: &str) -> Result<(), AdapterError>;

    async fn scroll_into_view(&self, element: &ElementHandle) -> Result<(), AdapterError>;

    async fn is_interactable(&self, element: &ElementHandle) -> Result<bool, AdapterError>;

    async fn reload(&self) -> Result<(), AdapterError>;

    async fn set_download_dir(&self, dir: &Path) -> Result<(), AdapterError>;

    async fn close(&self) -> Result<(), AdapterError>;
}

fn escape_attr(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}

fn xpath_literal(text: &str) -> String {
    if !text.contains('"') {
        return format!("\"{text}\"");
    }
    if !text.contains('\'') {
        return format!("'{text}'");
    }
    let parts: Vec<String> = text.split('"').map(|part| format!("\"{part}\"")).collect();
    format!("concat({})", parts.join(", '\"', "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn css_forms() {
        assert_eq!(
            ElementQuery::Id("prompt-textarea".into()).css().as_deref(),
            Some("[id=\"prompt-textarea\"]")
        );
        assert_eq!(
            ElementQuery::ClassName("ProseMirror".into()).css().as_deref(),
            Some(".ProseMirror")
        );
        assert_eq!(ElementQuery::Text("Send".into()).css(), None);
    }

    #[test]
    fn xpath_quotes_text() {
        assert_eq!(
            ElementQuery::text_xpath("Send"),
            "//*[contains(text(), \"Send\")]"
        );
        assert_eq!(
            ElementQuery::text_xpath("say \"hi\""),
            "//*[contains(text(), 'say \"hi\"')]"
        );
        assert_eq!(
            ElementQuery::text_xpath("it's \"x\""),
            "//*[contains(text(), concat(\"it's \", '\"', \"x\", '\"', \"\"))]"
        );
    }
}
