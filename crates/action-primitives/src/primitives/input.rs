//! Input primitive - fill the prompt field character by character

use std::time::Duration;

use async_trait::async_trait;
use cdp_adapter::{ElementQuery, PageController, ScriptBridge};
use pageflow_core_types::StepParams;
use tracing::{debug, info};

use super::{css_candidates, find_first, pause};
use crate::errors::ActionError;
use crate::registry::ActionHandler;
use crate::types::{ActionReport, Tempo};

const FIELD_TIMEOUT: Duration = Duration::from_secs(5);

pub const CLEAR_FIELD_SCRIPT: &str = r#"
const editor = document.querySelector('div.ProseMirror') ||
             document.getElementById('prompt-textarea');
if (editor && editor.contentEditable === 'true') {
    editor.focus();
    const selection = window.getSelection();
    const range = document.createRange();
    range.selectNodeContents(editor);
    selection.removeAllRanges();
    selection.addRange(range);
    document.execCommand('delete');
}
"#;

pub const NOTIFY_FIELD_SCRIPT: &str = r#"
const editor = document.querySelector('div.ProseMirror') ||
             document.getElementById('prompt-textarea');
if (editor) {
    editor.dispatchEvent(new Event('input', { bubbles: true }));
    editor.dispatchEvent(new Event('change', { bubbles: true }));
}
"#;

/// `input` / `type` / `fill`.
///
/// Caller selectors (`input_selector`, then `selector`) are tried first, then
/// the rich-text editor class and the prompt textarea id.
pub struct InputAction {
    tempo: Tempo,
}

impl InputAction {
    pub fn new(tempo: Tempo) -> Self {
        Self { tempo }
    }
}

#[async_trait]
impl ActionHandler for InputAction {
    async fn run(
        &self,
        page: &dyn PageController,
        params: &StepParams,
    ) -> Result<ActionReport, ActionError> {
        let selector = params.first_str(&["input_selector", "selector"]);
        let text = params.first_str(&["input_text", "text"]).unwrap_or_default();
        let clear_first = params.flag("clear_first", true);
        info!("Looking for input field: {}", selector.unwrap_or("<default>"));

        let mut candidates = selector
            .map(|selectors| css_candidates(selectors, FIELD_TIMEOUT))
            .unwrap_or_default();
        candidates.push((ElementQuery::ClassName("ProseMirror".into()), FIELD_TIMEOUT));
        candidates.push((ElementQuery::Id("prompt-textarea".into()), FIELD_TIMEOUT));

        let field = find_first(page, &candidates)
            .await?
            .ok_or_else(|| ActionError::ElementNotFound("Input field not found".into()))?;
        debug!(%field, "input field resolved");

        let bridge = ScriptBridge::new(page);
        page.click(&field).await?;
        pause(self.tempo.field_focus).await;

        if clear_first {
            bridge.execute(CLEAR_FIELD_SCRIPT).await?;
            pause(self.tempo.clear_settle).await;
        }

        info!(chars = text.chars().count(), "Typing text");
        page.type_text(&field, text).await?;
        pause(self.tempo.typing_settle).await;

        bridge.execute(NOTIFY_FIELD_SCRIPT).await?;
        info!("Text input successful");
        Ok(ActionReport::new())
    }
}
