//! Extract primitive - scrape the latest response text

use std::path::Path;

use async_trait::async_trait;
use cdp_adapter::bridge::js_string;
use cdp_adapter::{PageController, ScriptBridge};
use pageflow_core_types::StepParams;
use tracing::{info, warn};

use crate::errors::ActionError;
use crate::registry::ActionHandler;
use crate::types::ActionReport;

pub const NO_COPY_BUTTON: &str = "No copy button found";
pub const COPY_WITHOUT_TEXT: &str = "Copy button clicked but could not extract text";
pub const NOTHING_EXTRACTED: &str = "Could not extract response";
pub const DEFAULT_MESSAGE_SELECTOR: &str = "[data-message-author-role=\"assistant\"]";

const RESULT_PREFIX_CHARS: usize = 1000;
const LOG_PREVIEW_CHARS: usize = 500;

pub const COPY_BUTTON_SCRIPT: &str = r#"
const copyButtons = document.querySelectorAll('[data-testid="copy-turn-action-button"]');

if (copyButtons.length > 0) {
    const lastCopyBtn = copyButtons[copyButtons.length - 1];
    lastCopyBtn.click();

    let parent = lastCopyBtn.closest('article');
    if (!parent) {
        parent = lastCopyBtn.closest('[data-message-author-role="assistant"]');
    }
    if (!parent) {
        parent = lastCopyBtn.parentElement;
        while (parent && !parent.querySelector('.markdown')) {
            parent = parent.parentElement;
        }
    }

    if (parent) {
        const markdownDiv = parent.querySelector('.markdown');
        if (markdownDiv) {
            return markdownDiv.innerText || markdownDiv.textContent || '';
        }
        return parent.innerText || parent.textContent || '';
    }

    return 'Copy button clicked but could not extract text';
}

return 'No copy button found';
"#;

/// Fallback scrape of the last message container matching `selector`, then
/// the last of several articles.
pub fn last_message_script(selector: &str) -> String {
    format!(
        r#"
const messages = document.querySelectorAll({selector});
if (messages.length > 0) {{
    const lastMsg = messages[messages.length - 1];
    const markdownDiv = lastMsg.querySelector('.markdown');
    if (markdownDiv) {{
        return markdownDiv.innerText || markdownDiv.textContent || '';
    }}
    return lastMsg.innerText || lastMsg.textContent || '';
}}

const articles = document.querySelectorAll('article');
if (articles.length > 1) {{
    const lastArticle = articles[articles.length - 1];
    const markdownDiv = lastArticle.querySelector('.markdown');
    if (markdownDiv) {{
        return markdownDiv.innerText || '';
    }}
    return lastArticle.innerText || '';
}}

return 'Could not extract response';
"#,
        selector = js_string(selector)
    )
}

/// `extract` / `scrape`.
///
/// Never fails on an empty page: a missing response yields empty text.
pub struct ExtractAction;

#[async_trait]
impl ActionHandler for ExtractAction {
    async fn run(
        &self,
        page: &dyn PageController,
        params: &StepParams,
    ) -> Result<ActionReport, ActionError> {
        let bridge = ScriptBridge::new(page);
        info!("Finding and clicking the last copy button...");
        let mut text = bridge.execute(COPY_BUTTON_SCRIPT).await?;

        if text.is_empty() || text == NO_COPY_BUTTON || text == COPY_WITHOUT_TEXT {
            info!("Copy button method failed, trying direct extraction...");
            let selector = params
                .str("extract_selector")
                .filter(|raw| !raw.trim().is_empty())
                .unwrap_or(DEFAULT_MESSAGE_SELECTOR);
            text = bridge.execute(&last_message_script(selector)).await?;
        }

        if text.is_empty() || text == NOTHING_EXTRACTED || text == COPY_WITHOUT_TEXT {
            warn!(result = %text, "Extraction failed");
            text.clear();
        } else {
            if let Some(save_as) = params.str("save_as").filter(|name| !name.is_empty()) {
                let base = params.output_dir().unwrap_or_else(|| Path::new("."));
                let path = base.join(save_as);
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)
                        .map_err(|err| ActionError::io(parent.display(), err))?;
                }
                std::fs::write(&path, &text).map_err(|err| ActionError::io(path.display(), err))?;
                info!("Text saved to: {}", path.display());
            }
            info!(
                chars = text.chars().count(),
                preview = %preview(&text, LOG_PREVIEW_CHARS),
                "Extracted text"
            );
        }

        Ok(ActionReport::new()
            .with("extracted_text", prefix(&text, RESULT_PREFIX_CHARS))
            .with("text_length", text.chars().count()))
    }
}

fn prefix(text: &str, chars: usize) -> String {
    text.chars().take(chars).collect()
}

fn preview(text: &str, chars: usize) -> String {
    if text.chars().count() > chars {
        format!("{}...", prefix(text, chars))
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdp_adapter::testing::ScriptedPage;
    use serde_json::{json, Value};
    use tempfile::tempdir;

    #[tokio::test]
    async fn copy_button_text_is_saved_in_full() {
        let dir = tempdir().unwrap();
        let page = ScriptedPage::new();
        let long = "x".repeat(1500);
        page.on_script("copy-turn-action-button", long.clone());
        let params = StepParams::new(
            json!({"save_as": "nested/chat.txt"})
                .as_object()
                .cloned()
                .unwrap(),
        )
        .with_output_dir(dir.path());

        let report = ExtractAction.run(&page, &params).await.unwrap();

        let saved = std::fs::read_to_string(dir.path().join("nested/chat.txt")).unwrap();
        assert_eq!(saved, long);
        assert_eq!(
            report.get("extracted_text").and_then(Value::as_str).map(str::len),
            Some(1000)
        );
        assert_eq!(report.get("text_length"), Some(&json!(1500)));
        assert_eq!(page.scripts_containing("querySelectorAll(\"[data-message"), 0);
    }

    #[tokio::test]
    async fn falls_back_to_last_message() {
        let page = ScriptedPage::new();
        page.on_script("copy-turn-action-button", NO_COPY_BUTTON);
        page.on_script("lastMsg", "BUY 7203");

        let report = ExtractAction
            .run(&page, &StepParams::default())
            .await
            .unwrap();
        assert_eq!(report.get("extracted_text"), Some(&json!("BUY 7203")));
        assert_eq!(page.scripts_containing("lastMsg"), 1);
    }

    #[tokio::test]
    async fn sentinel_results_become_empty_text() {
        let dir = tempdir().unwrap();
        let page = ScriptedPage::new();
        page.on_script("copy-turn-action-button", COPY_WITHOUT_TEXT);
        page.on_script("lastMsg", NOTHING_EXTRACTED);
        let params = StepParams::new(json!({"save_as": "out.txt"}).as_object().cloned().unwrap())
            .with_output_dir(dir.path());

        let report = ExtractAction.run(&page, &params).await.unwrap();

        assert_eq!(report.get("extracted_text"), Some(&json!("")));
        assert_eq!(report.get("text_length"), Some(&json!(0)));
        assert!(!dir.path().join("out.txt").exists());
    }

    #[test]
    fn preview_marks_truncation() {
        assert_eq!(preview("abcdef", 3), "abc...");
        assert_eq!(preview("abc", 3), "abc");
    }
}
