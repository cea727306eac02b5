//! Ready-made workflows

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use pageflow_core_types::WorkflowStep;

pub const RESPONSE_FILE_PREFIX: &str = "chat_response_";
pub const DEFAULT_CHAT_URL: &str = "https://chatgpt.com";

const PROMPT_SELECTORS: &str = "#prompt-textarea,.ProseMirror";
const SEND_BUTTON: &str = "[data-testid=\"send-button\"]";
const STOP_BUTTON: &str = "[data-testid=\"stop-button\"]";
const ASSISTANT_MESSAGE: &str = "[data-message-author-role=\"assistant\"]";

/// Open the chat (waiting for login), send `prompt`, wait for the answer to
/// finish, and save it as `save_as` under the run's output directory.
pub fn chat_round_trip(url: &str, prompt: &str, save_as: &str) -> Vec<WorkflowStep> {
    vec![
        WorkflowStep::new("navigate")
            .named("Open chat")
            .with("url", url)
            .with("wait_login", true)
            .with("login_timeout", 300),
        WorkflowStep::new("input")
            .named("Send prompt")
            .with("input_selector", PROMPT_SELECTORS)
            .with("input_text", prompt)
            .with("clear_first", true)
            .with("submit_button", SEND_BUTTON)
            .with("submit_text", "Send")
            .with("wait_for_selector", STOP_BUTTON)
            .with("wait_timeout", 60),
        WorkflowStep::new("extract")
            .named("Extract response")
            .with("extract_selector", ASSISTANT_MESSAGE)
            .with("save_as", save_as),
    ]
}

/// `chat_response_YYYYmmdd_HHMMSS.txt`
pub fn response_file_name(at: DateTime<Local>) -> String {
    format!("{RESPONSE_FILE_PREFIX}{}.txt", at.format("%Y%m%d_%H%M%S"))
}

/// Most recently modified regular file in `dir` whose name starts with `prefix`.
pub fn latest_response_file(dir: &Path, prefix: &str) -> io::Result<Option<PathBuf>> {
    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_name().to_string_lossy().starts_with(prefix) {
            continue;
        }
        let meta = entry.metadata()?;
        if !meta.is_file() {
            continue;
        }
        let modified = meta.modified()?;
        if newest.as_ref().map_or(true, |(best, _)| modified > *best) {
            newest = Some((modified, entry.path()));
        }
    }
    Ok(newest.map(|(_, path)| path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn round_trip_has_three_steps() {
        let steps = chat_round_trip(DEFAULT_CHAT_URL, "今日の注目銘柄は?", "answer.txt");
        let kinds: Vec<_> = steps.iter().map(WorkflowStep::kind).collect();
        assert_eq!(kinds, vec!["navigate", "input", "extract"]);
        assert!(steps[0].wait_login());
        assert_eq!(steps[1].submit_button(), Some(SEND_BUTTON));
        assert_eq!(steps[1].wait_for_selector(), Some(STOP_BUTTON));
        assert_eq!(
            steps[1].action_params().str("input_text"),
            Some("今日の注目銘柄は?")
        );
        assert_eq!(steps[2].action_params().str("save_as"), Some("answer.txt"));
    }

    #[test]
    fn file_name_is_timestamped() {
        let at = Local.with_ymd_and_hms(2026, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(response_file_name(at), "chat_response_20260309_070501.txt");
    }

    #[test]
    fn newest_matching_file_wins() {
        let dir = tempdir().unwrap();
        let old = dir.path().join("chat_response_1.txt");
        let new = dir.path().join("chat_response_2.txt");
        fs::write(&old, "a").unwrap();
        fs::write(&new, "b").unwrap();
        fs::write(dir.path().join("report.xlsx"), "c").unwrap();
        let past = SystemTime::now() - Duration::from_secs(60);
        fs::File::options()
            .write(true)
            .open(&old)
            .unwrap()
            .set_modified(past)
            .unwrap();

        let found = latest_response_file(dir.path(), RESPONSE_FILE_PREFIX).unwrap();
        assert_eq!(found, Some(new));
    }

    #[test]
    fn empty_dir_has_no_response() {
        let dir = tempdir().unwrap();
        assert_eq!(latest_response_file(dir.path(), RESPONSE_FILE_PREFIX).unwrap(), None);
    }
}
