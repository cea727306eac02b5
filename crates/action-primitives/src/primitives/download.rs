//! Download primitive - click a link and wait for the file to land

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use cdp_adapter::{poll_until, ElementQuery, PageController, PollPolicy, Probe};
use pageflow_core_types::StepParams;
use tracing::{debug, info, warn};

use crate::errors::ActionError;
use crate::registry::ActionHandler;
use crate::types::ActionReport;

const LINK_TIMEOUT: Duration = Duration::from_secs(10);
const DOWNLOAD_WAIT: PollPolicy = PollPolicy::secs(1, 300);
const FRESHNESS: Duration = Duration::from_secs(5);
const IN_PROGRESS_EXT: &str = "crdownload";
const TARGET_EXTS: &[&str] = &["xlsx", "xls"];

/// `download`.
///
/// The file is detected by extension and modification time; the browser
/// gives no completion signal.
pub struct DownloadAction;

#[async_trait]
impl ActionHandler for DownloadAction {
    async fn run(
        &self,
        page: &dyn PageController,
        params: &StepParams,
    ) -> Result<ActionReport, ActionError> {
        let present = |key| params.str(key).filter(|value| !value.trim().is_empty());
        let query = if let Some(selector) = present("link_selector") {
            Some(ElementQuery::Css(selector.to_string()))
        } else {
            present("link_text").map(|text| ElementQuery::Text(text.to_string()))
        };
        let element = match &query {
            Some(query) => page.find(query, LINK_TIMEOUT).await?,
            None => None,
        };
        let element = element
            .ok_or_else(|| ActionError::ElementNotFound("Download element not found".into()))?;

        let output_dir = match params.output_dir() {
            Some(dir) => dir.to_path_buf(),
            None => std::env::current_dir().map_err(|err| ActionError::io("current dir", err))?,
        };

        info!("Clicking download...");
        page.click(&element).await?;

        let dir = output_dir.as_path();
        let landed = poll_until(DOWNLOAD_WAIT, move || async move {
            match scan_downloads(dir) {
                Ok(DownloadScan::Landed(path)) => Probe::Ready(path),
                Ok(DownloadScan::InProgress) => {
                    debug!("download still in progress");
                    Probe::Pending
                }
                Ok(DownloadScan::Nothing) => Probe::Pending,
                Err(err) => {
                    warn!(?err, dir = %dir.display(), "cannot scan download directory");
                    Probe::Pending
                }
            }
        })
        .await;

        match landed {
            Some(path) => {
                info!("File saved: {}", path.display());
                Ok(ActionReport::new().with("download_path", path.to_string_lossy().to_string()))
            }
            None => Err(ActionError::Timeout("Download timeout".into())),
        }
    }
}

#[derive(Debug, PartialEq)]
enum DownloadScan {
    InProgress,
    Landed(PathBuf),
    Nothing,
}

fn scan_downloads(dir: &Path) -> std::io::Result<DownloadScan> {
    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(ext) = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
        else {
            continue;
        };
        if ext == IN_PROGRESS_EXT {
            return Ok(DownloadScan::InProgress);
        }
        if TARGET_EXTS.contains(&ext.as_str()) {
            let modified = std::fs::metadata(&path)?.modified()?;
            if newest.as_ref().map_or(true, |(seen, _)| modified > *seen) {
                newest = Some((modified, path));
            }
        }
    }

    Ok(match newest {
        Some((modified, path)) if age(modified) < FRESHNESS => DownloadScan::Landed(path),
        _ => DownloadScan::Nothing,
    })
}

fn age(modified: SystemTime) -> Duration {
    SystemTime::now()
        .duration_since(modified)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdp_adapter::testing::{PageCall, ScriptedPage};
    use serde_json::json;
    use tempfile::tempdir;
    use tokio::time::{sleep, Instant};

    fn params(value: serde_json::Value, dir: &Path) -> StepParams {
        StepParams::new(value.as_object().cloned().unwrap()).with_output_dir(dir)
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_marker_to_clear() {
        let dir = tempdir().unwrap();
        let marker = dir.path().join("report.xlsx.crdownload");
        std::fs::write(&marker, b"partial").unwrap();
        let page = ScriptedPage::new();
        page.set_element(ElementQuery::Css("#export".into()), true);

        let finished = dir.path().join("report.xlsx");
        let (marker_bg, finished_bg) = (marker.clone(), finished.clone());
        tokio::spawn(async move {
            sleep(Duration::from_secs(3)).await;
            std::fs::remove_file(&marker_bg).unwrap();
            std::fs::write(&finished_bg, b"PK").unwrap();
        });

        let report = DownloadAction
            .run(&page, &params(json!({"link_selector": "#export"}), dir.path()))
            .await
            .unwrap();

        assert_eq!(
            report.get("download_path"),
            Some(&json!(finished.to_string_lossy()))
        );
        assert!(page
            .calls()
            .contains(&PageCall::Click(ElementQuery::Css("#export".into()))));
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_marker_times_out() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.crdownload"), b"").unwrap();
        std::fs::write(dir.path().join("old.xlsx"), b"").unwrap();
        let page = ScriptedPage::new();
        page.set_element(ElementQuery::Text("Export".into()), true);
        let started = Instant::now();

        let err = DownloadAction
            .run(&page, &params(json!({"link_text": "Export"}), dir.path()))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Download timeout");
        assert_eq!(started.elapsed(), Duration::from_secs(300));
    }

    #[tokio::test]
    async fn missing_link_is_reported() {
        let dir = tempdir().unwrap();
        let err = DownloadAction
            .run(&ScriptedPage::new(), &params(json!({"link_text": "Export"}), dir.path()))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Download element not found");
    }

    #[tokio::test]
    async fn blank_selector_falls_back_to_link_text() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("export.xlsx"), b"PK").unwrap();
        let page = ScriptedPage::new();
        page.set_element(ElementQuery::Text("Export".into()), true);

        DownloadAction
            .run(
                &page,
                &params(json!({"link_selector": "", "link_text": "Export"}), dir.path()),
            )
            .await
            .unwrap();

        let calls = page.calls();
        assert!(!calls.contains(&PageCall::Find(ElementQuery::Css(String::new()))));
        assert!(calls.contains(&PageCall::Click(ElementQuery::Text("Export".into()))));
    }

    #[test]
    fn scan_ignores_other_extensions() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();
        assert_eq!(scan_downloads(dir.path()).unwrap(), DownloadScan::Nothing);
        std::fs::write(dir.path().join("data.XLS"), b"").unwrap();
        assert_eq!(
            scan_downloads(dir.path()).unwrap(),
            DownloadScan::Landed(dir.path().join("data.XLS"))
        );
    }
}
