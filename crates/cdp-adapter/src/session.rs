//! Scoped acquisition of one browser process and one page.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{AdapterError, AdapterErrorKind};
use crate::page::PageController;

/// Launch settings for one session.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub headless: bool,
    /// Persistent user-data directory; survives across runs to keep login cookies.
    pub profile_dir: PathBuf,
    pub download_dir: PathBuf,
    pub executable: Option<PathBuf>,
    pub window: (u32, u32),
    pub extra_args: Vec<String>,
    pub grace_period: Duration,
}

impl SessionConfig {
    pub fn new(profile_dir: impl Into<PathBuf>, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            headless: false,
            profile_dir: profile_dir.into(),
            download_dir: download_dir.into(),
            executable: None,
            window: (1920, 1080),
            extra_args: Vec::new(),
            grace_period: Duration::from_secs(2),
        }
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Chromium flags beyond the profile directory (which the launcher sets).
    pub fn launch_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.headless {
            args.push("--headless=new".to_string());
        } else {
            args.push("--start-maximized".to_string());
        }
        args.extend(
            [
                "--no-sandbox",
                "--disable-setuid-sandbox",
                "--disable-dev-shm-usage",
                "--disable-blink-features=AutomationControlled",
            ]
            .map(String::from),
        );
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

/// Teardown interface for whatever owns the browser process.
#[async_trait]
pub trait BrowserProcess: Send {
    async fn shutdown(&mut self) -> Result<(), AdapterError>;
}

pub struct LaunchedSession {
    pub page: Arc<dyn PageController>,
    pub process: Box<dyn BrowserProcess>,
}

#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(&self, config: &SessionConfig) -> Result<LaunchedSession, AdapterError>;
}

/// Runs `body` against a freshly launched page and always tears the session down
/// afterwards: page close, then browser shutdown, then the grace period. Teardown
/// failures are logged and never replace the body's outcome; a panic inside
/// `body` is re-raised after teardown.
pub async fn with_session<T, F, Fut>(
    launcher: &dyn SessionLauncher,
    config: &SessionConfig,
    body: F,
) -> Result<T, AdapterError>
where
    F: FnOnce(Arc<dyn PageController>) -> Fut,
    Fut: Future<Output = T>,
{
    prepare_dirs(config)?;
    let LaunchedSession { page, mut process } = launcher.launch(config).await?;
    info!(
        profile = %config.profile_dir.display(),
        headless = config.headless,
        "Browser started"
    );

    match page.set_download_dir(&config.download_dir).await {
        Ok(()) => info!("Download directory set to: {}", config.download_dir.display()),
        Err(err) => warn!(?err, "Could not set download behavior"),
    }

    let outcome = AssertUnwindSafe(body(Arc::clone(&page)))
        .catch_unwind()
        .await;

    teardown(page.as_ref(), process.as_mut(), config.grace_period).await;

    match outcome {
        Ok(value) => Ok(value),
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

fn prepare_dirs(config: &SessionConfig) -> Result<(), AdapterError> {
    for dir in [&config.profile_dir, &config.download_dir] {
        std::fs::create_dir_all(dir).map_err(|err| {
            AdapterError::new(AdapterErrorKind::Launch)
                .with_hint(format!("cannot create {}: {err}", dir.display()))
        })?;
    }
    Ok(())
}

async fn teardown(page: &dyn PageController, process: &mut dyn BrowserProcess, grace: Duration) {
    info!("Closing browser...");
    if let Err(err) = page.close().await {
        debug!(?err, "page close failed");
    }
    if let Err(err) = process.shutdown().await {
        warn!(?err, "Error closing browser");
    }
    sleep(grace).await;
    info!("Browser cleanup complete");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{PageCall, ScriptedLauncher, ScriptedPage};
    use tempfile::tempdir;

    fn config(root: &std::path::Path) -> SessionConfig {
        SessionConfig::new(root.join("profile"), root.join("out"))
    }

    #[test]
    fn launch_args_follow_mode() {
        let cfg = SessionConfig::new("/p", "/d").headless(true);
        let args = cfg.launch_args();
        assert!(args.contains(&"--headless=new".to_string()));
        assert!(!args.contains(&"--start-maximized".to_string()));
        assert!(args.contains(&"--disable-blink-features=AutomationControlled".to_string()));

        let args = SessionConfig::new("/p", "/d").launch_args();
        assert!(args.contains(&"--start-maximized".to_string()));
        assert!(args.contains(&"--no-sandbox".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_runs_in_order_after_body() {
        let dir = tempdir().unwrap();
        let page = ScriptedPage::new();
        let launcher = ScriptedLauncher::new(page.clone());
        let cfg = config(dir.path());

        let value = with_session(&launcher, &cfg, |page| async move {
            page.goto("https://example.com").await.unwrap();
            42
        })
        .await
        .unwrap();

        assert_eq!(value, 42);
        assert!(cfg.profile_dir.is_dir());
        let calls = page.calls();
        let tail: Vec<_> = calls.iter().rev().take(2).rev().cloned().collect();
        assert_eq!(tail, vec![PageCall::Close, PageCall::Shutdown]);
        assert!(matches!(calls[0], PageCall::SetDownloadDir(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_errors_do_not_mask_body_result() {
        let dir = tempdir().unwrap();
        let page = ScriptedPage::new();
        page.fail_close();
        let launcher = ScriptedLauncher::new(page.clone()).failing_shutdown();

        let value = with_session(&launcher, &config(dir.path()), |_page| async {
            Err::<(), &str>("body failed")
        })
        .await
        .unwrap();

        assert_eq!(value, Err("body failed"));
        assert!(page.calls().contains(&PageCall::Shutdown));
    }

    #[tokio::test(start_paused = true)]
    async fn panics_still_release_the_browser() {
        let dir = tempdir().unwrap();
        let page = ScriptedPage::new();
        let launcher = ScriptedLauncher::new(page.clone());
        let cfg = config(dir.path());

        let outcome = AssertUnwindSafe(with_session(&launcher, &cfg, |_page| async {
            panic!("step exploded");
        }))
        .catch_unwind()
        .await;

        assert!(outcome.is_err());
        assert!(page.calls().ends_with(&[PageCall::Close, PageCall::Shutdown]));
    }

    #[tokio::test]
    async fn download_setup_failure_is_not_fatal() {
        let dir = tempdir().unwrap();
        let page = ScriptedPage::new();
        page.fail_download_setup();
        let mut cfg = config(dir.path());
        cfg.grace_period = Duration::ZERO;
        let launcher = ScriptedLauncher::new(page.clone());

        let ran = with_session(&launcher, &cfg, |_page| async { true })
            .await
            .unwrap();
        assert!(ran);
    }

    #[tokio::test]
    async fn launch_failure_surfaces_error() {
        let dir = tempdir().unwrap();
        let launcher = ScriptedLauncher::new(ScriptedPage::new()).failing_launch();
        let err = with_session(&launcher, &config(dir.path()), |_page| async {})
            .await
            .unwrap_err();
        assert_eq!(err.kind, AdapterErrorKind::Launch);
    }
}
