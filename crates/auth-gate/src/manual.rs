//! Generic manual-login waiter.

use std::time::Duration;

use async_trait::async_trait;
use cdp_adapter::{poll_until, PageController, PollPolicy, Probe, ScriptBridge};
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

use crate::{AuthHandler, LoginWait, SiteKind};

const POLL_INTERVAL: Duration = Duration::from_secs(2);
const URL_SETTLE: Duration = Duration::from_secs(3);
const MARKER_SETTLE: Duration = Duration::from_secs(2);

const LOGIN_PATH_MARKERS: &[&str] = &["login", "log-in", "auth", "signin", "sign-in"];
const POST_LOGIN_TEXT: &[&str] = &[
    "logout",
    "sign out",
    "dashboard",
    "welcome",
    "ログアウト",
    "マイページ",
];

/// Waits for a human to finish logging in on an arbitrary site.
///
/// Login counts as done when the URL leaves the starting page for a non-login
/// path, the caller's check selector appears, or the page shows post-login text.
#[derive(Clone, Copy, Debug, Default)]
pub struct ManualLoginWatcher;

impl ManualLoginWatcher {
    pub async fn wait_for_manual_login(
        &self,
        page: &dyn PageController,
        timeout: Duration,
        check_selector: Option<&str>,
        label: &str,
    ) -> bool {
        info!(
            site = label,
            timeout_secs = timeout.as_secs(),
            check = check_selector.unwrap_or("-"),
            "MANUAL LOGIN REQUIRED"
        );
        let deadline = Instant::now() + timeout;
        let bridge = ScriptBridge::new(page);
        let bridge = &bridge;

        let initial_url = poll_until(PollPolicy::new(POLL_INTERVAL, timeout), move || async move {
            match bridge.get_url().await {
                Ok(url) => Probe::Ready(url),
                Err(err) => {
                    warn!(?err, "cannot read initial URL");
                    Probe::Pending
                }
            }
        })
        .await;
        let Some(initial_url) = initial_url else {
            warn!("Login timeout reached");
            return false;
        };
        info!("Initial URL: {initial_url}");

        let remaining = deadline.saturating_duration_since(Instant::now());
        let initial = initial_url.as_str();
        let settle = poll_until(PollPolicy::new(POLL_INTERVAL, remaining), move || async move {
            match login_signal(bridge, initial, check_selector).await {
                Ok(Some(settle)) => Probe::Ready(settle),
                Ok(None) => Probe::Pending,
                Err(err) => {
                    warn!(?err, "Error during login check");
                    Probe::Pending
                }
            }
        })
        .await;

        match settle {
            Some(settle) => {
                sleep(settle).await;
                true
            }
            None => {
                warn!("Login timeout reached");
                false
            }
        }
    }
}

async fn login_signal(
    bridge: &ScriptBridge<'_>,
    initial_url: &str,
    check_selector: Option<&str>,
) -> Result<Option<Duration>, cdp_adapter::AdapterError> {
    let current = bridge.get_url().await?;
    if current != initial_url && !is_login_path(&current) {
        info!("Login detected - URL changed to: {current}");
        return Ok(Some(URL_SETTLE));
    }

    if let Some(selector) = check_selector {
        if bridge.element_exists(selector).await? {
            info!("Login detected - found element: {selector}");
            return Ok(Some(MARKER_SETTLE));
        }
    }

    let text = bridge.get_page_text().await?.to_lowercase();
    if POST_LOGIN_TEXT.iter().any(|marker| text.contains(marker)) {
        info!("Login detected via page content");
        return Ok(Some(MARKER_SETTLE));
    }
    Ok(None)
}

fn is_login_path(url: &str) -> bool {
    let url = url.to_lowercase();
    LOGIN_PATH_MARKERS.iter().any(|marker| url.contains(marker))
}

#[async_trait]
impl AuthHandler for ManualLoginWatcher {
    fn kind(&self) -> SiteKind {
        SiteKind::Generic
    }

    async fn wait_for_login(&self, page: &dyn PageController, wait: &LoginWait<'_>) -> bool {
        self.wait_for_manual_login(page, wait.timeout, wait.check_selector, wait.label)
            .await
    }
}
