//! Network-gateway challenge waiter.

use std::time::Duration;

use async_trait::async_trait;
use cdp_adapter::{
    poll_until, AdapterError, ElementQuery, PageController, PollPolicy, Probe, ScriptBridge,
};
use tracing::{info, warn};

use crate::{AuthHandler, LoginWait, SiteKind, SiteProfile};

const POLL_INTERVAL: Duration = Duration::from_secs(5);
const MARKER_TIMEOUT: Duration = Duration::from_secs(1);

/// Refreshes through the gateway's block page until the real page shows up.
#[derive(Clone, Debug, Default)]
pub struct GatewayWatcher {
    profile: SiteProfile,
}

impl GatewayWatcher {
    pub fn new(profile: SiteProfile) -> Self {
        Self { profile }
    }

    fn marker(&self) -> ElementQuery {
        ElementQuery::ClassName(self.profile.gateway_error_class.clone())
    }

    /// Whether the gateway's error marker is on the page right now.
    pub async fn error_present(&self, page: &dyn PageController) -> Result<bool, AdapterError> {
        Ok(page.find(&self.marker(), MARKER_TIMEOUT).await?.is_some())
    }

    /// Returns `false` once `timeout` elapses without a clean page.
    pub async fn wait_for_auth(&self, page: &dyn PageController, timeout: Duration) -> bool {
        info!(timeout_secs = timeout.as_secs(), "GATEWAY AUTHENTICATION REQUIRED");
        let watcher = self;
        let cleared = poll_until(PollPolicy::new(POLL_INTERVAL, timeout), move || async move {
            match watcher.cleared(page).await {
                Ok(Some(url)) => Probe::Ready(url),
                Ok(None) => {
                    if let Err(err) = page.reload().await {
                        warn!(?err, "gateway refresh failed");
                    }
                    Probe::Pending
                }
                Err(err) => {
                    warn!(?err, "Error during gateway auth check");
                    Probe::Pending
                }
            }
        })
        .await;

        match cleared {
            Some(url) => {
                info!("Gateway auth successful: {url}");
                true
            }
            None => {
                warn!("Gateway auth timeout reached");
                false
            }
        }
    }

    /// Current URL when neither the marker nor error text remains.
    async fn cleared(&self, page: &dyn PageController) -> Result<Option<String>, AdapterError> {
        if self.error_present(page).await? {
            return Ok(None);
        }
        let bridge = ScriptBridge::new(page);
        let url = bridge.get_url().await?;
        let text = bridge.get_page_text().await?.to_lowercase();
        let keyword = self.profile.gateway_keyword.to_lowercase();
        if text.contains("error") || (!keyword.is_empty() && text.contains(&keyword)) {
            return Ok(None);
        }
        Ok(Some(url))
    }
}

#[async_trait]
impl AuthHandler for GatewayWatcher {
    fn kind(&self) -> SiteKind {
        SiteKind::Gateway
    }

    async fn wait_for_login(&self, page: &dyn PageController, wait: &LoginWait<'_>) -> bool {
        self.wait_for_auth(page, wait.timeout).await
    }
}
