//! L3 Auth Gate - blocking waits for interactive login and gateway challenges
//!
//! Three handler variants sit behind [`AuthHandler`]:
//! - [`ManualLoginWatcher`] for arbitrary sites
//! - [`TargetSiteLoginWatcher`] for the target app and its SSO hops
//! - [`GatewayWatcher`] for the network gateway's block page
//!
//! [`AuthGate`] owns one of each and picks by [`SiteKind`].

mod gateway;
mod manual;
mod site;
mod target_site;

pub use gateway::GatewayWatcher;
pub use manual::ManualLoginWatcher;
pub use site::{classify, SiteKind, SiteProfile};
pub use target_site::TargetSiteLoginWatcher;

use std::time::Duration;

use async_trait::async_trait;
use cdp_adapter::PageController;

/// Parameters of one login wait.
#[derive(Clone, Copy, Debug)]
pub struct LoginWait<'a> {
    pub timeout: Duration,
    /// Selector whose presence proves login (generic handler only).
    pub check_selector: Option<&'a str>,
    /// Human-readable site name for log lines.
    pub label: &'a str,
}

impl<'a> LoginWait<'a> {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            check_selector: None,
            label: "",
        }
    }
}

/// Blocks until login is observed or the timeout elapses.
#[async_trait]
pub trait AuthHandler: Send + Sync {
    fn kind(&self) -> SiteKind;

    async fn wait_for_login(&self, page: &dyn PageController, wait: &LoginWait<'_>) -> bool;
}

/// All handler variants configured from one [`SiteProfile`].
#[derive(Clone, Debug, Default)]
pub struct AuthGate {
    profile: SiteProfile,
    manual: ManualLoginWatcher,
    target_site: TargetSiteLoginWatcher,
    gateway: GatewayWatcher,
}

impl AuthGate {
    pub fn new(profile: SiteProfile) -> Self {
        Self {
            manual: ManualLoginWatcher,
            target_site: TargetSiteLoginWatcher::new(profile.clone()),
            gateway: GatewayWatcher::new(profile.clone()),
            profile,
        }
    }

    pub fn profile(&self) -> &SiteProfile {
        &self.profile
    }

    pub fn classify(&self, url: &str) -> SiteKind {
        self.profile.classify(url)
    }

    pub fn handler(&self, kind: SiteKind) -> &dyn AuthHandler {
        match kind {
            SiteKind::Generic => &self.manual,
            SiteKind::TargetSite => &self.target_site,
            SiteKind::Gateway => &self.gateway,
        }
    }

    pub fn handler_for_url(&self, url: &str) -> &dyn AuthHandler {
        self.handler(self.classify(url))
    }

    pub fn target_site(&self) -> &TargetSiteLoginWatcher {
        &self.target_site
    }

    pub fn gateway(&self) -> &GatewayWatcher {
        &self.gateway
    }
}
