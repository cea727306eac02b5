//! Login waiter for the target application behind SSO and the network gateway.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use cdp_adapter::{poll_until, AdapterError, PageController, PollPolicy, Probe, ScriptBridge};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::{AuthHandler, LoginWait, SiteKind, SiteProfile};

const POLL_INTERVAL: Duration = Duration::from_secs(2);
const REDIRECT_PRE_SUBMIT: Duration = Duration::from_secs(2);
const REDIRECT_POST_SUBMIT: Duration = Duration::from_secs(3);
const IDP_BACKOFF: Duration = Duration::from_secs(5);
const AUTH_BACKOFF: Duration = Duration::from_secs(2);
const ERROR_BACKOFF: Duration = Duration::from_secs(3);
const PROBE_SETTLE: Duration = Duration::from_secs(2);
const RETURN_SETTLE: Duration = Duration::from_secs(5);

/// Tracks the SSO round trip: gateway interstitial, identity provider, the
/// app's own auth host, and finally the app itself.
#[derive(Clone, Debug, Default)]
pub struct TargetSiteLoginWatcher {
    profile: SiteProfile,
}

/// Per-call hop tracking. Lives only as long as one wait.
#[derive(Default)]
struct Hops {
    identity_provider: AtomicBool,
    auth_page: AtomicBool,
}

impl Hops {
    fn any(&self) -> bool {
        self.identity_provider.load(Ordering::SeqCst) || self.auth_page.load(Ordering::SeqCst)
    }
}

impl TargetSiteLoginWatcher {
    pub fn new(profile: SiteProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &SiteProfile {
        &self.profile
    }

    /// One shot of the logged-in DOM probes.
    pub async fn check_logged_in(&self, page: &dyn PageController) -> Result<bool, AdapterError> {
        let state = ScriptBridge::new(page)
            .execute(&self.profile.logged_in_script())
            .await?;
        Ok(state == "logged_in")
    }

    /// Handles the gateway's zero-content redirect page: waits briefly, then
    /// submits the gateway form. Returns whether a form was submitted.
    pub async fn submit_gateway_form(&self, page: &dyn PageController, url: &str) -> bool {
        if !self.profile.is_gateway_redirect(url) {
            return false;
        }
        info!("Handling gateway redirect...");
        sleep(REDIRECT_PRE_SUBMIT).await;
        let outcome = ScriptBridge::new(page)
            .execute(&self.profile.gateway_submit_script())
            .await;
        match outcome.as_deref() {
            Ok("submitted") => {
                info!("Gateway form auto-submitted");
                sleep(REDIRECT_POST_SUBMIT).await;
                true
            }
            Ok(other) => {
                debug!(result = other, "no gateway form on redirect page");
                false
            }
            Err(err) => {
                warn!(?err, "gateway form submit failed");
                false
            }
        }
    }

    pub async fn wait_for_login(&self, page: &dyn PageController, timeout: Duration) -> bool {
        info!("Checking login status...");
        match self.check_logged_in(page).await {
            Ok(true) => {
                info!("Already logged in!");
                return true;
            }
            Ok(false) => {}
            Err(err) => warn!(?err, "logged-in probe failed"),
        }

        let hops = Hops::default();
        let (watcher, hops_ref) = (self, &hops);
        let settle = poll_until(PollPolicy::new(POLL_INTERVAL, timeout), move || async move {
            match watcher.step(page, hops_ref).await {
                Ok(probe) => probe,
                Err(err) => {
                    warn!(?err, "Error during login check");
                    Probe::Backoff(ERROR_BACKOFF)
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

    async fn step(
        &self,
        page: &dyn PageController,
        hops: &Hops,
    ) -> Result<Probe<Duration>, AdapterError> {
        let profile = &self.profile;
        let current = ScriptBridge::new(page).get_url().await?;
        debug!(url = %current, "login poll");

        if profile.is_gateway_redirect(&current) {
            self.submit_gateway_form(page, &current).await;
            return Ok(Probe::Pending);
        }

        if contains(&current, &profile.identity_provider_host) {
            info!("In identity provider auth...");
            hops.identity_provider.store(true, Ordering::SeqCst);
            return Ok(Probe::Backoff(IDP_BACKOFF));
        }

        if self.check_logged_in(page).await? {
            info!("Login successful!");
            return Ok(Probe::Ready(PROBE_SETTLE));
        }

        if contains(&current, &profile.auth_host) {
            info!("On auth page...");
            hops.auth_page.store(true, Ordering::SeqCst);
            return Ok(Probe::Backoff(AUTH_BACKOFF));
        }

        if contains(&current, &profile.app_host) && !current.contains("/auth") && hops.any() {
            info!("Login complete!");
            return Ok(Probe::Ready(RETURN_SETTLE));
        }

        Ok(Probe::Pending)
    }
}

fn contains(url: &str, host: &str) -> bool {
    !host.is_empty() && url.contains(host)
}

#[async_trait]
impl AuthHandler for TargetSiteLoginWatcher {
    fn kind(&self) -> SiteKind {
        SiteKind::TargetSite
    }

    async fn wait_for_login(&self, page: &dyn PageController, wait: &LoginWait<'_>) -> bool {
        TargetSiteLoginWatcher::wait_for_login(self, page, wait.timeout).await
    }
}
