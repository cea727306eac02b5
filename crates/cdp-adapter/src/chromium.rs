//! chromiumoxide-backed launcher and page.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::{
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::StreamExt;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{AdapterError, AdapterErrorKind};
use crate::page::{ElementHandle, ElementQuery, PageController};
use crate::session::{BrowserProcess, LaunchedSession, SessionConfig, SessionLauncher};
use crate::wait::{poll_until, PollPolicy, Probe};

const FIND_INTERVAL: Duration = Duration::from_millis(250);

const INTERACTABLE_FN: &str = "function() {
    const rect = this.getBoundingClientRect();
    const style = window.getComputedStyle(this);
    return rect.width > 0 && rect.height > 0
        && style.visibility !== 'hidden'
        && style.display !== 'none'
        && !this.disabled;
}";

/// Starts a local Chromium with the session's persistent profile.
#[derive(Clone, Copy, Debug, Default)]
pub struct ChromiumLauncher;

impl ChromiumLauncher {
    fn browser_config(config: &SessionConfig) -> Result<BrowserConfig, AdapterError> {
        let executable = config
            .executable
            .clone()
            .filter(|path| path.exists())
            .or_else(crate::detect_chrome_executable)
            .ok_or_else(|| {
                AdapterError::new(AdapterErrorKind::Launch).with_hint(
                    "Chrome/Chromium executable not found; set PAGEFLOW_CHROME or browser.executable",
                )
            })?;

        let (width, height) = config.window;
        // Headless is expressed through launch_args, so keep chromiumoxide's own flag off.
        BrowserConfig::builder()
            .with_head()
            .chrome_executable(executable)
            .user_data_dir(&config.profile_dir)
            .window_size(width, height)
            .viewport(None)
            .launch_timeout(Duration::from_secs(20))
            .args(config.launch_args())
            .build()
            .map_err(|err| {
                AdapterError::new(AdapterErrorKind::Launch)
                    .with_hint(format!("browser config error: {err}"))
            })
    }
}

#[async_trait]
impl SessionLauncher for ChromiumLauncher {
    async fn launch(&self, config: &SessionConfig) -> Result<LaunchedSession, AdapterError> {
        let browser_config = Self::browser_config(config)?;
        let (mut browser, mut handler) = Browser::launch(browser_config).await.map_err(|err| {
            AdapterError::new(AdapterErrorKind::Launch)
                .with_hint(format!("failed to launch chromium: {err}"))
        })?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(target: "cdp-adapter", ?err, "handler loop stopped");
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(err) => {
                let mut process = ChromiumProcess { browser, handler };
                if let Err(shutdown_err) = process.shutdown().await {
                    warn!(?shutdown_err, "cleanup after failed page creation");
                }
                return Err(AdapterError::new(AdapterErrorKind::Launch)
                    .with_hint(format!("failed to open page: {err}")));
            }
        };

        Ok(LaunchedSession {
            page: Arc::new(ChromiumPage::new(page)),
            process: Box::new(ChromiumProcess { browser, handler }),
        })
    }
}

struct ChromiumProcess {
    browser: Browser,
    handler: JoinHandle<()>,
}

#[async_trait]
impl BrowserProcess for ChromiumProcess {
    async fn shutdown(&mut self) -> Result<(), AdapterError> {
        let closed = self.browser.close().await;
        if let Err(err) = &closed {
            debug!(?err, "graceful close failed; killing browser");
            if let Some(Err(kill_err)) = self.browser.kill().await {
                self.handler.abort();
                return Err(AdapterError::new(AdapterErrorKind::Teardown)
                    .with_hint(format!("kill failed: {kill_err}")));
            }
        }
        let waited = self.browser.wait().await;
        self.handler.abort();
        waited.map(|_| ()).map_err(|err| {
            AdapterError::new(AdapterErrorKind::Teardown)
                .with_hint(format!("waiting for browser exit: {err}"))
        })
    }
}

/// One tab driven over CDP.
pub struct ChromiumPage {
    page: Page,
    elements: Mutex<HashMap<u64, Arc<Element>>>,
    next_id: AtomicU64,
}

impl ChromiumPage {
    pub fn new(page: Page) -> Self {
        Self {
            page,
            elements: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn element(&self, handle: &ElementHandle) -> Result<Arc<Element>, AdapterError> {
        self.elements.lock().get(&handle.id).cloned().ok_or_else(|| {
            AdapterError::new(AdapterErrorKind::TargetNotFound)
                .with_hint(format!("stale handle {handle}"))
        })
    }

    async fn locate(&self, query: &ElementQuery) -> Option<Element> {
        let found = match query.css() {
            Some(css) => self.page.find_element(css).await,
            None => match query {
                ElementQuery::Text(text) => {
                    self.page.find_xpath(ElementQuery::text_xpath(text)).await
                }
                _ => return None,
            },
        };
        found.ok()
    }
}

#[async_trait]
impl PageController for ChromiumPage {
    async fn goto(&self, url: &str) -> Result<(), AdapterError> {
        self.page.goto(url).await.map_err(|err| {
            AdapterError::new(AdapterErrorKind::NavTimeout).with_hint(format!("{url}: {err}"))
        })?;
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<Value, AdapterError> {
        let params = EvaluateParams::builder()
            .expression(format!("(() => {{\n{script}\n}})()"))
            .return_by_value(true)
            .await_promise(true)
            .build()
            .map_err(AdapterError::internal)?;
        let response = self.page.execute(params).await.map_err(AdapterError::cdp_io)?;
        if let Some(details) = &response.result.exception_details {
            return Err(AdapterError::cdp_io(format!(
                "script threw: {}",
                details.text
            )));
        }
        let returns = serde_json::to_value(&response.result).map_err(AdapterError::internal)?;
        Ok(json!({ "result": returns }))
    }

    async fn find(
        &self,
        query: &ElementQuery,
        timeout: Duration,
    ) -> Result<Option<ElementHandle>, AdapterError> {
        let policy = PollPolicy::new(FIND_INTERVAL, timeout);
        let found = poll_until(policy, move || async move {
            match self.locate(query).await {
                Some(element) => Probe::Ready(element),
                None => Probe::Pending,
            }
        })
        .await;

        Ok(found.map(|element| {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            self.elements.lock().insert(id, Arc::new(element));
            ElementHandle {
                id,
                query: query.clone(),
            }
        }))
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), AdapterError> {
        self.element(element)?
            .click()
            .await
            .map_err(AdapterError::cdp_io)?;
        Ok(())
    }

    async fn type_text(&self, element: &ElementHandle, text: &str) -> Result<(), AdapterError> {
        self.element(element)?
            .type_str(text)
            .await
            .map_err(AdapterError::cdp_io)?;
        Ok(())
    }

    async fn scroll_into_view(&self, element: &ElementHandle) -> Result<(), AdapterError> {
        self.element(element)?
            .scroll_into_view()
            .await
            .map_err(AdapterError::cdp_io)?;
        Ok(())
    }

    async fn is_interactable(&self, element: &ElementHandle) -> Result<bool, AdapterError> {
        let returns = self
            .element(element)?
            .call_js_fn(INTERACTABLE_FN, false)
            .await
            .map_err(AdapterError::cdp_io)?;
        Ok(returns
            .result
            .value
            .and_then(|value| value.as_bool())
            .unwrap_or(false))
    }

    async fn reload(&self) -> Result<(), AdapterError> {
        self.page.reload().await.map_err(AdapterError::cdp_io)?;
        Ok(())
    }

    async fn set_download_dir(&self, dir: &Path) -> Result<(), AdapterError> {
        let params = SetDownloadBehaviorParams::builder()
            .behavior(SetDownloadBehaviorBehavior::Allow)
            .download_path(dir.to_string_lossy().to_string())
            .events_enabled(true)
            .build()
            .map_err(AdapterError::internal)?;
        self.page.execute(params).await.map_err(AdapterError::cdp_io)?;
        Ok(())
    }

    async fn close(&self) -> Result<(), AdapterError> {
        self.elements.lock().clear();
        self.page.clone().close().await.map_err(AdapterError::cdp_io)
    }
}
