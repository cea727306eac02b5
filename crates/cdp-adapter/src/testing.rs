//! Scripted in-memory page for exercising the upper layers without Chromium.
//!
//! Script replies are matched by substring; the most recently registered rule
//! wins. Reply and element sequences advance once per call and repeat their
//! last entry forever.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::error::{AdapterError, AdapterErrorKind};
use crate::page::{ElementHandle, ElementQuery, PageController};
use crate::session::{BrowserProcess, LaunchedSession, SessionConfig, SessionLauncher};

/// Everything the scripted page was asked to do, in order.
#[derive(Clone, Debug, PartialEq)]
pub enum PageCall {
    Goto(String),
    Evaluate(String),
    Find(ElementQuery),
    Click(ElementQuery),
    TypeText(ElementQuery, String),
    ScrollIntoView(ElementQuery),
    Reload,
    SetDownloadDir(PathBuf),
    Close,
    Shutdown,
}

/// Wrapping applied to script replies before they are returned.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EnvelopeShape {
    Plain,
    Single,
    #[default]
    Double,
}

#[derive(Clone, Debug)]
enum Reply {
    Value(Value),
    Error(String),
}

struct ScriptRule {
    needle: String,
    replies: VecDeque<Reply>,
}

#[derive(Default)]
struct State {
    url: String,
    text: String,
    envelope: EnvelopeShape,
    redirects: HashMap<String, String>,
    scripts: Vec<ScriptRule>,
    elements: HashMap<ElementQuery, VecDeque<bool>>,
    not_interactable: bool,
    fail_close: bool,
    fail_download_setup: bool,
    next_id: u64,
    calls: Vec<PageCall>,
}

#[derive(Clone, Default)]
pub struct ScriptedPage {
    state: Arc<Mutex<State>>,
}

impl ScriptedPage {
    pub fn new() -> Self {
        let page = Self::default();
        page.state.lock().url = "about:blank".to_string();
        page
    }

    pub fn with_envelope(self, shape: EnvelopeShape) -> Self {
        self.state.lock().envelope = shape;
        self
    }

    pub fn set_url(&self, url: &str) {
        self.state.lock().url = url.to_string();
    }

    pub fn url(&self) -> String {
        self.state.lock().url.clone()
    }

    pub fn set_text(&self, text: &str) {
        self.state.lock().text = text.to_string();
    }

    /// `goto(from)` lands on `to`.
    pub fn redirect(&self, from: &str, to: &str) {
        self.state
            .lock()
            .redirects
            .insert(from.to_string(), to.to_string());
    }

    pub fn on_script(&self, needle: &str, reply: impl Into<Value>) {
        self.on_script_seq(needle, vec![reply.into()]);
    }

    pub fn on_script_seq(&self, needle: &str, replies: Vec<Value>) {
        self.push_rule(needle, replies.into_iter().map(Reply::Value).collect());
    }

    pub fn on_script_error(&self, needle: &str, message: &str) {
        self.push_rule(needle, VecDeque::from([Reply::Error(message.to_string())]));
    }

    /// Mixed sequence of replies and evaluation failures.
    pub fn on_script_results(&self, needle: &str, results: Vec<Result<Value, &str>>) {
        let replies = results
            .into_iter()
            .map(|result| match result {
                Ok(value) => Reply::Value(value),
                Err(message) => Reply::Error(message.to_string()),
            })
            .collect();
        self.push_rule(needle, replies);
    }

    pub fn set_element(&self, query: ElementQuery, present: bool) {
        self.set_element_seq(query, vec![present]);
    }

    pub fn set_element_seq(&self, query: ElementQuery, presence: Vec<bool>) {
        self.state.lock().elements.insert(query, presence.into());
    }

    pub fn set_interactable(&self, interactable: bool) {
        self.state.lock().not_interactable = !interactable;
    }

    pub fn fail_close(&self) {
        self.state.lock().fail_close = true;
    }

    pub fn fail_download_setup(&self) {
        self.state.lock().fail_download_setup = true;
    }

    pub fn calls(&self) -> Vec<PageCall> {
        self.state.lock().calls.clone()
    }

    pub fn scripts_containing(&self, needle: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| matches!(call, PageCall::Evaluate(script) if script.contains(needle)))
            .count()
    }

    fn push_rule(&self, needle: &str, replies: VecDeque<Reply>) {
        self.state.lock().scripts.push(ScriptRule {
            needle: needle.to_string(),
            replies,
        });
    }

    fn record(&self, call: PageCall) {
        self.state.lock().calls.push(call);
    }
}

fn next_in<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

fn wrap(shape: EnvelopeShape, value: Value) -> Value {
    match shape {
        EnvelopeShape::Plain => value,
        EnvelopeShape::Single => json!({ "result": value }),
        EnvelopeShape::Double => json!({ "result": { "result": { "value": value } } }),
    }
}

#[async_trait]
impl PageController for ScriptedPage {
    async fn goto(&self, url: &str) -> Result<(), AdapterError> {
        let mut state = self.state.lock();
        state.calls.push(PageCall::Goto(url.to_string()));
        let landed = state
            .redirects
            .get(url)
            .cloned()
            .unwrap_or_else(|| url.to_string());
        state.url = landed;
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<Value, AdapterError> {
        let mut state = self.state.lock();
        state.calls.push(PageCall::Evaluate(script.to_string()));
        let reply = state
            .scripts
            .iter_mut()
            .rev()
            .find(|rule| script.contains(&rule.needle))
            .and_then(|rule| next_in(&mut rule.replies));
        let value = match reply {
            Some(Reply::Value(value)) => value,
            Some(Reply::Error(message)) => {
                return Err(AdapterError::new(AdapterErrorKind::CdpIo).with_hint(message))
            }
            None if script.contains("window.location.href") => Value::String(state.url.clone()),
            None if script.contains("document.body.innerText") => {
                Value::String(state.text.clone())
            }
            None => Value::Null,
        };
        Ok(wrap(state.envelope, value))
    }

    async fn find(
        &self,
        query: &ElementQuery,
        _timeout: Duration,
    ) -> Result<Option<ElementHandle>, AdapterError> {
        let mut state = self.state.lock();
        state.calls.push(PageCall::Find(query.clone()));
        let present = state
            .elements
            .get_mut(query)
            .and_then(next_in)
            .unwrap_or(false);
        if !present {
            return Ok(None);
        }
        state.next_id += 1;
        Ok(Some(ElementHandle {
            id: state.next_id,
            query: query.clone(),
        }))
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), AdapterError> {
        self.record(PageCall::Click(element.query.clone()));
        Ok(())
    }

    async fn type_text(&self, element: &ElementHandle, text: &str) -> Result<(), AdapterError> {
        self.record(PageCall::TypeText(element.query.clone(), text.to_string()));
        Ok(())
    }

    async fn scroll_into_view(&self, element: &ElementHandle) -> Result<(), AdapterError> {
        self.record(PageCall::ScrollIntoView(element.query.clone()));
        Ok(())
    }

    async fn is_interactable(&self, _element: &ElementHandle) -> Result<bool, AdapterError> {
        Ok(!self.state.lock().not_interactable)
    }

    async fn reload(&self) -> Result<(), AdapterError> {
        self.record(PageCall::Reload);
        Ok(())
    }

    async fn set_download_dir(&self, dir: &Path) -> Result<(), AdapterError> {
        let mut state = self.state.lock();
        state.calls.push(PageCall::SetDownloadDir(dir.to_path_buf()));
        if state.fail_download_setup {
            return Err(AdapterError::cdp_io("Browser.setDownloadBehavior rejected"));
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), AdapterError> {
        let mut state = self.state.lock();
        state.calls.push(PageCall::Close);
        if state.fail_close {
            return Err(AdapterError::cdp_io("page already detached"));
        }
        Ok(())
    }
}

struct ScriptedProcess {
    page: ScriptedPage,
    fail: bool,
}

#[async_trait]
impl BrowserProcess for ScriptedProcess {
    async fn shutdown(&mut self) -> Result<(), AdapterError> {
        self.page.record(PageCall::Shutdown);
        if self.fail {
            return Err(AdapterError::new(AdapterErrorKind::Teardown).with_hint("browser hung"));
        }
        Ok(())
    }
}

/// Launcher that hands out one shared [`ScriptedPage`].
#[derive(Clone)]
pub struct ScriptedLauncher {
    page: ScriptedPage,
    fail_launch: bool,
    fail_shutdown: bool,
    launches: Arc<AtomicUsize>,
}

impl ScriptedLauncher {
    pub fn new(page: ScriptedPage) -> Self {
        Self {
            page,
            fail_launch: false,
            fail_shutdown: false,
            launches: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing_launch(mut self) -> Self {
        self.fail_launch = true;
        self
    }

    pub fn failing_shutdown(mut self) -> Self {
        self.fail_shutdown = true;
        self
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionLauncher for ScriptedLauncher {
    async fn launch(&self, _config: &SessionConfig) -> Result<LaunchedSession, AdapterError> {
        if self.fail_launch {
            return Err(AdapterError::new(AdapterErrorKind::Launch).with_hint("scripted failure"));
        }
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok(LaunchedSession {
            page: Arc::new(self.page.clone()),
            process: Box::new(ScriptedProcess {
                page: self.page.clone(),
                fail: self.fail_shutdown,
            }),
        })
    }
}
