//! Name → handler dispatch table for step types.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use cdp_adapter::PageController;
use pageflow_core_types::StepParams;
use tracing::{debug, warn};

use crate::errors::ActionError;
use crate::primitives::{ClickAction, DownloadAction, ExtractAction, InputAction, WaitResponseAction};
use crate::types::{ActionReport, Tempo};

/// One unit of page work, reachable under one or more step types.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn run(
        &self,
        page: &dyn PageController,
        params: &StepParams,
    ) -> Result<ActionReport, ActionError>;
}

/// Built once at startup, then shared read-only with the processor.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    handlers: HashMap<String, Arc<dyn ActionHandler>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the built-in actions and their aliases.
    pub fn with_builtins(tempo: Tempo) -> Self {
        let mut registry = Self::new();
        registry.register(
            "input",
            Arc::new(InputAction::new(tempo.clone())),
            &["type", "fill"],
        );
        registry.register("click", Arc::new(ClickAction::new(tempo.clone())), &["press"]);
        registry.register(
            "wait_response",
            Arc::new(WaitResponseAction::new(tempo.clone())),
            &[],
        );
        registry.register("extract", Arc::new(ExtractAction), &["scrape"]);
        registry.register("download", Arc::new(DownloadAction), &[]);
        registry
    }

    /// Installs `handler` under `name` and every alias. An existing entry under
    /// any of those keys is replaced.
    pub fn register(&mut self, name: &str, handler: Arc<dyn ActionHandler>, aliases: &[&str]) {
        for key in std::iter::once(name).chain(aliases.iter().copied()) {
            if self
                .handlers
                .insert(key.to_string(), Arc::clone(&handler))
                .is_some()
            {
                warn!(action = key, "action re-registered; previous handler replaced");
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub async fn execute(
        &self,
        name: &str,
        page: &dyn PageController,
        params: &StepParams,
    ) -> Result<ActionReport, ActionError> {
        let handler = self
            .handlers
            .get(name)
            .ok_or_else(|| ActionError::UnknownAction(name.to_string()))?;
        debug!(action = name, "dispatching action");
        handler.run(page, params).await
    }

    /// Every installed key, aliases included, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }
}
