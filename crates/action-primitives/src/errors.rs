//! Error types for action primitives

use cdp_adapter::AdapterError;
use thiserror::Error;

/// Failure modes of a registered action.
///
/// `Display` output is the user-facing reason recorded on the step result, so
/// the element and timeout variants carry their message verbatim.
#[derive(Debug, Error, Clone)]
pub enum ActionError {
    /// Input field, button, or download link could not be resolved
    #[error("{0}")]
    ElementNotFound(String),

    /// Bounded wait elapsed (response generation, download polling)
    #[error("{0}")]
    Timeout(String),

    /// No handler registered under the requested step type
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// Local filesystem failure while persisting an artifact
    #[error("{0}")]
    Io(String),

    /// Page controller failure
    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

impl ActionError {
    pub fn is_unknown_action(&self) -> bool {
        matches!(self, ActionError::UnknownAction(_))
    }

    pub(crate) fn io(context: impl std::fmt::Display, err: std::io::Error) -> Self {
        ActionError::Io(format!("{context}: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdp_adapter::AdapterErrorKind;

    #[test]
    fn reasons_render_verbatim() {
        assert_eq!(
            ActionError::ElementNotFound("Button not found".into()).to_string(),
            "Button not found"
        );
        assert_eq!(
            ActionError::UnknownAction("hover".into()).to_string(),
            "Unknown action: hover"
        );
        let adapter = AdapterError::new(AdapterErrorKind::CdpIo).with_hint("socket closed");
        assert_eq!(
            ActionError::from(adapter).to_string(),
            "cdp i/o failure: socket closed"
        );
    }
}
