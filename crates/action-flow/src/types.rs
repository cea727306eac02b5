//! Flow pacing configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Fixed pauses and default bounds applied by the processor between and
/// around steps.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pacing {
    /// Pause after every navigation before the URL is inspected
    pub settle_ms: u64,
    /// Pause between consecutive steps (not after the last one)
    pub inter_step_ms: u64,
    /// Login wait bound when a step omits `login_timeout`
    pub login_timeout_secs: u64,
    /// Bound on the gateway block-page wait
    pub gateway_timeout_secs: u64,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            settle_ms: 3000,
            inter_step_ms: 2000,
            login_timeout_secs: 300,
            gateway_timeout_secs: 300,
        }
    }
}

impl Pacing {
    /// No settle or inter-step pauses; timeouts keep their defaults.
    pub fn immediate() -> Self {
        Self {
            settle_ms: 0,
            inter_step_ms: 0,
            ..Self::default()
        }
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn inter_step(&self) -> Duration {
        Duration::from_millis(self.inter_step_ms)
    }

    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.login_timeout_secs)
    }

    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_style_input_keeps_defaults() {
        let pacing: Pacing = serde_json::from_str(r#"{"settle_ms": 500}"#).unwrap();
        assert_eq!(pacing.settle(), Duration::from_millis(500));
        assert_eq!(pacing.inter_step(), Duration::from_secs(2));
        assert_eq!(pacing.login_timeout(), Duration::from_secs(300));
    }
}
