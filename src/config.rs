//! Configuration management module
//!
//! One YAML file with four sections; every field is optional and falls back
//! to the defaults below.

use std::path::{Path, PathBuf};
use std::time::Duration;

use action_flow::Pacing;
use action_primitives::Tempo;
use auth_gate::SiteProfile;
use cdp_adapter::SessionConfig;
use serde::{Deserialize, Serialize};

/// Top-level configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub browser: BrowserSection,
    pub pacing: Pacing,
    pub tempo: Tempo,
    pub site: SiteProfile,
}

/// Browser launch settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSection {
    /// Explicit Chrome/Chromium binary; autodetected when unset
    pub executable: Option<PathBuf>,
    /// Persistent profile directory (keeps login cookies between runs)
    pub profile_dir: Option<PathBuf>,
    pub window_width: u32,
    pub window_height: u32,
    pub extra_args: Vec<String>,
    pub grace_period_ms: u64,
}

impl Default for BrowserSection {
    fn default() -> Self {
        Self {
            executable: None,
            profile_dir: None,
            window_width: 1920,
            window_height: 1080,
            extra_args: Vec::new(),
            grace_period_ms: 2000,
        }
    }
}

impl BrowserSection {
    /// `~/.browser_profiles/default` unless configured.
    pub fn profile_dir(&self) -> PathBuf {
        self.profile_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".browser_profiles")
                .join("default")
        })
    }
}

impl Config {
    /// Session settings for one run writing into `output_dir`.
    pub fn session_config(&self, output_dir: &Path, headless: bool) -> SessionConfig {
        let browser = &self.browser;
        let mut session = SessionConfig::new(browser.profile_dir(), output_dir).headless(headless);
        session.executable = browser.executable.clone();
        session.window = (browser.window_width, browser.window_height);
        session.extra_args = browser.extra_args.clone();
        session.grace_period = Duration::from_millis(browser.grace_period_ms);
        session
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_are_optional() {
        let config: Config = serde_yaml::from_str(
            "browser:\n  window_width: 1280\npacing:\n  inter_step_ms: 0\nsite:\n  app_host: chat.example.org\n",
        )
        .unwrap();
        assert_eq!(config.browser.window_width, 1280);
        assert_eq!(config.browser.window_height, 1080);
        assert_eq!(config.pacing.inter_step_ms, 0);
        assert_eq!(config.pacing.settle_ms, 3000);
        assert_eq!(config.site.app_host, "chat.example.org");
        assert_eq!(config.site.gateway_keyword, "zscaler");
    }

    #[test]
    fn session_config_carries_browser_section() {
        let mut config = Config::default();
        config.browser.profile_dir = Some(PathBuf::from("/tmp/profile"));
        config.browser.extra_args = vec!["--lang=ja".into()];
        config.browser.grace_period_ms = 500;

        let session = config.session_config(Path::new("/tmp/out"), true);

        assert!(session.headless);
        assert_eq!(session.profile_dir, PathBuf::from("/tmp/profile"));
        assert_eq!(session.download_dir, PathBuf::from("/tmp/out"));
        assert_eq!(session.grace_period, Duration::from_millis(500));
        assert!(session.launch_args().contains(&"--lang=ja".to_string()));
    }

    #[test]
    fn default_profile_lives_under_home() {
        let dir = BrowserSection::default().profile_dir();
        assert!(dir.ends_with(".browser_profiles/default"));
    }
}
