//! pageflow L0 CDP adapter.
//!
//! Exposes the narrow page-control surface the upper layers drive
//! ([`PageController`]), the script bridge that flattens evaluation envelopes
//! into strings, bounded polling helpers, and the scoped browser session used by
//! the workflow processor. The concrete transport is chromiumoxide; tests use the
//! scripted page from [`testing`].

pub mod bridge;
pub mod chromium;
pub mod error;
pub mod page;
pub mod session;
pub mod wait;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use bridge::{normalize_envelope, ScriptBridge};
pub use chromium::{ChromiumLauncher, ChromiumPage};
pub use error::{AdapterError, AdapterErrorKind};
pub use page::{ElementHandle, ElementQuery, PageController};
pub use session::{with_session, BrowserProcess, LaunchedSession, SessionConfig, SessionLauncher};
pub use wait::{poll_until, poll_until_true, PollPolicy, Probe};

use std::{env, path::PathBuf};
use which::which;

/// Locates a Chrome/Chromium binary: `PAGEFLOW_CHROME`, then `PATH`, then the
/// usual install locations (skipped when `PAGEFLOW_SKIP_OS_PATHS` is set).
pub fn detect_chrome_executable() -> Option<PathBuf> {
    if let Ok(raw) = env::var("PAGEFLOW_CHROME") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            let candidate = PathBuf::from(trimmed);
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    for name in chrome_executable_names() {
        if let Ok(path) = which(name) {
            return Some(path);
        }
    }

    let skip_defaults = env::var("PAGEFLOW_SKIP_OS_PATHS")
        .map(|value| !value.trim().is_empty())
        .unwrap_or(false);
    if skip_defaults {
        return None;
    }
    os_specific_chrome_paths()
        .into_iter()
        .find(|candidate| candidate.exists())
}

fn chrome_executable_names() -> &'static [&'static str] {
    #[cfg(target_os = "windows")]
    {
        &["chrome.exe", "chromium.exe", "msedge.exe"]
    }

    #[cfg(not(target_os = "windows"))]
    {
        &[
            "google-chrome-stable",
            "google-chrome",
            "chromium",
            "chromium-browser",
        ]
    }
}

fn os_specific_chrome_paths() -> Vec<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        ["PROGRAMFILES", "PROGRAMFILES(X86)", "LOCALAPPDATA"]
            .iter()
            .filter_map(|key| env::var(key).ok())
            .filter(|value| !value.trim().is_empty())
            .flat_map(|root| {
                let root = PathBuf::from(root.trim());
                [
                    root.join("Google/Chrome/Application/chrome.exe"),
                    root.join("Chromium/Application/chrome.exe"),
                ]
            })
            .collect()
    }

    #[cfg(target_os = "macos")]
    {
        vec![
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
            PathBuf::from("/Applications/Chromium.app/Contents/MacOS/Chromium"),
        ]
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        vec![
            PathBuf::from("/usr/bin/google-chrome-stable"),
            PathBuf::from("/usr/bin/google-chrome"),
            PathBuf::from("/usr/bin/chromium-browser"),
            PathBuf::from("/usr/bin/chromium"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::{chrome_executable_names, detect_chrome_executable};
    use std::{env, fs};
    use tempfile::tempdir;

    // Both cases touch process-wide env vars, so they run as one test.
    #[test]
    fn detects_from_env_var_then_path() {
        let dir = tempdir().unwrap();
        let saved: Vec<_> = ["PAGEFLOW_CHROME", "PAGEFLOW_SKIP_OS_PATHS", "PATH"]
            .into_iter()
            .map(|key| (key, env::var(key).ok()))
            .collect();

        let explicit = dir.path().join("my-chrome");
        fs::write(&explicit, b"").unwrap();
        env::set_var("PAGEFLOW_CHROME", explicit.to_string_lossy().to_string());
        let from_env = detect_chrome_executable();

        let bin_dir = dir.path().join("bin");
        fs::create_dir(&bin_dir).unwrap();
        let on_path = bin_dir.join(chrome_executable_names()[0]);
        fs::write(&on_path, b"").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&on_path, fs::Permissions::from_mode(0o755)).unwrap();
        }
        env::set_var("PAGEFLOW_CHROME", "");
        env::set_var("PAGEFLOW_SKIP_OS_PATHS", "1");
        env::set_var("PATH", &bin_dir);
        let from_path = detect_chrome_executable();

        for (key, value) in saved {
            match value {
                Some(value) => env::set_var(key, value),
                None => env::remove_var(key),
            }
        }
        assert_eq!(from_env, Some(explicit));
        assert_eq!(from_path, Some(on_path));
    }
}
