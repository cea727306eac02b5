//! Site classification and the host/selector profile the handlers consult.

use serde::{Deserialize, Serialize};

use cdp_adapter::bridge::js_string;

/// Which authentication handler a URL calls for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteKind {
    Generic,
    TargetSite,
    Gateway,
}

/// Hosts, markers and selectors of the target application and the network
/// gateway in front of it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteProfile {
    /// URL substrings that select the target-site handler.
    pub target_markers: Vec<String>,
    pub app_host: String,
    pub identity_provider_host: String,
    pub auth_host: String,
    /// Zero-content interstitial the gateway bounces the app through.
    pub gateway_redirect_url: String,
    /// URL/page-text marker of the gateway; also the handler selector.
    pub gateway_keyword: String,
    pub gateway_form_selector: String,
    pub gateway_error_class: String,
    pub logged_in_selectors: Vec<String>,
    pub logged_in_texts: Vec<String>,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            target_markers: vec!["chatgpt".into(), "openai".into()],
            app_host: "chatgpt.com".into(),
            identity_provider_host: "uim.jp.nttdata.com".into(),
            auth_host: "auth.openai.com".into(),
            gateway_redirect_url: "https://chat.openai.com/?_sm_nck=1".into(),
            gateway_keyword: "zscaler".into(),
            gateway_form_selector: "form[action*=\"zscaler.net\"]".into(),
            gateway_error_class: "error-code".into(),
            logged_in_selectors: vec![
                "[data-testid=\"accounts-profile-button\"]".into(),
                "[data-testid=\"sidebar-item-library\"]".into(),
                "#prompt-textarea".into(),
            ],
            logged_in_texts: vec!["Log out".into(), "ログアウト".into()],
        }
    }
}

impl SiteProfile {
    /// Picks the handler variant for `url` by marker containment.
    pub fn classify(&self, url: &str) -> SiteKind {
        classify(url, self)
    }

    /// Script answering `logged_in` when any logged-in probe matches.
    pub fn logged_in_script(&self) -> String {
        let mut script = String::new();
        for selector in &self.logged_in_selectors {
            script.push_str(&format!(
                "if (document.querySelector({})) return 'logged_in';\n",
                js_string(selector)
            ));
        }
        script.push_str("const bodyText = document.body.innerText || '';\n");
        for text in &self.logged_in_texts {
            script.push_str(&format!(
                "if (bodyText.includes({})) return 'logged_in';\n",
                js_string(text)
            ));
        }
        script.push_str("return 'not_logged_in';");
        script
    }

    /// Whether `url` is the gateway's zero-content interstitial, with or
    /// without the scheme.
    pub fn is_gateway_redirect(&self, url: &str) -> bool {
        let marker = self
            .gateway_redirect_url
            .split_once("://")
            .map_or(self.gateway_redirect_url.as_str(), |(_, rest)| rest);
        !marker.is_empty() && url.contains(marker)
    }

    pub fn gateway_submit_script(&self) -> String {
        format!(
            "const form = document.querySelector({});\nif (form) {{\n    form.submit();\n    return 'submitted';\n}}\nreturn 'no_form';",
            js_string(&self.gateway_form_selector)
        )
    }
}

/// Pure classification: target-site markers first, then the gateway keyword.
pub fn classify(url: &str, profile: &SiteProfile) -> SiteKind {
    let url = url.to_lowercase();
    let has = |marker: &String| !marker.is_empty() && url.contains(&marker.to_lowercase());
    if profile.target_markers.iter().any(has) {
        SiteKind::TargetSite
    } else if has(&profile.gateway_keyword) {
        SiteKind::Gateway
    } else {
        SiteKind::Generic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_marker() {
        let profile = SiteProfile::default();
        assert_eq!(classify("https://chatgpt.com/", &profile), SiteKind::TargetSite);
        assert_eq!(
            classify("https://auth.OpenAI.com/log-in", &profile),
            SiteKind::TargetSite
        );
        assert_eq!(
            classify("https://gateway.zscaler.net/auth", &profile),
            SiteKind::Gateway
        );
        assert_eq!(classify("https://example.com/login", &profile), SiteKind::Generic);
    }

    #[test]
    fn partial_profile_keeps_defaults() {
        let profile: SiteProfile =
            serde_json::from_value(serde_json::json!({"app_host": "chat.example.org"})).unwrap();
        assert_eq!(profile.app_host, "chat.example.org");
        assert_eq!(profile.gateway_keyword, "zscaler");
    }

    #[test]
    fn redirect_match_ignores_scheme() {
        let profile = SiteProfile::default();
        assert!(profile.is_gateway_redirect("https://chat.openai.com/?_sm_nck=1"));
        assert!(profile.is_gateway_redirect("http://chat.openai.com/?_sm_nck=1&x=2"));
        assert!(!profile.is_gateway_redirect("https://chat.openai.com/"));
    }

    #[test]
    fn logged_in_script_lists_every_probe() {
        let script = SiteProfile::default().logged_in_script();
        assert!(script.contains(r#"document.querySelector("[data-testid=\"accounts-profile-button\"]")"#));
        assert!(script.contains(r##"document.querySelector("#prompt-textarea")"##));
        assert!(script.contains(r#"bodyText.includes("ログアウト")"#));
        assert!(script.ends_with("return 'not_logged_in';"));
    }
}
