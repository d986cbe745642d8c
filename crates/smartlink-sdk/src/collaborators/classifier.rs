//! User-agent classification.

use serde::{Deserialize, Serialize};

use crate::environment::Device;

/// What a classifier tells about the visitor's client
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClientInfo {
    pub device: Device,
    pub browser_name: String,
    pub browser_version: String,
    pub os: String,
}

/// Classifies user-agent strings
pub trait UserAgentClassifier: Send + Sync {
    fn classify(&self, user_agent: &str) -> ClientInfo;
}

/// Substring heuristics over the user-agent string.
///
/// Unknown agents classify as a desktop with `Unknown` browser and OS.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicClassifier;

// (token, browser name); first match wins, so order matters
const BROWSERS: &[(&str, &str)] = &[
    ("edg/", "Edge"),
    ("opr/", "Opera"),
    ("firefox/", "Firefox"),
    ("fxios/", "Firefox"),
    ("crios/", "Chrome"),
    ("chrome/", "Chrome"),
    ("version/", "Safari"),
    ("msie ", "Internet Explorer"),
    ("rv:", "Internet Explorer"),
];

/// Whether the lowercased agent `ua` belongs to the browser `name` found by `token`
fn matches(ua: &str, token: &str, name: &str) -> bool {
    if !ua.contains(token) {
        return false;
    }
    match (token, name) {
        // Safari's version token also appears in other WebKit agents
        (_, "Safari") => ua.contains("safari/"),
        ("rv:", _) => ua.contains("trident/"),
        _ => true,
    }
}

fn version_after(ua: &str, token: &str) -> String {
    ua.find(token)
        .map(|i| {
            ua[i + token.len()..]
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '.')
                .collect()
        })
        .unwrap_or_default()
}

fn device_of(ua: &str) -> Device {
    if ua.contains("ipad") || ua.contains("tablet") || (ua.contains("android") && !ua.contains("mobile")) {
        Device::Tablet
    } else if ["mobi", "iphone", "ipod", "android", "windows phone"]
        .iter()
        .any(|t| ua.contains(t))
    {
        Device::Mobile
    } else {
        Device::Desktop
    }
}

fn os_of(ua: &str) -> &'static str {
    if ua.contains("windows") {
        "Windows"
    } else if ua.contains("iphone") || ua.contains("ipad") || ua.contains("ipod") {
        "iOS"
    } else if ua.contains("mac os x") {
        "macOS"
    } else if ua.contains("android") {
        "Android"
    } else if ua.contains("linux") {
        "Linux"
    } else {
        "Unknown"
    }
}

impl UserAgentClassifier for HeuristicClassifier {
    fn classify(&self, user_agent: &str) -> ClientInfo {
        let ua = user_agent.to_ascii_lowercase();

        let (browser_name, browser_version) = BROWSERS
            .iter()
            .find(|(token, name)| matches(&ua, token, name))
            .map(|(token, name)| (name.to_string(), version_after(&ua, token)))
            .unwrap_or_else(|| ("Unknown".to_string(), String::new()));

        ClientInfo {
            device: device_of(&ua),
            browser_name,
            browser_version,
            os: os_of(&ua).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME_WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.6099.109 Safari/537.36";
    const SAFARI_IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Mobile/15E148 Safari/604.1";
    const FIREFOX_ANDROID_TABLET: &str = "Mozilla/5.0 (Android 13; Tablet; rv:121.0) Gecko/121.0 Firefox/121.0";
    const EDGE_MAC: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.2210.77";

    #[test]
    fn test_classify_desktop_browsers() {
        let info = HeuristicClassifier.classify(CHROME_WINDOWS);
        assert_eq!(info.device, Device::Desktop);
        assert_eq!(info.browser_name, "Chrome");
        assert_eq!(info.browser_version, "120.0.6099.109");
        assert_eq!(info.os, "Windows");

        let info = HeuristicClassifier.classify(EDGE_MAC);
        assert_eq!(info.browser_name, "Edge");
        assert_eq!(info.os, "macOS");
    }

    #[test]
    fn test_classify_mobile_and_tablet() {
        let info = HeuristicClassifier.classify(SAFARI_IPHONE);
        assert_eq!(info.device, Device::Mobile);
        assert_eq!(info.browser_name, "Safari");
        assert_eq!(info.browser_version, "17.1");
        assert_eq!(info.os, "iOS");

        let info = HeuristicClassifier.classify(FIREFOX_ANDROID_TABLET);
        assert_eq!(info.device, Device::Tablet);
        assert_eq!(info.browser_name, "Firefox");
        assert_eq!(info.os, "Android");
    }

    #[test]
    fn test_classify_unknown() {
        let info = HeuristicClassifier.classify("");
        assert_eq!(info.device, Device::Desktop);
        assert_eq!(info.browser_name, "Unknown");
        assert!(info.browser_version.is_empty());
        assert_eq!(info.os, "Unknown");
    }

    #[test]
    fn test_browser_token_matching() {
        assert!(matches("mozilla/5.0 version/17.1 safari/604.1", "version/", "Safari"));
        assert!(!matches("mozilla/5.0 version/4.0 chrome/120.0", "version/", "Safari"));
        assert!(matches("mozilla/5.0 (windows nt 10.0; trident/7.0; rv:11.0)", "rv:", "Internet Explorer"));
        assert!(!matches("mozilla/5.0 (android 13; rv:121.0) gecko/121.0", "rv:", "Internet Explorer"));
        assert!(!matches("mozilla/5.0", "chrome/", "Chrome"));
    }
}
