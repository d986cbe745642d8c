//! Device types and device resolution.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Visitor device class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    #[default]
    Desktop,
    Tablet,
    Mobile,
}

impl Device {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Tablet => "tablet",
            Self::Mobile => "mobile",
        }
    }

    /// Parse a `device` override; case-insensitive
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "desktop" => Some(Self::Desktop),
            "tablet" => Some(Self::Tablet),
            "mobile" => Some(Self::Mobile),
            _ => None,
        }
    }

    /// Page tabs only render on desktop
    pub fn supports_page_tabs(&self) -> bool {
        matches!(self, Self::Desktop)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pick the device: live override, then the restored session, then the classifier
pub fn resolve_device(live: Option<&str>, restored: Option<Device>, classified: Device) -> Device {
    live.and_then(Device::parse).or(restored).unwrap_or(classified)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_parse() {
        assert_eq!(Device::parse("Mobile"), Some(Device::Mobile));
        assert_eq!(Device::parse(" tablet "), Some(Device::Tablet));
        assert_eq!(Device::parse("phone"), None);
        assert!(Device::Desktop.supports_page_tabs());
        assert!(!Device::Tablet.supports_page_tabs());
    }

    #[test]
    fn test_resolve_device_precedence() {
        assert_eq!(resolve_device(Some("mobile"), Some(Device::Tablet), Device::Desktop), Device::Mobile);
        assert_eq!(resolve_device(Some("bogus"), Some(Device::Tablet), Device::Desktop), Device::Tablet);
        assert_eq!(resolve_device(None, None, Device::Desktop), Device::Desktop);
    }
}
