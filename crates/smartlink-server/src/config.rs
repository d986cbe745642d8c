//! Server configuration.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;

use smartlink_sdk::SdkConfig;

const DEFAULT_BIND: &str = "127.0.0.1:8787";

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Listen address (`SMARTLINK_BIND`)
    pub bind: SocketAddr,
    /// Fixture routes served instead of the live API (`SMARTLINK_FIXTURES`)
    pub fixtures: Option<PathBuf>,
    /// SDK settings from the shared config file and environment
    pub sdk: SdkConfig,
}

impl Config {
    /// Load configuration from the SDK config file and environment
    pub fn load() -> Result<Self> {
        Self::from_lookup(SdkConfig::load()?, |name| std::env::var(name).ok())
    }

    pub fn from_lookup(sdk: SdkConfig, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bind = lookup("SMARTLINK_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind
            .parse()
            .with_context(|| format!("Invalid SMARTLINK_BIND address '{}'", bind))?;

        Ok(Self {
            bind,
            fixtures: lookup("SMARTLINK_FIXTURES").filter(|p| !p.is_empty()).map(PathBuf::from),
            sdk,
        })
    }

    /// Path the entry file is served under, e.g. `/smartlink.php`
    pub fn entry_path(&self) -> String {
        format!("/{}", self.sdk.smartlink.entry_file.trim_start_matches('/'))
    }
}
