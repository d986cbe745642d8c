//! Application state.

use anyhow::{Context, Result};
use serde_json::Value;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Instant;

use smartlink_core::client::StaticApi;
use smartlink_sdk::SmartLinkSdk;

use crate::config::Config;

/// Shared application state
pub struct AppState {
    /// Server configuration
    pub config: Arc<Config>,
    /// SDK shared by all requests; each request gets its own cache instance
    pub sdk: Arc<SmartLinkSdk>,
    /// Server start time
    pub start_time: Instant,
    /// SmartLink requests answered
    pub requests_served: AtomicU64,
}

impl AppState {
    pub fn new(config: Config, sdk: SmartLinkSdk) -> Arc<Self> {
        Arc::new(Self {
            config: Arc::new(config),
            sdk: Arc::new(sdk),
            start_time: Instant::now(),
            requests_served: AtomicU64::new(0),
        })
    }

    /// Build the SDK from config, over fixtures when configured
    pub fn from_config(config: Config) -> Result<Arc<Self>> {
        let sdk = match &config.fixtures {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read fixtures {}", path.display()))?;
                let fixtures: Value =
                    serde_json::from_str(&content).context("Failed to parse fixtures")?;
                let api = StaticApi::from_fixtures(&fixtures)?;
                SmartLinkSdk::with_client(config.sdk.clone(), Arc::new(api))?
            }
            None => SmartLinkSdk::new(config.sdk.clone())?,
        };
        Ok(Self::new(config, sdk))
    }
}
