//! Command implementations for the smartlink CLI.
//!
//! Each submodule implements the logic for a command group. Shared here:
//! loading the effective configuration and building the SDK, optionally
//! over a fixture file instead of the live API.

pub mod config;
pub mod entity;
pub mod fetch;
pub mod invalidate;
pub mod url;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

use smartlink_core::client::StaticApi;
use smartlink_sdk::{SdkConfig, SmartLinkSdk};

use crate::cli::GlobalArgs;

/// Configuration from file and environment, with command line overrides
pub fn load_config(global: &GlobalArgs) -> Result<SdkConfig> {
    let mut config = match &global.config {
        Some(path) => {
            let mut config = SdkConfig::load_from(path)?;
            config.apply_env(|name| std::env::var(name).ok());
            config
        }
        None => SdkConfig::load()?,
    };

    if let Some(url) = &global.api_url {
        config.api.base_url = url.clone();
    }
    if let Some(url) = &global.base_url {
        config.smartlink.base_url = Some(url.clone());
    }
    Ok(config)
}

/// Fixture-backed API from a JSON object of routes
pub fn load_fixtures(path: &Path) -> Result<StaticApi> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read fixtures {}", path.display()))?;
    let fixtures: Value = serde_json::from_str(&content).context("Failed to parse fixtures")?;
    Ok(StaticApi::from_fixtures(&fixtures)?)
}

pub fn build_sdk(global: &GlobalArgs) -> Result<SmartLinkSdk> {
    let config = load_config(global)?;
    let sdk = match &global.fixtures {
        Some(path) => SmartLinkSdk::with_client(config, Arc::new(load_fixtures(path)?))?,
        None => SmartLinkSdk::new(config)?,
    };
    Ok(sdk)
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
