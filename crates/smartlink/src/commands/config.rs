//! Configuration commands.

use anyhow::Result;
use colored::Colorize;

use smartlink_sdk::SdkConfig;

use super::load_config;
use crate::cli::{ConfigAction, ConfigCommand, GlobalArgs};

/// Effective config with secrets masked
fn redacted(mut config: SdkConfig) -> SdkConfig {
    if config.api.api_key.is_some() {
        config.api.api_key = Some("********".into());
    }
    if config.shortener.bitly_token.is_some() {
        config.shortener.bitly_token = Some("********".into());
    }
    config
}

pub fn execute(cmd: ConfigCommand, global: &GlobalArgs) -> Result<()> {
    match cmd.action {
        ConfigAction::Show => {
            let config = load_config(global)?;
            print!("{}", redacted(config).to_toml()?);
        }
        ConfigAction::Path => {
            let path = global.config.clone().unwrap_or_else(SdkConfig::config_path);
            let state = if path.exists() {
                "✓ exists".green()
            } else {
                "○ not found (using defaults)".yellow()
            };
            println!("{} {}", path.display(), state);
        }
        ConfigAction::Check => {
            let config = load_config(global)?;
            match config.validate() {
                Ok(()) => println!("{}", "✓ Configuration is valid".green()),
                Err(e) => {
                    println!("{}", format!("✗ {}", e).red());
                    anyhow::bail!("invalid configuration");
                }
            }
        }
    }
    Ok(())
}
