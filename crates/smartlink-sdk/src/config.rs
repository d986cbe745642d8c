//! SDK Configuration
//!
//! Configuration is loaded from multiple sources with precedence:
//! 1. Environment variables (`SMARTLINK_API_KEY`, `SMARTLINK_API_URL`)
//! 2. Config file (`SMARTLINK_CONFIG`, or `config.toml` in the platform config dir)
//! 3. Default values

use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use smartlink_core::lang;

use crate::SdkResult;

/// SDK configuration options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SdkConfig {
    /// Configuration API connection
    #[serde(default)]
    pub api: ApiSettings,

    /// Response cache
    #[serde(default)]
    pub cache: CacheSettings,

    /// Link construction and session cookies
    #[serde(default)]
    pub smartlink: SmartLinkSettings,

    /// Link shortening
    #[serde(default)]
    pub shortener: ShortenerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Base URL of the configuration API
    #[serde(default = "default_api_url")]
    pub base_url: String,

    /// Bearer token for the API
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds (default: 10)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_api_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Cache store selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Memory,
    Filesystem,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default)]
    pub backend: CacheBackend,

    /// Directory (filesystem) or database file (sqlite)
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Entry lifetime in seconds; unset keeps entries until invalidated
    #[serde(default)]
    pub ttl_secs: Option<u64>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            dir: None,
            ttl_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmartLinkSettings {
    /// Public base URL the entry file is served from
    #[serde(default)]
    pub base_url: Option<String>,

    /// Entry file appended to the base URL (default: smartlink.php)
    #[serde(default = "default_entry_file")]
    pub entry_file: String,

    /// Session cookie name prefix (default: smartlink_)
    #[serde(default = "default_cookie_prefix")]
    pub cookie_prefix: String,

    /// Session cookie lifetime in seconds (default: 3600 = 1 hour)
    #[serde(default = "default_cookie_ttl_secs")]
    pub cookie_ttl_secs: u64,

    /// App id used for page tabs when the request carries none
    #[serde(default)]
    pub facebook_app_id: Option<String>,

    /// Language used when the request names none
    #[serde(default = "default_lang")]
    pub default_lang: String,
}

impl Default for SmartLinkSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            entry_file: default_entry_file(),
            cookie_prefix: default_cookie_prefix(),
            cookie_ttl_secs: default_cookie_ttl_secs(),
            facebook_app_id: None,
            default_lang: default_lang(),
        }
    }
}

impl SmartLinkSettings {
    pub fn cookie_ttl(&self) -> Duration {
        Duration::from_secs(self.cookie_ttl_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShortenerSettings {
    /// bit.ly access token; shortening is disabled without one
    #[serde(default)]
    pub bitly_token: Option<String>,
}

// Default value functions
fn default_api_url() -> String {
    "http://localhost:8080/api/v2".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_entry_file() -> String {
    "smartlink.php".to_string()
}

fn default_cookie_prefix() -> String {
    "smartlink_".to_string()
}

fn default_cookie_ttl_secs() -> u64 {
    3600 // 1 hour
}

fn default_lang() -> String {
    lang::DEFAULT_LANG.to_string()
}

fn default_config_dir() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("com", "smartlink", "smartlink") {
        proj_dirs.config_dir().to_path_buf()
    } else {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".smartlink")
    }
}

impl SdkConfig {
    /// Create a config for an API endpoint and key
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let mut config = Self::default();
        config.api.base_url = base_url.into();
        config.api.api_key = api_key;
        config
    }

    /// Set the public base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.smartlink.base_url = Some(base_url.into());
        self
    }

    /// Set cache configuration
    pub fn with_cache(mut self, cache: CacheSettings) -> Self {
        self.cache = cache;
        self
    }

    /// Load configuration from file and environment.
    pub fn load() -> SdkResult<Self> {
        let path = Self::config_path();
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Self::default()
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Load a TOML file without environment overrides
    pub fn load_from(path: &Path) -> SdkResult<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> SdkResult<Self> {
        let config = toml::from_str(content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Apply `SMARTLINK_*` overrides from an environment lookup
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("SMARTLINK_API_KEY").filter(|k| !k.is_empty()) {
            self.api.api_key = Some(key);
        }
        if let Some(url) = lookup("SMARTLINK_API_URL").filter(|u| !u.is_empty()) {
            self.api.base_url = url;
        }
    }

    /// Get the config file path.
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("SMARTLINK_CONFIG") {
            PathBuf::from(path)
        } else {
            default_config_dir().join("config.toml")
        }
    }

    /// Render as TOML
    pub fn to_toml(&self) -> SdkResult<String> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        Ok(content)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache.ttl_secs.map(Duration::from_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigValidationError::MissingApiUrl);
        }

        if self.api.timeout_secs == 0 {
            return Err(ConfigValidationError::InvalidValue {
                field: "api.timeout_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        if self.cache.backend != CacheBackend::Memory && self.cache.dir.is_none() {
            return Err(ConfigValidationError::MissingCacheLocation(self.cache.backend));
        }

        if self.cache.ttl_secs == Some(0) {
            return Err(ConfigValidationError::InvalidValue {
                field: "cache.ttl_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        if self.smartlink.cookie_ttl_secs == 0 {
            return Err(ConfigValidationError::InvalidValue {
                field: "smartlink.cookie_ttl_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        if self.smartlink.entry_file.is_empty() {
            return Err(ConfigValidationError::InvalidValue {
                field: "smartlink.entry_file".into(),
                message: "must not be empty".into(),
            });
        }

        if !lang::is_supported(&self.smartlink.default_lang) {
            return Err(ConfigValidationError::InvalidValue {
                field: "smartlink.default_lang".into(),
                message: format!("unsupported language '{}'", self.smartlink.default_lang),
            });
        }

        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("api.base_url is required")]
    MissingApiUrl,

    #[error("cache.dir is required for the {0:?} backend")]
    MissingCacheLocation(CacheBackend),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}
