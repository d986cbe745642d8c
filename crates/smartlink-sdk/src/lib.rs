//! SmartLink SDK - Shareable links for embeddable apps
//!
//! This crate turns an incoming request into a SmartLink: the share URL of
//! an app, template or version, and the target URL a visitor is sent to
//! depending on where they came from.
//!
//! # Core Modules (from smartlink-core)
//!
//! - **client** - Configuration API client
//! - **cache** - Tag-aware cache over memory, filesystem and SQLite stores
//! - **gateway** - Cached fetches and invalidation directives
//! - **entity** - Configs, infos, translations and channels of an entity
//!
//! # SDK Modules
//!
//! - **environment** - Website, page tab and direct environment resolution
//! - **session** - Cookie-backed sessions carried between requests
//! - **smartlink** - Share and target URL construction
//! - **collaborators** - User-agent classifier, link shortener, stylesheet compiler
//!
//! # Example
//!
//! ```rust,no_run
//! use smartlink_sdk::{RequestContext, SdkConfig, SmartLinkSdk};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let config = SdkConfig::load()?;
//!     let sdk = SmartLinkSdk::new(config)?;
//!
//!     let ctx = RequestContext::from_query_string("appId=5&ref=newsletter")
//!         .with_header("user-agent", "Mozilla/5.0 (iPhone; CPU iPhone OS 17_1 like Mac OS X)");
//!     let link = sdk.smartlink(&ctx).await?;
//!
//!     println!("{} -> {}", link.environment(), link.get_url_target()?);
//!     Ok(())
//! }
//! ```

// ─────────────────────────────────────────────────────────────────────────────
// Re-export core modules from smartlink-core
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration API client
pub use smartlink_core::client;

/// Tag-aware cache and stores
pub use smartlink_core::cache;

/// Cached fetches and invalidation directives
pub use smartlink_core::gateway;

/// Entities and their configuration data
pub use smartlink_core::entity;

/// Supported locales
pub use smartlink_core::lang;

/// Core types (EntityRef, Channel, etc.)
pub use smartlink_core::types;

/// Error types from core
pub use smartlink_core::error as core_error;

pub use smartlink_core::{
    CacheDirective, Channel, ChannelType, ConfigGateway, Entity, EntityRef, EntityType,
    Resource, StylesheetRequest, TaggedCache,
};

// ─────────────────────────────────────────────────────────────────────────────
// SDK-specific modules
// ─────────────────────────────────────────────────────────────────────────────

pub mod collaborators;
pub mod environment;
pub mod request;
pub mod session;
pub mod smartlink;

mod config;
mod error;
mod sdk;

// Re-export main SDK types
pub use config::{
    ApiSettings, CacheBackend, CacheSettings, ConfigValidationError, SdkConfig,
    ShortenerSettings, SmartLinkSettings,
};
pub use error::{SdkError, SdkResult};
pub use sdk::SmartLinkSdk;

pub use collaborators::{
    BitlyShortener, ClientInfo, HeuristicClassifier, LinkShortener, PlainCssCompiler,
    StylesheetCompiler, UserAgentClassifier,
};
pub use environment::{Device, Environment, EnvironmentResolver, ResolvedEnvironment};
pub use request::RequestContext;
pub use session::{SessionSnapshot, SetCookie};
pub use smartlink::{LinkSummary, MetaTag, ParamBag, SmartLinkBuilder};
