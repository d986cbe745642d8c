//! smartlink-core - Core library for SmartLink
//!
//! This crate provides the data layer shared by the SDK, the CLI and the server:
//!
//! - **client**: Configuration API client (`ConfigApi`, reqwest-backed `ApiClient`)
//! - **cache**: Tag-aware cache over pluggable stores (memory, filesystem, SQLite)
//! - **gateway**: Cached fetches with tag derivation and invalidation directives
//! - **entity**: Apps, templates and versions with memoized configs and infos
//! - **lang**: Supported locale allow-list

pub mod cache;
pub mod client;
pub mod entity;
pub mod error;
pub mod gateway;
pub mod lang;
pub mod types;

// Re-export commonly used types
pub use cache::TaggedCache;
pub use entity::{Entity, StylesheetRequest};
pub use error::{Error, Result};
pub use gateway::{CacheDirective, ConfigGateway};
pub use types::{Channel, ChannelType, EntityRef, EntityType, Resource};
