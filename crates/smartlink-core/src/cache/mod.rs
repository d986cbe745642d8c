//! Tag-aware cache for configuration API responses.
//!
//! The cache is split in two layers:
//!
//! - [`CacheStore`]: a dumb byte key-value store (in-memory, filesystem or
//!   SQLite). Stores know nothing about tags.
//! - [`TaggedCache`]: entries, tag indices and tag versions on top of any store.
//!
//! # Tags
//!
//! Every entry is written with a set of tags (`app.5`, `app.5.configs`,
//! `appTemplate.3`, ...). Invalidating a tag removes every entry that carried
//! it at write time. Each tag also has a version token; entries remember the
//! tokens they were written under and are treated as misses once any of them
//! changes, so an invalidation is authoritative even when it races a write
//! from another process.
//!
//! # Failure Model
//!
//! Backend errors never reach business logic. The first failing operation
//! logs a warning and degrades the [`TaggedCache`] instance to pass-through:
//! every later `get` is a miss and writes are skipped.

mod file;
mod keys;
#[cfg(feature = "sqlite")]
mod sqlite;
mod store;
mod tagged;

pub use file::FileStore;
pub use keys::cache_key;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
pub use store::{CacheStore, MemoryStore};
pub use tagged::{CacheStats, TaggedCache};

use thiserror::Error;

/// Storage-layer errors
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache IO error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "sqlite")]
    #[error("cache database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("cache lock poisoned")]
    LockPoisoned,

    #[error("cache backend error: {0}")]
    Backend(String),
}

/// Current time in epoch milliseconds, used for entry expiry
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Absolute expiry for a TTL starting now
pub(crate) fn expiry_from(ttl: Option<std::time::Duration>) -> Option<i64> {
    ttl.map(|ttl| now_millis() + ttl.as_millis() as i64)
}
