//! Tagged cache on top of a [`CacheStore`].
//!
//! Store layout:
//!
//! - `entry:<key>`: JSON [`StoredEntry`] (value, tags with their version
//!   tokens at write time, expiry)
//! - `tag:<tag>`: JSON list of keys written under the tag
//! - `tagver:<tag>`: current version token of the tag
//!
//! Writes store the entry first and the tag indices second. Invalidation
//! replaces the tag's version token first and deletes indexed entries second,
//! so a concurrent writer that read the old token can never resurrect an
//! invalidated entry: `get` rejects entries whose recorded tokens are stale.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::{expiry_from, now_millis, CacheError, CacheStore};

/// Persisted form of a cache entry
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    value: Value,
    /// Tag -> version token at write time (`None` if the tag was never invalidated)
    tags: BTreeMap<String, Option<String>>,
    expires_at: Option<i64>,
    created_at: i64,
}

impl StoredEntry {
    fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Cache usage counters for one [`TaggedCache`] instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub invalidations: u64,
    /// Whether a backend failure switched the instance to pass-through
    pub degraded: bool,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Key-value cache with tag indices and tag-based invalidation.
pub struct TaggedCache {
    store: Arc<dyn CacheStore>,
    default_ttl: Option<Duration>,
    degraded: AtomicBool,
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    invalidations: AtomicU64,
}

fn entry_key(key: &str) -> String {
    format!("entry:{}", key)
}

fn index_key(tag: &str) -> String {
    format!("tag:{}", tag)
}

fn version_key(tag: &str) -> String {
    format!("tagver:{}", tag)
}

impl TaggedCache {
    /// Create a cache over `store`; entries written without explicit TTL use `default_ttl`
    pub fn new(store: Arc<dyn CacheStore>, default_ttl: Option<Duration>) -> Self {
        Self {
            store,
            default_ttl,
            degraded: AtomicBool::new(false),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
        }
    }

    /// Name of the backing store
    pub fn backend(&self) -> &'static str {
        self.store.name()
    }

    /// Whether a backend failure switched this instance to pass-through
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    /// Snapshot of the usage counters
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            degraded: self.is_degraded(),
        }
    }

    fn degrade(&self, operation: &str, err: &CacheError) {
        if !self.degraded.swap(true, Ordering::SeqCst) {
            warn!(
                "Cache backend '{}' failed during {}: {}; continuing without cache",
                self.store.name(),
                operation,
                err
            );
        }
    }

    fn miss(&self) -> Option<Value> {
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    /// Look up a value. Misses have no side effects.
    pub async fn get(&self, key: &str) -> Option<Value> {
        if self.is_degraded() {
            return self.miss();
        }

        match self.read_valid(key).await {
            Ok(Some(value)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Cache hit: {}", key);
                Some(value)
            }
            Ok(None) => {
                debug!("Cache miss: {}", key);
                self.miss()
            }
            Err(e) => {
                self.degrade("get", &e);
                self.miss()
            }
        }
    }

    async fn read_valid(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let Some(entry) = self.read_entry(key).await? else {
            return Ok(None);
        };

        if entry.is_expired(now_millis()) {
            self.discard(key, &entry).await?;
            return Ok(None);
        }

        for (tag, recorded) in &entry.tags {
            if self.tag_version(tag).await? != *recorded {
                debug!("Cache entry {} is stale for tag {}", key, tag);
                self.discard(key, &entry).await?;
                return Ok(None);
            }
        }

        Ok(Some(entry.value))
    }

    async fn read_entry(&self, key: &str) -> Result<Option<StoredEntry>, CacheError> {
        match self.store.get(&entry_key(key)).await? {
            Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            None => Ok(None),
        }
    }

    async fn tag_version(&self, tag: &str) -> Result<Option<String>, CacheError> {
        Ok(self
            .store
            .get(&version_key(tag))
            .await?
            .map(|raw| String::from_utf8_lossy(&raw).into_owned()))
    }

    async fn read_index(&self, tag: &str) -> Result<BTreeSet<String>, CacheError> {
        match self.store.get(&index_key(tag)).await? {
            Some(raw) => Ok(serde_json::from_slice(&raw)?),
            None => Ok(BTreeSet::new()),
        }
    }

    /// Keys currently indexed under `tag`
    pub async fn tagged_keys(&self, tag: &str) -> BTreeSet<String> {
        match self.read_index(tag).await {
            Ok(keys) => keys,
            Err(e) => {
                self.degrade("tag lookup", &e);
                BTreeSet::new()
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Store `value` under `key`, indexed by every tag in `tags`.
    ///
    /// Returns whether the value was cached. Backend failures are logged,
    /// degrade the instance and never leave the key indexed under a tag it
    /// was not stored against.
    pub async fn set(&self, key: &str, value: Value, tags: &BTreeSet<String>) -> bool {
        self.set_with_ttl(key, value, tags, self.default_ttl).await
    }

    /// [`TaggedCache::set`] with an explicit TTL
    pub async fn set_with_ttl(
        &self,
        key: &str,
        value: Value,
        tags: &BTreeSet<String>,
        ttl: Option<Duration>,
    ) -> bool {
        if self.is_degraded() {
            return false;
        }

        match self.write(key, value, tags, ttl).await {
            Ok(()) => {
                self.writes.fetch_add(1, Ordering::Relaxed);
                debug!("Cached {} under {} tag(s)", key, tags.len());
                true
            }
            Err(e) => {
                self.degrade("set", &e);
                false
            }
        }
    }

    async fn write(
        &self,
        key: &str,
        value: Value,
        tags: &BTreeSet<String>,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let mut versions = BTreeMap::new();
        for tag in tags {
            versions.insert(tag.clone(), self.tag_version(tag).await?);
        }

        let previous = self.read_entry(key).await?;

        let entry = StoredEntry {
            value,
            tags: versions,
            expires_at: expiry_from(ttl),
            created_at: now_millis(),
        };
        // Entries never expire in the store; `expires_at` governs expiry
        self.store
            .set(&entry_key(key), serde_json::to_vec(&entry)?, None)
            .await?;

        let mut indexed = Vec::with_capacity(tags.len());
        for tag in tags {
            if let Err(e) = self.index_add(tag, key).await {
                self.rollback(key, &indexed).await;
                return Err(e);
            }
            indexed.push(tag.as_str());
        }

        if let Some(previous) = previous {
            for old_tag in previous.tags.keys().filter(|t| !tags.contains(*t)) {
                if let Err(e) = self.index_remove(old_tag, key).await {
                    debug!("Could not unindex {} from {}: {}", key, old_tag, e);
                }
            }
        }

        Ok(())
    }

    /// Undo a half-written entry: value first, then whatever index got written
    async fn rollback(&self, key: &str, indexed: &[&str]) {
        if let Err(e) = self.store.delete(&entry_key(key)).await {
            warn!("Failed to roll back cache entry {}: {}", key, e);
        }
        for tag in indexed {
            if let Err(e) = self.index_remove(tag, key).await {
                warn!("Failed to roll back index {} for {}: {}", tag, key, e);
            }
        }
    }

    async fn index_add(&self, tag: &str, key: &str) -> Result<(), CacheError> {
        let mut keys = self.read_index(tag).await?;
        if keys.insert(key.to_string()) {
            self.store
                .set(&index_key(tag), serde_json::to_vec(&keys)?, None)
                .await?;
        }
        Ok(())
    }

    async fn index_remove(&self, tag: &str, key: &str) -> Result<(), CacheError> {
        let mut keys = self.read_index(tag).await?;
        if !keys.remove(key) {
            return Ok(());
        }
        if keys.is_empty() {
            self.store.delete(&index_key(tag)).await
        } else {
            self.store
                .set(&index_key(tag), serde_json::to_vec(&keys)?, None)
                .await
        }
    }

    /// Delete an entry and drop it from every tag index it participated in
    async fn discard(&self, key: &str, entry: &StoredEntry) -> Result<(), CacheError> {
        self.store.delete(&entry_key(key)).await?;
        for tag in entry.tags.keys() {
            self.index_remove(tag, key).await?;
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Invalidation
    // ─────────────────────────────────────────────────────────────────────────

    /// Remove every entry currently tagged with `tag`.
    ///
    /// Runs even when the instance is degraded. Returns whether every
    /// backend operation succeeded.
    pub async fn invalidate_tag(&self, tag: &str) -> bool {
        match self.invalidate(tag).await {
            Ok(removed) => {
                self.invalidations.fetch_add(1, Ordering::Relaxed);
                debug!("Invalidated tag {} ({} entries)", tag, removed);
                true
            }
            Err(e) => {
                self.degrade("invalidate", &e);
                false
            }
        }
    }

    /// Invalidate each tag in turn; idempotent and order-independent
    pub async fn invalidate_tags<I, S>(&self, tags: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ok = true;
        for tag in tags {
            ok &= self.invalidate_tag(tag.as_ref()).await;
        }
        ok
    }

    async fn invalidate(&self, tag: &str) -> Result<usize, CacheError> {
        // New token first: from here on every entry recorded under the old
        // token is stale, whether or not it made it into the index.
        let token = uuid::Uuid::new_v4().to_string();
        self.store
            .set(&version_key(tag), token.into_bytes(), None)
            .await?;

        let keys = self.read_index(tag).await?;
        for key in &keys {
            match self.read_entry(key).await {
                Ok(Some(entry)) => self.discard(key, &entry).await?,
                Ok(None) => {}
                // Unreadable entries are still removed
                Err(CacheError::Serialization(_)) => self.store.delete(&entry_key(key)).await?,
                Err(e) => return Err(e),
            }
        }
        self.store.delete(&index_key(tag)).await?;

        Ok(keys.len())
    }
}
