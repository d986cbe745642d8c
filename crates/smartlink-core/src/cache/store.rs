//! Cache storage backends trait and in-memory store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

use super::{expiry_from, now_millis, CacheError};

/// Byte key-value storage backing a [`super::TaggedCache`].
///
/// Implementations must tolerate concurrent readers and writers (from other
/// tasks or other processes for shared backends). Concurrent `set`s on the
/// same key resolve last-write-wins.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    /// Read a value; expired values are misses
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Write a value, replacing any previous one
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<(), CacheError>;

    /// Remove a value; removing a missing key is not an error
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

struct MemoryItem {
    value: Vec<u8>,
    expires_at: Option<i64>,
}

impl MemoryItem {
    fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Process-local store.
#[derive(Default)]
pub struct MemoryStore {
    items: RwLock<HashMap<String, MemoryItem>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (non-expired) keys
    pub async fn len(&self) -> usize {
        let now = now_millis();
        self.items
            .read()
            .await
            .values()
            .filter(|item| !item.is_expired(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of stored keys, expired ones included
    #[cfg(test)]
    async fn stored(&self) -> usize {
        self.items.read().await.len()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let now = now_millis();
        {
            let items = self.items.read().await;
            match items.get(key) {
                Some(item) if !item.is_expired(now) => return Ok(Some(item.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Expired: drop it unless a writer replaced it in the meantime
        let mut items = self.items.write().await;
        if items.get(key).is_some_and(|item| item.is_expired(now)) {
            items.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut items = self.items.write().await;
        items.insert(
            key.to_string(),
            MemoryItem {
                value,
                expires_at: expiry_from(ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.items.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.get("k").await.unwrap().is_none());

        store.set("k", b"v1".to_vec(), None).await.unwrap();
        store.set("k", b"v2".to_vec(), None).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"v2".to_vec()));
        assert_eq!(store.len().await, 1);

        store.delete("k").await.unwrap();
        store.delete("k").await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_memory_store_expiry() {
        let store = MemoryStore::new();
        store
            .set("k", b"v".to_vec(), Some(Duration::from_millis(0)))
            .await
            .unwrap();
        assert!(store.get("k").await.unwrap().is_none());
        assert_eq!(store.stored().await, 0);
    }
}
