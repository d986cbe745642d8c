//! SQLite cache store.
//!
//! A single `cache_items` table in WAL mode. Several processes can share the
//! same database file, which makes this the shared backend when more than one
//! SmartLink process serves the same entities.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use super::{expiry_from, now_millis, CacheError, CacheStore};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS cache_items (
    key TEXT PRIMARY KEY NOT NULL,
    value BLOB NOT NULL,
    expires_at INTEGER
);";

/// Store backed by a SQLite database.
///
/// Thread-safe via internal Mutex. All operations acquire the lock.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the cache database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrency
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        conn.busy_timeout(Duration::from_secs(5))?;

        Self::init(conn)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self, CacheError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, CacheError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Drop all expired rows, returning how many were removed
    pub fn purge_expired(&self) -> Result<usize, CacheError> {
        let conn = self.conn.lock().map_err(|_| CacheError::LockPoisoned)?;
        let removed = conn.execute(
            "DELETE FROM cache_items WHERE expires_at IS NOT NULL AND expires_at <= ?1",
            params![now_millis()],
        )?;
        Ok(removed)
    }
}

#[async_trait]
impl CacheStore for SqliteStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let conn = self.conn.lock().map_err(|_| CacheError::LockPoisoned)?;
        let row: Option<(Vec<u8>, Option<i64>)> = conn
            .query_row(
                "SELECT value, expires_at FROM cache_items WHERE key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((_, Some(expires_at))) if expires_at <= now_millis() => {
                conn.execute("DELETE FROM cache_items WHERE key = ?1", params![key])?;
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<(), CacheError> {
        let conn = self.conn.lock().map_err(|_| CacheError::LockPoisoned)?;
        conn.execute(
            "INSERT INTO cache_items (key, value, expires_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
            params![key, value, expiry_from(ttl)],
        )?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let conn = self.conn.lock().map_err(|_| CacheError::LockPoisoned)?;
        conn.execute("DELETE FROM cache_items WHERE key = ?1", params![key])?;
        Ok(())
    }
}
