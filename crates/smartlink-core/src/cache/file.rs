//! Filesystem cache store.
//!
//! One file per key under `<dir>/<xx>/<md5>.cache`. Each file starts with an
//! 8-byte big-endian expiry timestamp in epoch milliseconds (0 = never)
//! followed by the raw value. Writes go to a unique temp file that is renamed
//! over the target, so readers in other processes never observe a torn value.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use super::{expiry_from, now_millis, CacheError, CacheStore};

const HEADER_LEN: usize = 8;

/// Store backed by a cache directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir`, creating the directory if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Cache directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let digest = format!("{:x}", md5::compute(key.as_bytes()));
        self.dir.join(&digest[..2]).join(format!("{}.cache", digest))
    }

    fn encode(value: &[u8], expires_at: Option<i64>) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN + value.len());
        buf.extend_from_slice(&expires_at.unwrap_or(0).to_be_bytes());
        buf.extend_from_slice(value);
        buf
    }

    fn decode(raw: Vec<u8>) -> Result<(Option<i64>, Vec<u8>), CacheError> {
        if raw.len() < HEADER_LEN {
            return Err(CacheError::Backend("truncated cache file".into()));
        }
        let mut header = [0u8; HEADER_LEN];
        header.copy_from_slice(&raw[..HEADER_LEN]);
        let expires_at = match i64::from_be_bytes(header) {
            0 => None,
            at => Some(at),
        };
        Ok((expires_at, raw[HEADER_LEN..].to_vec()))
    }
}

#[async_trait]
impl CacheStore for FileStore {
    fn name(&self) -> &'static str {
        "filesystem"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let path = self.path_for(key);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let (expires_at, value) = Self::decode(raw)?;
        if expires_at.is_some_and(|at| at <= now_millis()) {
            debug!("Expired cache file {:?}", path);
            self.delete(key).await?;
            return Ok(None);
        }
        Ok(Some(value))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<(), CacheError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, Self::encode(&value, expiry_from(ttl))).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
