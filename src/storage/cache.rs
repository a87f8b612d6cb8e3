//! On-disk caching of release-year lookups

use crate::error::Result;
use crate::types::CacheEntry;
use crate::utils::paths::ensure_dir;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Release years do not change; keep them for 30 days
const YEAR_TTL: u64 = 30 * 24 * 3600;

/// Generate cache key from query
pub fn get_cache_key(query: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(query.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn cache_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{}.json", key))
}

/// Get cached data if present and not expired
pub async fn get_cached<T: serde::de::DeserializeOwned>(dir: &Path, key: &str) -> Option<T> {
    let path = cache_path(dir, key);

    if !path.exists() {
        return None;
    }

    let content = fs::read_to_string(&path).await.ok()?;
    let entry: CacheEntry<T> = serde_json::from_str(&content).ok()?;

    let now = Utc::now().timestamp();
    if now - entry.timestamp > entry.ttl as i64 {
        let _ = fs::remove_file(&path).await;
        return None;
    }

    Some(entry.data)
}

/// Set cache data
pub async fn set_cache<T: serde::Serialize>(dir: &Path, key: &str, data: &T, ttl: u64) -> Result<()> {
    ensure_dir(&dir.to_string_lossy()).await?;

    let entry = CacheEntry {
        data,
        timestamp: Utc::now().timestamp(),
        ttl,
    };

    let content = serde_json::to_string(&entry)?;
    fs::write(cache_path(dir, key), content).await?;
    Ok(())
}

/// Year lookups keyed by search title. A cached `None` means "looked up, unknown".
#[derive(Debug, Clone)]
pub struct YearCache {
    dir: PathBuf,
    ttl: u64,
}

impl YearCache {
    pub fn new(dir: &str) -> Self {
        Self {
            dir: PathBuf::from(dir),
            ttl: YEAR_TTL,
        }
    }

    pub async fn get(&self, title: &str) -> Option<Option<u16>> {
        get_cached(&self.dir, &get_cache_key(&format!("year:{}", title))).await
    }

    pub async fn set(&self, title: &str, year: Option<u16>) -> Result<()> {
        set_cache(&self.dir, &get_cache_key(&format!("year:{}", title)), &year, self.ttl).await
    }

    /// Clear all cached years
    pub async fn clear(&self) -> Result<()> {
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir).await?;
        }
        Ok(())
    }
}
