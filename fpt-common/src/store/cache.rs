//! Local key-value cache
//!
//! Holds the last known-good matrix snapshot under two keys: the serialized
//! rows and the ISO-8601 modification stamp. A cached table is always a
//! complete table that some source once served or accepted.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::Snapshot;
use crate::model::Row;
use crate::time;
use crate::{Error, Result};

/// Cache key holding the serialized table
pub const MATRIX_DATA_KEY: &str = "feature-matrix-data";

/// Cache key holding the table's modification stamp
pub const LAST_UPDATED_KEY: &str = "feature-matrix-last-updated";

/// Key-value persistence private to one client/process
#[async_trait]
pub trait LocalCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Read the cached snapshot.
///
/// Missing data reads as `None`. Unparseable data is an error: the cache
/// answered, but with something unusable.
pub async fn load_snapshot(cache: &dyn LocalCache) -> Result<Option<Snapshot>> {
    let Some(raw) = cache.get(MATRIX_DATA_KEY).await? else {
        return Ok(None);
    };

    let rows: Vec<Row> = serde_json::from_str(&raw)?;
    let last_modified = cache
        .get(LAST_UPDATED_KEY)
        .await?
        .and_then(|value| time::parse_iso(&value));

    Ok(Some(Snapshot {
        rows,
        last_modified,
    }))
}

/// Modification stamp of the cached snapshot, without reading the rows
pub async fn load_stamp(cache: &dyn LocalCache) -> Result<Option<DateTime<Utc>>> {
    Ok(cache
        .get(LAST_UPDATED_KEY)
        .await?
        .and_then(|value| time::parse_iso(&value)))
}

/// Write a full snapshot (rows first, then the stamp)
pub async fn store_snapshot(
    cache: &dyn LocalCache,
    rows: &[Row],
    stamp: DateTime<Utc>,
) -> Result<()> {
    let json = serde_json::to_string(rows)?;
    cache.set(MATRIX_DATA_KEY, &json).await?;
    cache.set(LAST_UPDATED_KEY, &time::to_iso(stamp)).await?;
    debug!("Cached {} matrix rows stamped {}", rows.len(), time::to_iso(stamp));
    Ok(())
}

/// Drop the cached snapshot
pub async fn clear_snapshot(cache: &dyn LocalCache) -> Result<()> {
    cache.remove(MATRIX_DATA_KEY).await?;
    cache.remove(LAST_UPDATED_KEY).await
}

/// One file per key inside a cache directory
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(Error::InvalidInput(format!("Invalid cache key: {key:?}")));
        }
        Ok(self.dir.join(format!("{key}.cache")))
    }
}

#[async_trait]
impl LocalCache for FileCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        // Write-then-rename so a crash never leaves a half-written value
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, value).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!("Failed to remove cache entry {}: {}", path.display(), e);
                Err(e.into())
            }
        }
    }
}

/// Process-local cache, used when no cache directory is wanted
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocalCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}
