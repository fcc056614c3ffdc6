//! Local cache store for the monitors snapshot
//!
//! A single slot holds the last successful monitor fetch together with the
//! time it was stored. Reads through [`StatusCache::get`] honour the cache
//! duration; [`StatusCache::get_raw`] ignores it and is only meant for the
//! stale fallback after an upstream failure.
//!
//! The slot survives restarts. [`FileSlotStore`] keeps it as a JSON file in
//! the cache directory, created lazily on first use.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::clock::Clock;
use crate::monitor::MonitorRecord;

/// Identifier of the single monitors slot
pub const CACHE_KEY: &str = "system_monitors";

/// How long a stored snapshot counts as fresh
pub const DEFAULT_CACHE_DURATION: Duration = Duration::from_secs(5 * 60);

/// The cached monitors snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub payload: Vec<MonitorRecord>,
    pub stored_at_ms: u64,
}

/// Durable key-value storage for cache slots
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait SlotStore: Send + Sync {
    /// Load the slot, `None` if nothing has been stored
    async fn load(&self, key: &str) -> crate::Result<Option<CacheEntry>>;

    /// Overwrite the slot named by `entry.key`
    async fn store(&self, entry: &CacheEntry) -> crate::Result<()>;

    /// Delete the slot; deleting a missing slot is not an error
    async fn remove(&self, key: &str) -> crate::Result<()>;
}

/// Slot store keeping one JSON file per key
#[derive(Debug)]
pub struct FileSlotStore {
    dir: PathBuf,
    root: OnceCell<PathBuf>,
}

impl FileSlotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            root: OnceCell::new(),
        }
    }

    async fn root(&self) -> crate::Result<&Path> {
        let root = self
            .root
            .get_or_try_init(|| async {
                tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
                    crate::StatusBoardError::Cache(format!(
                        "Failed to create cache directory {:?}: {}",
                        self.dir, e
                    ))
                })?;
                tracing::debug!("Opened cache directory {:?}", self.dir);
                Ok::<_, crate::StatusBoardError>(self.dir.clone())
            })
            .await?;
        Ok(root.as_path())
    }

    fn slot_path(root: &Path, key: &str) -> PathBuf {
        root.join(format!("{}.json", key))
    }
}

#[async_trait]
impl SlotStore for FileSlotStore {
    async fn load(&self, key: &str) -> crate::Result<Option<CacheEntry>> {
        let path = Self::slot_path(self.root().await?, key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice::<CacheEntry>(&bytes) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                tracing::warn!("Ignoring corrupt cache slot {:?}: {}", path, e);
                Ok(None)
            }
        }
    }

    async fn store(&self, entry: &CacheEntry) -> crate::Result<()> {
        let root = self.root().await?;
        let path = Self::slot_path(root, &entry.key);
        let tmp = root.join(format!("{}.json.tmp", entry.key));

        let bytes = serde_json::to_vec(entry)?;
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> crate::Result<()> {
        let path = Self::slot_path(self.root().await?, key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Single-slot cache of the monitors snapshot
pub struct StatusCache {
    store: Arc<dyn SlotStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    last_stamp_ms: AtomicU64,
}

impl std::fmt::Debug for StatusCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusCache").field("ttl", &self.ttl).finish()
    }
}

impl StatusCache {
    pub fn new(store: Arc<dyn SlotStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            store,
            clock,
            ttl,
            last_stamp_ms: AtomicU64::new(0),
        }
    }

    /// Fresh, non-empty snapshot or `None`
    pub async fn get(&self) -> Option<CacheEntry> {
        let entry = self.get_raw().await?;
        if entry.payload.is_empty() {
            tracing::debug!("Cache slot is empty");
            return None;
        }

        let age_ms = self.clock.now_ms().saturating_sub(entry.stored_at_ms);
        if u128::from(age_ms) < self.ttl.as_millis() {
            tracing::debug!("Using cached monitors ({}s old)", age_ms / 1000);
            Some(entry)
        } else {
            tracing::debug!("Cached monitors expired ({}s old)", age_ms / 1000);
            None
        }
    }

    /// Snapshot regardless of age
    pub async fn get_raw(&self) -> Option<CacheEntry> {
        match self.store.load(CACHE_KEY).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Failed to read cache: {}", e);
                None
            }
        }
    }

    /// Overwrite the slot, returning false if it could not be persisted
    pub async fn set(&self, payload: Vec<MonitorRecord>) -> bool {
        let now = self.clock.now_ms();
        let previous = self.last_stamp_ms.fetch_max(now, Ordering::SeqCst);
        let entry = CacheEntry {
            key: CACHE_KEY.to_string(),
            payload,
            stored_at_ms: now.max(previous),
        };

        match self.store.store(&entry).await {
            Ok(()) => {
                tracing::debug!("Cached {} monitors", entry.payload.len());
                true
            }
            Err(e) => {
                tracing::warn!("Failed to write cache: {}", e);
                false
            }
        }
    }

    /// Remove the slot if it has outlived the cache duration
    pub async fn clear_expired(&self) -> bool {
        let entry = match self.store.load(CACHE_KEY).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return true,
            Err(e) => {
                tracing::warn!("Failed to read cache for expiry sweep: {}", e);
                return false;
            }
        };

        let age_ms = self.clock.now_ms().saturating_sub(entry.stored_at_ms);
        if u128::from(age_ms) < self.ttl.as_millis() {
            return true;
        }

        match self.store.remove(CACHE_KEY).await {
            Ok(()) => {
                tracing::debug!("Removed expired cache slot");
                true
            }
            Err(e) => {
                tracing::warn!("Failed to remove expired cache slot: {}", e);
                false
            }
        }
    }

    /// Age of the stored slot, fresh or not
    pub async fn age(&self) -> Option<Duration> {
        let entry = self.get_raw().await?;
        let age_ms = self.clock.now_ms().saturating_sub(entry.stored_at_ms);
        Some(Duration::from_millis(age_ms))
    }
}
