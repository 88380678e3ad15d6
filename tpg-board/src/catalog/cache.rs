//! Disk-based cache for the raw catalog feed.
//!
//! One opaque record is kept: the raw feed text plus the fetch timestamp.
//! Parsing happens on every `get()`, not at write time, so the persisted
//! format stays independent of the parser's evolution.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::client::CatalogFeed;
use super::error::CatalogError;
use super::parse::{CatalogEntry, parse_catalog};

/// Default retention window: 30 days.
const DEFAULT_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// The parsed stop catalog plus the time its raw feed was fetched.
///
/// Immutable once built; a refresh builds a whole new value.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub entries: Vec<CatalogEntry>,
    pub fetched_at: DateTime<Utc>,
}

impl Catalog {
    /// Iterate over the entries that participate in matching.
    pub fn active_entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter().filter(|e| e.active)
    }
}

/// The on-disk record: raw feed text and a fetch timestamp.
#[derive(Debug, Serialize, Deserialize)]
struct CachedFeed {
    fetched_at_secs: u64,
    raw: String,
}

/// Configuration for the catalog disk cache.
#[derive(Debug, Clone)]
pub struct CatalogCacheConfig {
    /// Path to the cache file.
    pub path: PathBuf,
    /// How long the cached feed remains valid.
    pub ttl: Duration,
}

impl CatalogCacheConfig {
    /// Create a new cache config with the given path and default TTL (30 days).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ttl: DEFAULT_TTL,
        }
    }

    /// Set a custom TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

impl Default for CatalogCacheConfig {
    fn default() -> Self {
        Self::new("arrets_cache.json")
    }
}

/// Disk cache over a catalog feed source.
#[derive(Debug, Clone)]
pub struct CatalogCache<C> {
    config: CatalogCacheConfig,
    client: C,
}

impl<C: CatalogFeed> CatalogCache<C> {
    /// Create a new catalog cache backed by the given feed client.
    pub fn new(config: CatalogCacheConfig, client: C) -> Self {
        Self { config, client }
    }

    /// Return the catalog, fetching the feed if the cached copy is missing
    /// or older than the retention window.
    ///
    /// Once a refresh has been attempted and failed, the error propagates;
    /// no stale copy is served.
    pub async fn get(&self) -> Result<Catalog, CatalogError> {
        if let Some(cached) = self.load_fresh() {
            debug!(path = %self.config.path.display(), "using cached catalog feed");
            return self.build(cached);
        }

        self.fetch_and_store().await
    }

    /// Discard the persisted copy without fetching. The next `get()` forces
    /// a network round-trip.
    pub fn invalidate(&self) {
        // A missing file is already the invalidated state.
        let _ = std::fs::remove_file(&self.config.path);
    }

    /// Discard the persisted copy and fetch unconditionally.
    pub async fn force_refresh(&self) -> Result<Catalog, CatalogError> {
        self.invalidate();
        self.fetch_and_store().await
    }

    /// Get the cache file path.
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    async fn fetch_and_store(&self) -> Result<Catalog, CatalogError> {
        let raw = self.client.fetch_raw().await?;

        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map_err(|_| CatalogError::Cache {
                message: "system time before unix epoch".to_string(),
            })?
            .as_secs();

        let record = CachedFeed {
            fetched_at_secs: now,
            raw,
        };

        self.store(&record)?;
        debug!(path = %self.config.path.display(), "fresh catalog feed fetched and cached");
        self.build(record)
    }

    /// Load the disk record if it exists, parses, and is within the TTL.
    fn load_fresh(&self) -> Option<CachedFeed> {
        let contents = std::fs::read_to_string(&self.config.path).ok()?;
        let cached: CachedFeed = serde_json::from_str(&contents).ok()?;

        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .ok()?
            .as_secs();

        let age_secs = now.saturating_sub(cached.fetched_at_secs);
        if age_secs >= self.config.ttl.as_secs() {
            return None;
        }

        Some(cached)
    }

    fn store(&self, record: &CachedFeed) -> Result<(), CatalogError> {
        if let Some(parent) = self.config.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| CatalogError::Cache {
                message: format!("failed to create cache directory: {}", e),
            })?;
        }

        let json = serde_json::to_string(record).map_err(|e| CatalogError::Cache {
            message: format!("failed to serialize cache: {}", e),
        })?;

        std::fs::write(&self.config.path, json).map_err(|e| CatalogError::Cache {
            message: format!("failed to write cache file: {}", e),
        })
    }

    /// Parse a record into a catalog. An empty parse means the feed text is
    /// unusable, which counts as unavailability rather than an empty network.
    fn build(&self, record: CachedFeed) -> Result<Catalog, CatalogError> {
        let entries = parse_catalog(&record.raw);
        if entries.is_empty() {
            return Err(CatalogError::Unavailable {
                message: "catalog feed parsed to zero entries".to_string(),
            });
        }

        Ok(Catalog {
            entries,
            fetched_at: DateTime::from_timestamp(record.fetched_at_secs as i64, 0)
                .unwrap_or_else(Utc::now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    const FEED: &str = "\
id;stop;municipality;code;zone;coords;active
1001;Gare Cornavin;Genève;GC;10;46.2102,6.1422;Y
1002;Bel-Air;Genève;BA;10;46.2043,6.1411;Y
";

    /// Feed stub counting how many network fetches were made.
    struct StubFeed {
        raw: String,
        fetches: AtomicUsize,
        fail: bool,
    }

    impl StubFeed {
        fn new(raw: &str) -> Self {
            Self {
                raw: raw.to_string(),
                fetches: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                raw: String::new(),
                fetches: AtomicUsize::new(0),
                fail: true,
            }
        }

        fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    impl CatalogFeed for &StubFeed {
        async fn fetch_raw(&self) -> Result<String, CatalogError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(CatalogError::Feed {
                    status: 503,
                    message: "unavailable".to_string(),
                });
            }
            Ok(self.raw.clone())
        }
    }

    #[tokio::test]
    async fn first_get_fetches_then_serves_from_disk() {
        let dir = tempdir().unwrap();
        let feed = StubFeed::new(FEED);
        let cache = CatalogCache::new(
            CatalogCacheConfig::new(dir.path().join("arrets.json")),
            &feed,
        );

        let catalog = cache.get().await.unwrap();
        assert_eq!(catalog.entries.len(), 2);
        assert_eq!(feed.fetch_count(), 1);

        let again = cache.get().await.unwrap();
        assert_eq!(again.entries.len(), 2);
        assert_eq!(feed.fetch_count(), 1, "second get must hit the disk copy");
    }

    #[tokio::test]
    async fn expired_copy_triggers_refetch() {
        let dir = tempdir().unwrap();
        let feed = StubFeed::new(FEED);
        let config =
            CatalogCacheConfig::new(dir.path().join("arrets.json")).with_ttl(Duration::ZERO);
        let cache = CatalogCache::new(config, &feed);

        cache.get().await.unwrap();
        cache.get().await.unwrap();
        assert_eq!(feed.fetch_count(), 2);
    }

    #[tokio::test]
    async fn invalidate_forces_network_roundtrip() {
        let dir = tempdir().unwrap();
        let feed = StubFeed::new(FEED);
        let cache = CatalogCache::new(
            CatalogCacheConfig::new(dir.path().join("arrets.json")),
            &feed,
        );

        cache.get().await.unwrap();
        cache.invalidate();
        cache.get().await.unwrap();
        assert_eq!(feed.fetch_count(), 2);
    }

    #[tokio::test]
    async fn force_refresh_always_fetches() {
        let dir = tempdir().unwrap();
        let feed = StubFeed::new(FEED);
        let cache = CatalogCache::new(
            CatalogCacheConfig::new(dir.path().join("arrets.json")),
            &feed,
        );

        cache.get().await.unwrap();
        cache.force_refresh().await.unwrap();
        assert_eq!(feed.fetch_count(), 2);
    }

    #[tokio::test]
    async fn failed_refresh_propagates_without_stale_fallback() {
        let dir = tempdir().unwrap();
        let feed = StubFeed::failing();
        let cache = CatalogCache::new(
            CatalogCacheConfig::new(dir.path().join("arrets.json")),
            &feed,
        );

        assert!(cache.get().await.is_err());
    }

    #[tokio::test]
    async fn empty_feed_is_unavailable() {
        let dir = tempdir().unwrap();
        let feed = StubFeed::new("header only\n");
        let cache = CatalogCache::new(
            CatalogCacheConfig::new(dir.path().join("arrets.json")),
            &feed,
        );

        match cache.get().await {
            Err(CatalogError::Unavailable { .. }) => {}
            other => panic!("expected Unavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("dir").join("arrets.json");
        let feed = StubFeed::new(FEED);
        let cache = CatalogCache::new(CatalogCacheConfig::new(&path), &feed);

        cache.get().await.unwrap();
        assert!(path.exists());
    }
}
