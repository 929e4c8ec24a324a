// Notification engine with a short-lived cache in front
use crate::{config::CacheConfig, engine::NotificationEngine, notification::NotificationFeed, Result};
use chrono::Duration;
use infrawatch_cache::CacheManager;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const FEED_CACHE_KEY: &str = "notifications";

/// Engine that checks the cache before hitting the store
///
/// Only successful feeds are stored, and only entries younger than the TTL
/// are served. If the store is down and the cache is stale, the caller sees
/// the failure rather than yesterday's numbers.
pub struct CachedNotificationEngine {
    engine: NotificationEngine,
    cache: Option<Arc<CacheManager>>,
    ttl: Duration,
}

impl CachedNotificationEngine {
    pub fn new(engine: NotificationEngine) -> Self {
        Self {
            engine,
            cache: None,
            ttl: Duration::zero(),
        }
    }

    pub fn with_cache(engine: NotificationEngine, cache: CacheManager, ttl: Duration) -> Self {
        Self {
            engine,
            cache: Some(Arc::new(cache)),
            ttl,
        }
    }

    /// Open the configured cache in front of `engine`
    ///
    /// A cache that can't be opened is logged and skipped; the feed still
    /// gets built, just without caching.
    pub fn from_config(engine: NotificationEngine, config: &CacheConfig) -> Self {
        if !config.enabled {
            return Self::new(engine);
        }

        match open_cache(config) {
            Ok(cache) => Self::with_cache(engine, cache, config.ttl()),
            Err(e) => {
                warn!("Feed cache unavailable, running without it: {}", e);
                Self::new(engine)
            }
        }
    }

    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    /// Cache-first feed
    pub async fn run(&self) -> Result<NotificationFeed> {
        if let Some(cache) = &self.cache {
            debug!("Checking cache for {}", FEED_CACHE_KEY);
            match cache.get::<NotificationFeed>(FEED_CACHE_KEY, self.ttl) {
                Ok(Some(feed)) => {
                    info!("Cache hit! Serving {} cached notifications", feed.summary.total);
                    return Ok(feed);
                }
                Ok(None) => debug!("Cache miss"),
                Err(e) => warn!("Cache read failed, going to the store: {}", e),
            }
        }

        let feed = self.engine.run().await?;

        if let Some(cache) = &self.cache {
            match cache.set(FEED_CACHE_KEY, &feed) {
                Ok(()) => debug!("Cached feed with {} notifications", feed.summary.total),
                Err(e) => warn!("Failed to cache feed: {}", e),
            }
        }

        Ok(feed)
    }

    /// Drop whatever is cached so the next run goes to the store
    pub fn invalidate(&self) -> Result<()> {
        if let Some(cache) = &self.cache {
            cache.invalidate(FEED_CACHE_KEY)?;
        }
        Ok(())
    }
}

fn open_cache(config: &CacheConfig) -> Result<CacheManager> {
    let path = config.resolved_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let cache = CacheManager::new(&path)?;
    match cache.purge_expired(config.ttl()) {
        Ok(0) => {}
        Ok(n) => debug!("Purged {} stale cache entries", n),
        Err(e) => warn!("Failed to purge cache: {}", e),
    }
    Ok(cache)
}
