//! Fail-open TTL cache with single-flight refresh.
//!
//! Shared by the adapters that download a whole listing once and answer many
//! queries from it (the site directory and the release feed). The cache is built
//! once per process and handed to those adapters.
//!
//! Rules:
//! - fresh value: served directly, concurrent readers never wait on each other
//! - expired value: the first caller refreshes, later callers get the stale value
//!   instead of starting a second download
//! - failed refresh: the stale value keeps being served until the next attempt

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::Config;
use crate::metrics::CACHE_REFRESHES;
use crate::sources::{FaircampDirectory, FaircampSite, FeedItem, MirloFeed, SourceError};

struct Entry<T> {
    value: Arc<T>,
    fetched_at: Instant,
}

/// TTL cache that serves stale data rather than failing.
pub struct FailOpenCache<T> {
    name: &'static str,
    ttl: Duration,
    entry: RwLock<Option<Entry<T>>>,
    refresh: Mutex<()>,
}

impl<T> FailOpenCache<T> {
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            ttl,
            entry: RwLock::new(None),
            refresh: Mutex::new(()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current value regardless of age.
    pub async fn peek(&self) -> Option<Arc<T>> {
        self.entry.read().await.as_ref().map(|e| Arc::clone(&e.value))
    }

    /// Whether a value exists and is younger than the TTL.
    pub async fn is_fresh(&self) -> bool {
        self.fresh().await.is_some()
    }

    /// Replace the cached value.
    pub async fn put(&self, value: T) -> Arc<T> {
        let value = Arc::new(value);
        *self.entry.write().await = Some(Entry {
            value: Arc::clone(&value),
            fetched_at: Instant::now(),
        });
        value
    }

    /// Drop the cached value so the next read refreshes.
    pub async fn invalidate(&self) {
        *self.entry.write().await = None;
    }

    async fn fresh(&self) -> Option<Arc<T>> {
        let guard = self.entry.read().await;
        guard
            .as_ref()
            .filter(|e| e.fetched_at.elapsed() < self.ttl)
            .map(|e| Arc::clone(&e.value))
    }

    /// Return the cached value, refreshing it with `fetch` when expired.
    ///
    /// Returns `None` only when nothing was ever fetched successfully.
    pub async fn get_or_refresh<F, Fut>(&self, fetch: F) -> Option<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        if let Some(value) = self.fresh().await {
            return Some(value);
        }

        let _guard = match self.refresh.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                // Someone else is refreshing. Serve stale if we have it, otherwise
                // wait for their result rather than starting a second download.
                if let Some(stale) = self.peek().await {
                    debug!(cache = self.name, "Refresh in flight, serving stale value");
                    return Some(stale);
                }
                let _wait = self.refresh.lock().await;
                return self.peek().await;
            }
        };

        // Another caller may have finished a refresh while we were checking.
        if let Some(value) = self.fresh().await {
            return Some(value);
        }

        debug!(cache = self.name, "Refreshing cache");
        match fetch().await {
            Ok(value) => {
                CACHE_REFRESHES.with_label_values(&[self.name, "success"]).inc();
                Some(self.put(value).await)
            }
            Err(e) => {
                CACHE_REFRESHES.with_label_values(&[self.name, "failed"]).inc();
                let stale = self.peek().await;
                warn!(
                    cache = self.name,
                    error = %e,
                    serving_stale = stale.is_some(),
                    "Cache refresh failed"
                );
                stale
            }
        }
    }
}

/// Process-wide caches handed to the adapters that share them.
#[derive(Clone)]
pub struct SourceCaches {
    pub faircamp_directory: Arc<FailOpenCache<Vec<FaircampSite>>>,
    pub mirlo_feed: Arc<FailOpenCache<Vec<FeedItem>>>,
}

impl SourceCaches {
    pub fn new(config: &Config) -> Self {
        Self {
            faircamp_directory: FaircampDirectory::new_cache(&config.sources.faircamp),
            mirlo_feed: MirloFeed::new_cache(&config.sources.mirlo),
        }
    }
}
