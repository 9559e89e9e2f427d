use crate::dedup::deduplicate;
use crate::filter::filter_by_title;
use crate::rss_utils::time::now_unix;
use crate::traits::{ArticleCache, FeedSource};
use crate::types::{AggregatorError, ArticleView, FeedEntry};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Cache-or-fetch orchestration over a set of feed sources.
pub struct HeadlineAggregator {
    cache: Arc<dyn ArticleCache>,
    sources: Vec<Box<dyn FeedSource>>,
    cache_ttl: Duration,
    source_timeout: Duration,
    // Held while refetching so concurrent misses share one round of fetches.
    refresh_lock: Mutex<()>,
}

impl HeadlineAggregator {
    pub fn new(
        cache: Arc<dyn ArticleCache>,
        sources: Vec<Box<dyn FeedSource>>,
        cache_ttl: Duration,
        source_timeout: Duration,
    ) -> Self {
        Self {
            cache,
            sources,
            cache_ttl,
            source_timeout,
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    pub fn source_keys(&self) -> Vec<&str> {
        self.sources.iter().map(|source| source.key()).collect()
    }

    /// Query entry point: current articles, filtered by title when `search`
    /// is given.
    pub async fn fetch_articles(&self, search: Option<&str>) -> Vec<ArticleView> {
        let articles = self.get_articles(self.cache_ttl, now_unix()).await;
        filter_by_title(articles, search)
    }

    /// Serve fresh cached articles, or refetch every source on a miss.
    ///
    /// Any fresh row counts as a hit. On a miss the sources are fetched,
    /// merged, written back with `now` as their acceptance time and returned
    /// even if the write fails.
    pub async fn get_articles(&self, ttl: Duration, now: i64) -> Vec<ArticleView> {
        if let Some(cached) = self.read_fresh(now, ttl).await {
            debug!("Cache hit: {} fresh articles", cached.len());
            return cached;
        }

        let _refresh = self.refresh_lock.lock().await;

        // Another request may have refilled the cache while we waited.
        if let Some(cached) = self.read_fresh(now, ttl).await {
            debug!("Cache refilled by a concurrent refresh: {} articles", cached.len());
            return cached;
        }

        info!("Cache miss, fetching {} sources", self.sources.len());
        let articles = self.collect_from_sources().await;

        match self.cache.save_if_absent(&articles, now).await {
            Ok(stored) => info!("Cached {} of {} fetched articles", stored, articles.len()),
            Err(e) => error!("Failed to cache fetched articles, serving them uncached: {}", e),
        }

        articles
    }

    /// Fetch every source concurrently and merge the results in source order.
    /// Failing or slow sources contribute nothing.
    pub async fn collect_from_sources(&self) -> Vec<ArticleView> {
        let pulls = self.sources.iter().map(|source| async move {
            let entries = self.pull_source(source.as_ref()).await;
            (source.key(), entries)
        });
        let batches = join_all(pulls).await;

        let articles = deduplicate(batches);
        info!("Collected {} unique articles", articles.len());
        articles
    }

    async fn pull_source(&self, source: &dyn FeedSource) -> Vec<FeedEntry> {
        let result = match tokio::time::timeout(self.source_timeout, source.entries()).await {
            Ok(result) => result,
            Err(_) => Err(AggregatorError::SourceTimeout {
                key: source.key().to_string(),
                after: self.source_timeout,
            }),
        };

        match result {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Skipping source {} ({}): {}", source.key(), source.location(), e);
                Vec::new()
            }
        }
    }

    async fn read_fresh(&self, now: i64, ttl: Duration) -> Option<Vec<ArticleView>> {
        match self.cache.fetch_fresh(now, ttl).await {
            Ok(articles) if !articles.is_empty() => Some(articles),
            Ok(_) => None,
            Err(e) => {
                error!("Cache read failed, treating as a miss: {}", e);
                None
            }
        }
    }
}
