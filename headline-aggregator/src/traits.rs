use crate::types::{ArticleView, FeedEntry, Result};
use async_trait::async_trait;
use std::time::Duration;

/// A feed that can be pulled for headline entries (RSS feeds, fixtures, etc.)
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Short key stamped on every article this source contributes
    fn key(&self) -> &str;

    /// Where the entries come from, for logging
    fn location(&self) -> &str;

    /// Fetch the current entries, in feed order
    async fn entries(&self) -> Result<Vec<FeedEntry>>;
}

/// Durable article storage with freshness reads and insert-time dedup.
#[async_trait]
pub trait ArticleCache: Send + Sync {
    /// Articles accepted strictly after `now - ttl`, in acceptance order.
    async fn fetch_fresh(&self, now: i64, ttl: Duration) -> Result<Vec<ArticleView>>;

    /// Insert every article whose link is not stored yet, stamped with `now`.
    /// Returns how many rows were inserted.
    async fn save_if_absent(&self, articles: &[ArticleView], now: i64) -> Result<usize>;
}
