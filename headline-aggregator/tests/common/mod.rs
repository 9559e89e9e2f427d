#![allow(dead_code)]

use async_trait::async_trait;
use headline_aggregator::{
    AggregatorError, ArticleCache, ArticleStore, ArticleView, FeedEntry, FeedSource, Result,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;
use tempfile::TempDir;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// A SQLite database file living as long as the value.
pub struct TestDb {
    _dir: TempDir,
    pub url: String,
}

impl TestDb {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("articles.db").display());
        Self { _dir: dir, url }
    }

    pub async fn connect(&self) -> ArticleStore {
        ArticleStore::connect(&self.url).await.expect("connect store")
    }

    pub async fn initialized_store(&self) -> ArticleStore {
        let store = self.connect().await;
        store.initialize().await.expect("initialize store");
        store
    }

    pub async fn table_exists(&self, name: &str) -> bool {
        let count: i64 = self
            .scalar(&format!(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '{}'",
                name
            ))
            .await;
        count > 0
    }

    pub async fn scalar(&self, sql: &str) -> i64 {
        sqlx::any::install_default_drivers();
        let pool = sqlx::AnyPool::connect(&self.url).await.expect("connect raw pool");
        let value: i64 = sqlx::query_scalar(sql).fetch_one(&pool).await.expect("query scalar");
        pool.close().await;
        value
    }

    /// Run raw SQL against the database, bypassing the store.
    pub async fn execute(&self, sql: &str) {
        sqlx::any::install_default_drivers();
        let pool = sqlx::AnyPool::connect(&self.url).await.expect("connect raw pool");
        sqlx::raw_sql(sql).execute(&pool).await.expect("execute raw sql");
        pool.close().await;
    }
}

pub fn view(title: &str, link: &str, source: &str) -> ArticleView {
    ArticleView::new(title, link, source)
}

/// Source that waits before answering.
pub struct SlowSource {
    pub key: String,
    pub delay: Duration,
    pub entries: Vec<FeedEntry>,
}

#[async_trait]
impl FeedSource for SlowSource {
    fn key(&self) -> &str {
        &self.key
    }

    fn location(&self) -> &str {
        "slow"
    }

    async fn entries(&self) -> Result<Vec<FeedEntry>> {
        tokio::time::sleep(self.delay).await;
        Ok(self.entries.clone())
    }
}

/// Source that always fails, as an unreachable or malformed feed would.
pub struct FailingSource {
    pub key: String,
}

#[async_trait]
impl FeedSource for FailingSource {
    fn key(&self) -> &str {
        &self.key
    }

    fn location(&self) -> &str {
        "unreachable"
    }

    async fn entries(&self) -> Result<Vec<FeedEntry>> {
        Err(AggregatorError::Parse("not a feed".to_string()))
    }
}

/// Source that counts how often it is pulled.
pub struct CountingSource {
    pub key: String,
    pub entries: Vec<FeedEntry>,
    pub pulls: Arc<AtomicUsize>,
    pub delay: Duration,
}

#[async_trait]
impl FeedSource for CountingSource {
    fn key(&self) -> &str {
        &self.key
    }

    fn location(&self) -> &str {
        "counting"
    }

    async fn entries(&self) -> Result<Vec<FeedEntry>> {
        self.pulls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(self.entries.clone())
    }
}

/// Cache whose backend is gone.
pub struct UnavailableCache;

#[async_trait]
impl ArticleCache for UnavailableCache {
    async fn fetch_fresh(&self, _now: i64, _ttl: Duration) -> Result<Vec<ArticleView>> {
        Err(AggregatorError::StorageUnavailable("connection refused".to_string()))
    }

    async fn save_if_absent(&self, _articles: &[ArticleView], _now: i64) -> Result<usize> {
        Err(AggregatorError::StorageUnavailable("connection refused".to_string()))
    }
}
