use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A stored article row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub link: String,
    pub source: String,
    /// Unix seconds at which the article was first accepted into the cache.
    pub timestamp: i64,
}

/// The public projection of an article: what the deduplicator emits, what a
/// fresh cache read returns and what the endpoint serializes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArticleView {
    pub title: String,
    pub link: String,
    pub source: String,
}

impl ArticleView {
    pub fn new(title: impl Into<String>, link: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            source: source.into(),
        }
    }
}

impl From<Article> for ArticleView {
    fn from(article: Article) -> Self {
        Self {
            title: article.title,
            link: article.link,
            source: article.source,
        }
    }
}

/// One entry as produced by a feed source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
}

impl FeedEntry {
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
        }
    }
}

/// A configured feed: short source key plus feed URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSpec {
    pub key: String,
    pub url: String,
}

impl FeedSpec {
    pub fn new(key: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            url: url.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
    pub max_feed_size_mb: usize,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Headline-Aggregator/1.0".to_string(),
            timeout_seconds: 10,
            max_retries: 1,
            retry_delay_seconds: 1,
            max_feed_size_mb: 10,
            max_redirects: 5,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Failed to fetch source {key}: {message}")]
    SourceFetch { key: String, message: String },

    #[error("Source {key} timed out after {after:?}")]
    SourceTimeout { key: String, after: Duration },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Schema migration failed during {stage}: {message}")]
    SchemaMigration { stage: &'static str, message: String },

    #[error("Invalid acceptance timestamp {0}: must be positive")]
    InvalidTimestamp(i64),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Feed size exceeds limit: {size_mb}MB")]
    FeedTooLarge { size_mb: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config file error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl AggregatorError {
    pub(crate) fn migration(stage: &'static str, err: impl std::fmt::Display) -> Self {
        AggregatorError::SchemaMigration {
            stage,
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AggregatorError>;
