use crate::rss_utils::url::is_valid_rss_url;
use crate::types::{AggregatorError, FeedSpec, FetchConfig, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Two days.
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 2 * 24 * 60 * 60;

const DEFAULT_FEEDS: &[(&str, &str)] = &[
    ("wsj", "https://feeds.a.dj.com/rss/RSSWorldNews.xml"),
    ("csm", "https://rss.csmonitor.com/feeds/all"),
    ("hill", "https://thehill.com/feed/?feed=partnerfeed-news-feed&format=rss"),
    ("san", "https://san.com/feed/"),
    ("nyt", "https://rss.nytimes.com/services/xml/rss/nyt/HomePage.xml"),
    ("pol", "https://www.politico.com/rss/politicopicks.xml"),
    ("cbs", "https://www.cbsnews.com/latest/rss/main"),
    ("fox", "https://moxie.foxnews.com/google-publisher/world.xml"),
    ("bre", "https://www.breitbart.com/feed/"),
    ("daily", "https://www.dailywire.com/rss.xml"),
    ("npr", "https://feeds.npr.org/1003/rss.xml"),
    ("newsweek", "https://www.newsweek.com/rss"),
    ("BBC", "https://feeds.bbci.co.uk/news/world/us_and_canada/rss.xml"),
    ("WP", "https://feeds.washingtonpost.com/rss/rss_election-2012"),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database_url: String,
    pub listen: String,
    pub cors_origin: Option<String>,
    pub cache_ttl_seconds: u64,
    pub source_timeout_seconds: u64,
    pub fetch: FetchConfig,
    /// Feeds in merge order: earlier feeds win when headlines collide.
    pub feeds: Vec<FeedSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://headlines.db?mode=rwc".to_string(),
            listen: "127.0.0.1:5000".to_string(),
            cors_origin: None,
            cache_ttl_seconds: DEFAULT_CACHE_TTL_SECONDS,
            source_timeout_seconds: 15,
            fetch: FetchConfig::default(),
            feeds: default_feeds(),
        }
    }
}

pub fn default_feeds() -> Vec<FeedSpec> {
    DEFAULT_FEEDS
        .iter()
        .map(|(key, url)| FeedSpec::new(*key, *url))
        .collect()
}

impl Config {
    /// Read a TOML config file; fields it omits keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache_ttl_seconds == 0 {
            return Err(AggregatorError::Config("cache_ttl_seconds must be positive".to_string()));
        }
        if self.source_timeout_seconds == 0 {
            return Err(AggregatorError::Config(
                "source_timeout_seconds must be positive".to_string(),
            ));
        }

        let mut keys = HashSet::new();
        for feed in &self.feeds {
            if feed.key.trim().is_empty() {
                return Err(AggregatorError::Config(format!("feed {} has an empty key", feed.url)));
            }
            if !keys.insert(feed.key.as_str()) {
                return Err(AggregatorError::Config(format!("duplicate feed key '{}'", feed.key)));
            }
            if !is_valid_rss_url(&feed.url) {
                return Err(AggregatorError::Config(format!(
                    "feed '{}' has an invalid URL: {}",
                    feed.key, feed.url
                )));
            }
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_seconds)
    }
}
