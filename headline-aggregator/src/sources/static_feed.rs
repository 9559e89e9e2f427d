use crate::traits::FeedSource;
use crate::types::{FeedEntry, Result};
use crate::FeedParser;
use async_trait::async_trait;

/// Feed source with a fixed set of entries, e.g. a feed document saved to disk.
pub struct StaticFeedSource {
    key: String,
    location: String,
    entries: Vec<FeedEntry>,
}

impl StaticFeedSource {
    pub fn new(key: impl Into<String>, entries: Vec<FeedEntry>) -> Self {
        let key = key.into();
        Self {
            location: format!("static:{}", key),
            key,
            entries,
        }
    }

    /// Build from `(title, link)` pairs.
    pub fn from_pairs(key: impl Into<String>, pairs: &[(&str, &str)]) -> Self {
        let entries = pairs
            .iter()
            .map(|(title, link)| FeedEntry::new(*title, *link))
            .collect();
        Self::new(key, entries)
    }

    /// Parse an RSS/Atom document once and serve its entries from memory.
    pub fn from_document(key: impl Into<String>, content: &str) -> Result<Self> {
        Ok(Self::new(key, FeedParser::parse_feed(content)?))
    }
}

#[async_trait]
impl FeedSource for StaticFeedSource {
    fn key(&self) -> &str {
        &self.key
    }

    fn location(&self) -> &str {
        &self.location
    }

    async fn entries(&self) -> Result<Vec<FeedEntry>> {
        Ok(self.entries.clone())
    }
}
