use crate::types::{AggregatorError, FeedEntry, Result};
use feed_rs::parser;
use tracing::debug;

/// Turns RSS/Atom documents into headline entries.
pub struct FeedParser;

impl FeedParser {
    /// Parse a feed document into entries, in feed order.
    ///
    /// Entries without a title or without a link are dropped: a headline
    /// needs both to be displayed and deduplicated.
    pub fn parse_feed(content: &str) -> Result<Vec<FeedEntry>> {
        debug!("Parsing feed content ({} bytes)", content.len());

        let feed = parser::parse(content.as_bytes())
            .map_err(|e| AggregatorError::Parse(format!("Failed to parse feed: {}", e)))?;

        let total = feed.entries.len();
        let entries: Vec<FeedEntry> = feed.entries.into_iter().filter_map(Self::parse_entry).collect();

        if entries.len() < total {
            debug!("Dropped {} entries lacking a title or link", total - entries.len());
        }
        Ok(entries)
    }

    fn parse_entry(entry: feed_rs::model::Entry) -> Option<FeedEntry> {
        let title = entry.title.map(|t| t.content.trim().to_string())?;
        let link = entry.links.first()?.href.trim().to_string();

        if title.is_empty() || link.is_empty() {
            return None;
        }
        Some(FeedEntry { title, link })
    }
}
