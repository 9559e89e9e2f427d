use crate::traits::FeedSource;
use crate::types::{FeedEntry, FeedSpec, Result};
use crate::{FeedParser, Fetcher};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Feed source backed by an RSS/Atom document over HTTP
pub struct RssFeedSource {
    spec: FeedSpec,
    fetcher: Arc<Fetcher>,
}

impl RssFeedSource {
    pub fn new(spec: FeedSpec, fetcher: Arc<Fetcher>) -> Self {
        Self { spec, fetcher }
    }

    /// One source per configured feed, all sharing a single HTTP client.
    pub fn from_specs(specs: &[FeedSpec], fetcher: Arc<Fetcher>) -> Vec<Box<dyn FeedSource>> {
        specs
            .iter()
            .map(|spec| Box::new(Self::new(spec.clone(), fetcher.clone())) as Box<dyn FeedSource>)
            .collect()
    }
}

#[async_trait]
impl FeedSource for RssFeedSource {
    fn key(&self) -> &str {
        &self.spec.key
    }

    fn location(&self) -> &str {
        &self.spec.url
    }

    async fn entries(&self) -> Result<Vec<FeedEntry>> {
        let content = self.fetcher.fetch_feed(&self.spec.url).await?;
        let entries = FeedParser::parse_feed(&content)?;

        info!("Pulled {} entries from {} ({})", entries.len(), self.spec.key, self.spec.url);
        Ok(entries)
    }
}
