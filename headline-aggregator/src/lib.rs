pub mod types;
pub mod traits;
pub mod config;
pub mod fetcher;
pub mod parser;
pub mod sources;
pub mod dedup;
pub mod filter;
pub mod store;
pub mod aggregator;
pub mod server;
pub mod rss_utils;

pub use types::*;
pub use traits::{ArticleCache, FeedSource};
pub use config::Config;
pub use fetcher::Fetcher;
pub use parser::FeedParser;
pub use sources::{RssFeedSource, StaticFeedSource};
pub use dedup::deduplicate;
pub use filter::filter_by_title;
pub use store::{ArticleStore, Backend, InitOutcome};
pub use aggregator::HeadlineAggregator;
