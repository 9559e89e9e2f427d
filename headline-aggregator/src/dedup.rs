//! Cross-source merge of feed entries.
//!
//! Links and titles share one "seen" set: an entry is dropped when either its
//! link or its title has already been emitted. This also suppresses the same
//! headline published by a different outlet under a different link.

use crate::types::{ArticleView, FeedEntry};
use std::collections::HashSet;
use tracing::{debug, info};

/// Merge `(source key, entries)` batches into one list without repeated links
/// or titles. Sources are visited in the given order and entries in feed
/// order, so the first occurrence wins.
pub fn deduplicate<I, K>(batches: I) -> Vec<ArticleView>
where
    I: IntoIterator<Item = (K, Vec<FeedEntry>)>,
    K: AsRef<str>,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut articles = Vec::new();
    let mut total = 0;

    for (source, entries) in batches {
        let source = source.as_ref();
        total += entries.len();

        for entry in entries {
            if seen.contains(&entry.link) || seen.contains(&entry.title) {
                debug!("Removing duplicate entry: {} ({}) from {}", entry.title, entry.link, source);
                continue;
            }
            seen.insert(entry.link.clone());
            seen.insert(entry.title.clone());
            articles.push(ArticleView {
                title: entry.title,
                link: entry.link,
                source: source.to_string(),
            });
        }
    }

    let removed_count = total - articles.len();
    if removed_count > 0 {
        info!("Removed {} duplicate entries out of {}", removed_count, total);
    }

    articles
}
