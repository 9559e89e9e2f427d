mod common;

use common::init_tracing;
use headline_aggregator::{
    AggregatorError, FeedEntry, FeedParser, FeedSource, FeedSpec, FetchConfig, Fetcher, RssFeedSource,
    StaticFeedSource,
};
use std::sync::Arc;

const WORLD_NEWS: &str = include_str!("fixtures/world_news.xml");

fn expected_entries() -> Vec<FeedEntry> {
    vec![
        FeedEntry::new("Ceasefire talks resume in Geneva", "https://news.example.com/world/ceasefire-talks"),
        FeedEntry::new("Central bank holds rates steady", "https://news.example.com/markets/rates"),
        FeedEntry::new("Wildfire season starts early", "https://news.example.com/climate/wildfires"),
    ]
}

fn quick_fetcher() -> Arc<Fetcher> {
    let config = FetchConfig {
        timeout_seconds: 5,
        max_retries: 0,
        retry_delay_seconds: 0,
        ..FetchConfig::default()
    };
    Arc::new(Fetcher::new(config).unwrap())
}

#[test]
fn test_parser_keeps_order_and_drops_incomplete_entries() {
    init_tracing();
    let entries = FeedParser::parse_feed(WORLD_NEWS).unwrap();
    assert_eq!(entries, expected_entries());
}

#[test]
fn test_parser_reads_atom() {
    let atom = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom News</title>
  <id>urn:example:atom</id>
  <updated>2026-10-19T08:00:00Z</updated>
  <entry>
    <title>Atom headline</title>
    <id>urn:example:1</id>
    <updated>2026-10-19T08:00:00Z</updated>
    <link href="https://atom.example.com/1"/>
  </entry>
</feed>"#;

    let entries = FeedParser::parse_feed(atom).unwrap();
    assert_eq!(entries, vec![FeedEntry::new("Atom headline", "https://atom.example.com/1")]);
}

#[test]
fn test_parser_rejects_garbage() {
    let result = FeedParser::parse_feed("<html><body>not a feed</body></html>");
    assert!(matches!(result, Err(AggregatorError::Parse(_))));
}

#[tokio::test]
async fn test_rss_source_pulls_entries_over_http() {
    init_tracing();
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/world.xml")
        .with_status(200)
        .with_header("content-type", "application/rss+xml")
        .with_body(WORLD_NEWS)
        .create_async()
        .await;

    let source = RssFeedSource::new(
        FeedSpec::new("world", format!("{}/world.xml", server.url())),
        quick_fetcher(),
    );

    assert_eq!(source.key(), "world");
    assert_eq!(source.entries().await.unwrap(), expected_entries());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_rss_source_reports_http_errors() {
    init_tracing();
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/down.xml")
        .with_status(500)
        .create_async()
        .await;

    let source = RssFeedSource::new(
        FeedSpec::new("down", format!("{}/down.xml", server.url())),
        quick_fetcher(),
    );

    let result = source.entries().await;
    assert!(matches!(result, Err(AggregatorError::SourceFetch { .. })));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_fetcher_retries_transient_failures() {
    init_tracing();
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/flaky.xml")
        .with_status(503)
        .expect(3)
        .create_async()
        .await;

    let fetcher = Fetcher::new(FetchConfig {
        max_retries: 2,
        retry_delay_seconds: 0,
        ..FetchConfig::default()
    })
    .unwrap();

    let result = fetcher.fetch_feed(&format!("{}/flaky.xml", server.url())).await;
    assert!(result.is_err());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_fetcher_tolerates_extreme_limits() {
    init_tracing();
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/world.xml")
        .with_status(200)
        .with_body(WORLD_NEWS)
        .create_async()
        .await;

    let fetcher = Fetcher::new(FetchConfig {
        max_retries: 0,
        retry_delay_seconds: u64::MAX,
        max_feed_size_mb: usize::MAX,
        ..FetchConfig::default()
    })
    .unwrap();

    let content = fetcher.fetch_feed(&format!("{}/world.xml", server.url())).await.unwrap();
    assert_eq!(content, WORLD_NEWS);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_rss_source_rejects_non_feed_body() {
    init_tracing();
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/page.html")
        .with_status(200)
        .with_body("<html><body>maintenance</body></html>")
        .create_async()
        .await;

    let source = RssFeedSource::new(
        FeedSpec::new("page", format!("{}/page.html", server.url())),
        quick_fetcher(),
    );

    assert!(matches!(source.entries().await, Err(AggregatorError::Parse(_))));
}

#[tokio::test]
async fn test_from_specs_keeps_configured_order() {
    let specs = vec![
        FeedSpec::new("wsj", "https://feeds.a.dj.com/rss/RSSWorldNews.xml"),
        FeedSpec::new("npr", "https://feeds.npr.org/1003/rss.xml"),
    ];

    let sources = RssFeedSource::from_specs(&specs, quick_fetcher());

    let keys: Vec<&str> = sources.iter().map(|s| s.key()).collect();
    assert_eq!(keys, vec!["wsj", "npr"]);
    assert_eq!(sources[1].location(), "https://feeds.npr.org/1003/rss.xml");
}

#[tokio::test]
async fn test_static_source_serves_saved_document() {
    let source = StaticFeedSource::from_document("saved", WORLD_NEWS).unwrap();

    assert_eq!(source.key(), "saved");
    assert_eq!(source.entries().await.unwrap(), expected_entries());
    // Serving from memory is repeatable.
    assert_eq!(source.entries().await.unwrap().len(), 3);
}
