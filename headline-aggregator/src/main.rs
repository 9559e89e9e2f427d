use anyhow::Context;
use clap::Parser;
use headline_aggregator::rss_utils::{time::format_duration, url::redact_password};
use headline_aggregator::{server, ArticleStore, Config, Fetcher, HeadlineAggregator, RssFeedSource};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "headline-aggregator", about = "Serve deduplicated headlines from a set of news feeds")]
struct Args {
    /// TOML file with the feed table and cache settings
    #[arg(long, env = "HEADLINES_CONFIG")]
    config: Option<PathBuf>,

    /// sqlite://... or postgres://... connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Address to bind the HTTP endpoint to
    #[arg(long, env = "LISTEN_ADDR")]
    listen: Option<String>,

    /// How long fetched articles stay fresh
    #[arg(long, env = "CACHE_TTL_SECONDS")]
    cache_ttl_seconds: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    info!(
        "Starting headline aggregator: {} feeds, cache TTL {}",
        config.feeds.len(),
        format_duration(config.cache_ttl())
    );
    info!("Connecting to database: {}", redact_password(&config.database_url));

    let store = ArticleStore::connect(&config.database_url)
        .await
        .context("failed to open the article database")?;
    store.ping().await.context("article database is not responding")?;

    // A failed migration must stop startup rather than run on a half-built table.
    let outcome = store.initialize().await.map_err(|e| {
        error!("Schema initialization failed, refusing to start: {}", e);
        e
    })?;
    info!("Article table ready ({:?} backend): {:?}", store.backend(), outcome);
    let store = Arc::new(store);

    let fetcher = Arc::new(Fetcher::new(config.fetch.clone()).context("failed to build HTTP client")?);
    let sources = RssFeedSource::from_specs(&config.feeds, fetcher);
    let aggregator = Arc::new(HeadlineAggregator::new(
        store.clone(),
        sources,
        config.cache_ttl(),
        config.source_timeout(),
    ));

    let router = server::router(aggregator, config.cors_origin.as_deref())?;
    let listener = TcpListener::bind(&config.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;
    server::serve(listener, router).await?;

    store.close().await;
    info!("Headline aggregator finished");
    Ok(())
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path).with_context(|| format!("failed to load config {}", path.display()))?,
        None => {
            warn!("No config file given, using the built-in feed table");
            Config::default()
        }
    };

    if let Some(database_url) = &args.database_url {
        config.database_url = database_url.clone();
    }
    if let Some(listen) = &args.listen {
        config.listen = listen.clone();
    }
    if let Some(ttl) = args.cache_ttl_seconds {
        config.cache_ttl_seconds = ttl;
    }

    config.validate()?;
    Ok(config)
}
