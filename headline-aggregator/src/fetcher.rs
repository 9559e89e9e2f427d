use crate::types::{AggregatorError, FetchConfig, Result};
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Download a feed body, retrying transient failures with exponential backoff.
    pub async fn fetch_feed(&self, url: &str) -> Result<String> {
        let start_time = Instant::now();
        debug!("Fetching feed: {}", url);

        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: Duration::from_secs(self.config.retry_delay_seconds),
            initial_interval: Duration::from_secs(self.config.retry_delay_seconds),
            max_interval: Duration::from_secs(self.config.retry_delay_seconds.saturating_mul(32)),
            multiplier: 2.0,
            // Attempts are capped by max_retries instead.
            max_elapsed_time: None,
            ..Default::default()
        };

        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match self.fetch_once(url).await {
                Ok(content) => {
                    info!(
                        "Fetched feed: {} ({} bytes in {}ms)",
                        url,
                        content.len(),
                        start_time.elapsed().as_millis()
                    );
                    return Ok(content);
                }
                // Oversized feeds will not shrink on retry.
                Err(e @ AggregatorError::FeedTooLarge { .. }) => return Err(e),
                Err(e) => {
                    last_error = Some(e);

                    if attempt < self.config.max_retries {
                        if let Some(delay) = backoff.next_backoff() {
                            warn!("Attempt {} failed for {}, retrying in {:?}", attempt + 1, url, delay);
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                    }
                    break;
                }
            }
        }

        let message = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Unknown error".to_string());
        error!("Failed to fetch feed after {} attempts: {}", self.config.max_retries + 1, url);
        Err(AggregatorError::SourceFetch {
            key: url.to_string(),
            message,
        })
    }

    async fn fetch_once(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(AggregatorError::SourceFetch {
                key: url.to_string(),
                message: format!("HTTP {}: {}", status, status.canonical_reason().unwrap_or("Unknown")),
            });
        }

        let limit_bytes = self.config.max_feed_size_mb.saturating_mul(1024 * 1024);
        if let Some(content_length) = response.content_length() {
            if content_length as usize > limit_bytes {
                return Err(AggregatorError::FeedTooLarge {
                    size_mb: content_length as usize / (1024 * 1024),
                });
            }
        }

        let content = response.text().await?;
        if content.len() > limit_bytes {
            return Err(AggregatorError::FeedTooLarge {
                size_mb: content.len() / (1024 * 1024),
            });
        }
        Ok(content)
    }
}
