/// URL utilities for feeds and connection strings
pub mod url {
    use url::Url;

    /// Validate RSS feed URL format
    pub fn is_valid_rss_url(url_str: &str) -> bool {
        match Url::parse(url_str) {
            Ok(url) => matches!(url.scheme(), "http" | "https") && url.host().is_some(),
            Err(_) => false,
        }
    }

    /// Hide the password of a connection string before it reaches the logs
    pub fn redact_password(url_str: &str) -> String {
        match Url::parse(url_str) {
            Ok(mut url) if url.password().is_some() => {
                let _ = url.set_password(Some("***"));
                url.to_string()
            }
            _ => url_str.to_string(),
        }
    }
}

/// Time utilities for cache freshness
pub mod time {
    use chrono::Utc;
    use std::time::Duration;

    /// Current Unix time in seconds
    pub fn now_unix() -> i64 {
        Utc::now().timestamp()
    }

    /// Format duration in human-readable form
    pub fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();

        if total_seconds < 60 {
            format!("{}s", total_seconds)
        } else if total_seconds < 3600 {
            format!("{}m", total_seconds / 60)
        } else if total_seconds < 86400 {
            format!("{}h", total_seconds / 3600)
        } else if total_seconds % 86400 == 0 {
            format!("{}d", total_seconds / 86400)
        } else {
            format!("{}h", total_seconds / 3600)
        }
    }
}
