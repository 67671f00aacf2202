//! Download utilities for history archive files.
//!
//! The root archive state is small and fetched once per process, so the
//! policy here is a handful of quick retries per archive; failover across
//! archives is handled by [`crate::ArchivePool`].

use std::time::Duration;

use bytes::Bytes;
use reqwest::Client;
use tracing::{debug, warn};

use crate::error::HistoryError;

/// Default timeout for HTTP requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of retry attempts per archive.
pub const DEFAULT_RETRIES: u32 = 3;

/// Default delay between retries.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Configuration for download operations.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// HTTP request timeout.
    pub timeout: Duration,
    /// Number of retry attempts.
    pub retries: u32,
    /// Delay between retries.
    pub retry_delay: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            retries: DEFAULT_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Create a new HTTP client configured for history archive access.
///
/// Every request carries `user_agent` so archive operators can attribute
/// traffic to the exporter.
pub fn create_client(timeout: Duration, user_agent: &str) -> Result<Client, HistoryError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()
        .map_err(HistoryError::Http)
}

/// Download a file from a URL with retry logic.
///
/// A 404 is not retried: the archive answered and the file is not there.
pub async fn download_with_retries(
    client: &Client,
    url: &str,
    config: &DownloadConfig,
) -> Result<Bytes, HistoryError> {
    let mut last_error = None;

    for attempt in 0..=config.retries {
        if attempt > 0 {
            debug!(url = url, attempt = attempt, "Retrying download after delay");
            tokio::time::sleep(config.retry_delay).await;
        }

        match download_once(client, url).await {
            Ok(bytes) => {
                debug!(url = url, bytes = bytes.len(), "Download successful");
                return Ok(bytes);
            }
            Err(e @ HistoryError::NotFound(_)) => return Err(e),
            Err(e) => {
                warn!(
                    url = url,
                    attempt = attempt,
                    error = %e,
                    "Download attempt failed"
                );
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        HistoryError::DownloadFailed(format!("Failed to download {url} after retries"))
    }))
}

/// Download a file from a URL (single attempt).
async fn download_once(client: &Client, url: &str) -> Result<Bytes, HistoryError> {
    let response = client.get(url).send().await.map_err(HistoryError::Http)?;

    let status = response.status();
    if !status.is_success() {
        if status.as_u16() == 404 {
            return Err(HistoryError::NotFound(url.to_string()));
        }
        return Err(HistoryError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    response.bytes().await.map_err(HistoryError::Http)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_config_default() {
        let config = DownloadConfig::default();
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.retries, DEFAULT_RETRIES);
        assert_eq!(config.retry_delay, DEFAULT_RETRY_DELAY);
    }

    #[test]
    fn test_create_client() {
        assert!(create_client(Duration::from_secs(5), "henyey-export").is_ok());
    }
}
