//! History archive clients.
//!
//! [`HistoryArchive`] talks to a single archive. [`ArchivePool`] holds every
//! archive configured for the network and tries them in order until one
//! answers, which is how the exporter learns the latest checkpointed ledger.

use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use crate::archive_state::HistoryArchiveState;
use crate::checkpoint::CheckpointManager;
use crate::download::{create_client, download_with_retries, DownloadConfig};
use crate::{HistoryError, Result};

/// Path of the root history archive state file, relative to the archive root.
pub fn root_has_path() -> &'static str {
    ".well-known/stellar-history.json"
}

/// Options shared by every archive in a pool.
#[derive(Debug, Clone)]
pub struct ArchiveOptions {
    /// User agent sent with every request.
    pub user_agent: String,
    /// Network checkpoint frequency; zero selects the default.
    pub checkpoint_frequency: u32,
    /// When set, archives advertising a different passphrase are skipped.
    pub network_passphrase: Option<String>,
    /// Timeout and retry policy.
    pub download: DownloadConfig,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            user_agent: concat!("henyey-history/", env!("CARGO_PKG_VERSION")).to_string(),
            checkpoint_frequency: 0,
            network_passphrase: None,
            download: DownloadConfig::default(),
        }
    }
}

/// Client for a single history archive.
#[derive(Debug, Clone)]
pub struct HistoryArchive {
    base_url: Url,
    client: Client,
    download: DownloadConfig,
}

impl HistoryArchive {
    /// Create a client for the archive rooted at `base_url`.
    pub fn new(base_url: &str, client: Client, download: DownloadConfig) -> Result<Self> {
        // Url::join drops the last path segment unless the base ends in '/'.
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        Ok(Self {
            base_url: Url::parse(&normalized)?,
            client,
            download,
        })
    }

    /// The archive root URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetch and parse the root History Archive State.
    pub async fn get_root_has(&self) -> Result<HistoryArchiveState> {
        let url = self.base_url.join(root_has_path())?;
        let bytes = download_with_retries(&self.client, url.as_str(), &self.download).await?;
        HistoryArchiveState::from_slice(&bytes)
    }
}

/// A set of archives for one network, queried with failover.
#[derive(Debug, Clone)]
pub struct ArchivePool {
    archives: Vec<HistoryArchive>,
    checkpoints: CheckpointManager,
    network_passphrase: Option<String>,
}

impl ArchivePool {
    /// Build a pool from archive base URLs.
    ///
    /// Fails with [`HistoryError::NoArchiveAvailable`] when `urls` is empty
    /// and with [`HistoryError::UrlParse`] when any URL is malformed.
    pub fn from_urls<S: AsRef<str>>(urls: &[S], options: ArchiveOptions) -> Result<Self> {
        if urls.is_empty() {
            return Err(HistoryError::NoArchiveAvailable);
        }
        let client = create_client(options.download.timeout, &options.user_agent)?;
        let archives = urls
            .iter()
            .map(|url| HistoryArchive::new(url.as_ref(), client.clone(), options.download.clone()))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            archives,
            checkpoints: CheckpointManager::new(options.checkpoint_frequency),
            network_passphrase: options.network_passphrase,
        })
    }

    /// Number of archives in the pool.
    pub fn archive_count(&self) -> usize {
        self.archives.len()
    }

    /// Checkpoint arithmetic for the pool's network.
    pub fn checkpoints(&self) -> &CheckpointManager {
        &self.checkpoints
    }

    /// Get the root HAS from the first archive that answers.
    ///
    /// When every archive fails, the error carries the last failure.
    pub async fn get_root_has(&self) -> Result<HistoryArchiveState> {
        let mut last_failure = None;
        for archive in &self.archives {
            let attempt = archive
                .get_root_has()
                .await
                .and_then(|has| self.check_network(archive, has));
            match attempt {
                Ok(has) => {
                    debug!(
                        url = %archive.base_url(),
                        server = has.server().unwrap_or("unknown"),
                        current_ledger = has.current_ledger(),
                        "Fetched root HAS"
                    );
                    return Ok(has);
                }
                Err(e) => {
                    warn!(
                        url = %archive.base_url(),
                        error = %e,
                        "Failed to get HAS from archive"
                    );
                    last_failure = Some((archive.base_url().to_string(), e));
                }
            }
        }
        match last_failure {
            Some((last_url, source)) => Err(HistoryError::ArchivesExhausted {
                attempts: self.archives.len(),
                last_url,
                source: Box::new(source),
            }),
            None => Err(HistoryError::NoArchiveAvailable),
        }
    }

    /// Latest checkpointed ledger sequence published by the network.
    pub async fn latest_ledger_sequence(&self) -> Result<u32> {
        let has = self.get_root_has().await?;
        let current = has.current_ledger();
        if !self.checkpoints.is_checkpoint(current) {
            debug!(
                current_ledger = current,
                frequency = self.checkpoints.frequency(),
                "Root HAS ledger is not on a checkpoint boundary"
            );
        }
        Ok(current)
    }

    fn check_network(
        &self,
        archive: &HistoryArchive,
        has: HistoryArchiveState,
    ) -> Result<HistoryArchiveState> {
        if let (Some(expected), Some(found)) = (&self.network_passphrase, has.network_passphrase()) {
            if expected != found {
                return Err(HistoryError::NetworkMismatch {
                    url: archive.base_url().to_string(),
                    expected: expected.clone(),
                    found: found.to_string(),
                });
            }
        }
        Ok(has)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_has_url_keeps_archive_path() {
        let archive = HistoryArchive::new(
            "https://history.stellar.org/prd/core-testnet/core_testnet_001",
            Client::new(),
            DownloadConfig::default(),
        )
        .unwrap();
        let url = archive.base_url().join(root_has_path()).unwrap();
        assert_eq!(
            url.as_str(),
            "https://history.stellar.org/prd/core-testnet/core_testnet_001/.well-known/stellar-history.json"
        );
    }

    #[test]
    fn test_trailing_slash_is_normalized() {
        let archive = HistoryArchive::new(
            "https://example.com/archive/",
            Client::new(),
            DownloadConfig::default(),
        )
        .unwrap();
        assert_eq!(archive.base_url().as_str(), "https://example.com/archive/");
    }

    #[test]
    fn test_pool_requires_archives() {
        let urls: [&str; 0] = [];
        let err = ArchivePool::from_urls(&urls, ArchiveOptions::default()).unwrap_err();
        assert!(matches!(err, HistoryError::NoArchiveAvailable));
    }

    #[test]
    fn test_pool_rejects_malformed_url() {
        let err = ArchivePool::from_urls(&["not a url"], ArchiveOptions::default()).unwrap_err();
        assert!(matches!(err, HistoryError::UrlParse(_)));
    }

    #[test]
    fn test_pool_checkpoint_frequency() {
        let options = ArchiveOptions {
            checkpoint_frequency: 8,
            ..Default::default()
        };
        let pool = ArchivePool::from_urls(&["https://example.com"], options).unwrap();
        assert_eq!(pool.archive_count(), 1);
        assert_eq!(pool.checkpoints().frequency(), 8);
    }
}
