//! Error types for history operations.

use thiserror::Error;

/// Errors that can occur while talking to history archives.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// HTTP error from reqwest.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP status error.
    #[error("HTTP status {status} for {url}")]
    HttpStatus {
        /// The URL that returned the error.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Download failed after retries.
    #[error("download failed: {0}")]
    DownloadFailed(String),

    /// URL parse error.
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// JSON parse error.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The archive serves history for a different network.
    #[error("archive {url} serves network {found:?}, expected {expected:?}")]
    NetworkMismatch {
        /// Archive base URL.
        url: String,
        /// Passphrase the pool was configured with.
        expected: String,
        /// Passphrase advertised in the archive state.
        found: String,
    },

    /// No archive configured.
    #[error("no archive available")]
    NoArchiveAvailable,

    /// Every archive in the pool failed.
    #[error("all {attempts} archives failed, last was {last_url}: {source}")]
    ArchivesExhausted {
        /// Number of archives tried.
        attempts: usize,
        /// Base URL of the last archive tried.
        last_url: String,
        /// Why the last archive failed.
        source: Box<HistoryError>,
    },
}
