//! History archive access for henyey-export.
//!
//! Stellar validators publish their ledger history to HTTP-accessible
//! history archives. The exporter only needs a small slice of that
//! machinery: the root History Archive State (HAS), whose `currentLedger`
//! tells us how far the network has been checkpointed, and the checkpoint
//! arithmetic used to reason about ledgers that are not yet published.
//!
//! # Key Types
//!
//! - [`HistoryArchive`]: client for a single archive
//! - [`ArchivePool`]: several archives with failover, used as the live
//!   network-state oracle during range resolution
//! - [`HistoryArchiveState`]: parsed root HAS
//! - [`CheckpointManager`]: checkpoint arithmetic for a given frequency
//!
//! # Example
//!
//! ```no_run
//! use henyey_history::{ArchiveOptions, ArchivePool};
//!
//! # async fn example() -> Result<(), henyey_history::HistoryError> {
//! let pool = ArchivePool::from_urls(
//!     &["https://history.stellar.org/prd/core-testnet/core_testnet_001"],
//!     ArchiveOptions::default(),
//! )?;
//! let latest = pool.latest_ledger_sequence().await?;
//! println!("network checkpointed through ledger {}", latest);
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod archive_state;
pub mod checkpoint;
pub mod download;
pub mod error;

pub use archive::{root_has_path, ArchiveOptions, ArchivePool, HistoryArchive};
pub use archive_state::HistoryArchiveState;
pub use checkpoint::{CheckpointManager, DEFAULT_CHECKPOINT_FREQUENCY};
pub use download::DownloadConfig;
pub use error::HistoryError;

/// Result type for history operations.
pub type Result<T> = std::result::Result<T, HistoryError>;
