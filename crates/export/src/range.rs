//! Ledger range resolution.
//!
//! A requested range is checked against the network before anything is
//! exported: the start must be a real ledger, the end must follow the start,
//! and neither may lie beyond what the network can have closed. The latest
//! checkpointed ledger lags the actual network tip by up to one checkpoint,
//! so the ceiling allows two checkpoints of slack.
//!
//! Legal ranges are then widened to datastore file boundaries so every file
//! written is complete.

use async_trait::async_trait;
use henyey_history::{ArchivePool, HistoryError};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::ExportMode;
use crate::datastore::DataStoreSchema;
use crate::error::RangeError;

/// The first ledger that can be exported; ledger 1 is genesis.
pub const MIN_LEDGER: u32 = 2;

/// Source of live network state.
#[async_trait]
pub trait NetworkStateProvider: Send + Sync {
    /// Latest checkpointed ledger sequence.
    async fn latest_ledger_sequence(&self) -> Result<u32, HistoryError>;

    /// Network checkpoint frequency.
    fn checkpoint_frequency(&self) -> u32;
}

#[async_trait]
impl NetworkStateProvider for ArchivePool {
    async fn latest_ledger_sequence(&self) -> Result<u32, HistoryError> {
        ArchivePool::latest_ledger_sequence(self).await
    }

    fn checkpoint_frequency(&self) -> u32 {
        self.checkpoints().frequency()
    }
}

/// A legal, file-aligned ledger range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerRange {
    /// First ledger, at least [`MIN_LEDGER`].
    pub start: u32,
    /// Last ledger; 0 means unbounded.
    pub end: u32,
}

impl LedgerRange {
    /// Whether the range has no end.
    pub fn is_unbounded(&self) -> bool {
        self.end == 0
    }
}

/// Round `start` down to its file boundary, never below [`MIN_LEDGER`].
pub fn align_start(start: u32, schema: &DataStoreSchema) -> u32 {
    schema.start_boundary(start).max(MIN_LEDGER)
}

/// Round `end` up to the next file boundary; 0 stays unbounded.
pub fn align_end(end: u32, schema: &DataStoreSchema) -> Result<u32, RangeError> {
    if end == 0 {
        return Ok(0);
    }
    schema
        .end_boundary(end)
        .ok_or(RangeError::AlignmentOverflow {
            end,
            ledgers_per_file: schema.ledgers_per_file,
        })
}

/// Validate a requested range against the network and align it to file
/// boundaries.
///
/// Checks run in order and the first failure is returned. The network is
/// only queried once the request itself is well formed.
pub async fn resolve_range<P>(
    start: u32,
    end: u32,
    mode: ExportMode,
    schema: &DataStoreSchema,
    provider: &P,
    cancel: &CancellationToken,
) -> Result<LedgerRange, RangeError>
where
    P: NetworkStateProvider + ?Sized,
{
    if start < MIN_LEDGER {
        return Err(RangeError::StartTooLow { start });
    }
    if mode == ExportMode::ScanAndFill && end == 0 {
        return Err(RangeError::UnboundedNotAllowed);
    }
    if end != 0 && end <= start {
        return Err(RangeError::EndNotAfterStart { start, end });
    }

    let latest = tokio::select! {
        _ = cancel.cancelled() => return Err(RangeError::Cancelled),
        result = provider.latest_ledger_sequence() => {
            result.map_err(|e| RangeError::NetworkStateUnavailable(e.to_string()))?
        }
    };
    let frequency = provider.checkpoint_frequency();
    let ceiling = u64::from(latest) + 2 * u64::from(frequency);
    info!(
        latest_ledger = latest,
        checkpoint_frequency = frequency,
        ceiling = ceiling,
        "Fetched latest network ledger"
    );

    if u64::from(start) > ceiling {
        return Err(RangeError::StartBeyondNetwork { start, ceiling });
    }
    if end != 0 && u64::from(end) > ceiling {
        return Err(RangeError::EndBeyondNetwork { end, ceiling });
    }

    let range = LedgerRange {
        start: align_start(start, schema),
        end: align_end(end, schema)?,
    };
    info!(
        requested_start = start,
        requested_end = end,
        start = range.start,
        end = range.end,
        ledgers_per_file = schema.ledgers_per_file,
        "Computed export range"
    );
    Ok(range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockProvider {
        latest: Result<u32, String>,
        frequency: u32,
        calls: AtomicUsize,
    }

    impl MockProvider {
        fn new(latest: u32, frequency: u32) -> Self {
            Self {
                latest: Ok(latest),
                frequency,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(reason: &str) -> Self {
            Self {
                latest: Err(reason.to_string()),
                frequency: 64,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl NetworkStateProvider for MockProvider {
        async fn latest_ledger_sequence(&self) -> Result<u32, HistoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.latest.clone().map_err(HistoryError::DownloadFailed)
        }

        fn checkpoint_frequency(&self) -> u32 {
            self.frequency
        }
    }

    /// Never answers; only cancellation can end the query.
    struct StalledProvider;

    #[async_trait]
    impl NetworkStateProvider for StalledProvider {
        async fn latest_ledger_sequence(&self) -> Result<u32, HistoryError> {
            std::future::pending().await
        }

        fn checkpoint_frequency(&self) -> u32 {
            64
        }
    }

    fn schema(lpf: u32) -> DataStoreSchema {
        DataStoreSchema {
            ledgers_per_file: lpf,
            files_per_partition: 10,
        }
    }

    async fn resolve(
        start: u32,
        end: u32,
        mode: ExportMode,
        lpf: u32,
        provider: &MockProvider,
    ) -> Result<LedgerRange, RangeError> {
        resolve_range(
            start,
            end,
            mode,
            &schema(lpf),
            provider,
            &CancellationToken::new(),
        )
        .await
    }

    #[tokio::test]
    async fn test_start_too_low_both_modes() {
        let provider = MockProvider::new(1000, 64);
        for mode in [ExportMode::ScanAndFill, ExportMode::Append] {
            for start in [0, 1] {
                assert_eq!(
                    resolve(start, 100, mode, 1, &provider).await,
                    Err(RangeError::StartTooLow { start })
                );
            }
        }
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_scan_and_fill_requires_end() {
        let provider = MockProvider::new(1000, 64);
        assert_eq!(
            resolve(10, 0, ExportMode::ScanAndFill, 1, &provider).await,
            Err(RangeError::UnboundedNotAllowed)
        );
    }

    #[tokio::test]
    async fn test_end_not_after_start() {
        let provider = MockProvider::new(1000, 64);
        for mode in [ExportMode::ScanAndFill, ExportMode::Append] {
            for end in [10, 5] {
                assert_eq!(
                    resolve(10, end, mode, 1, &provider).await,
                    Err(RangeError::EndNotAfterStart { start: 10, end })
                );
            }
        }
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_append_allows_unbounded() {
        let provider = MockProvider::new(1000, 64);
        let range = resolve(100, 0, ExportMode::Append, 1, &provider)
            .await
            .unwrap();
        assert_eq!(range, LedgerRange { start: 100, end: 0 });
        assert!(range.is_unbounded());
    }

    #[tokio::test]
    async fn test_ceiling_is_two_checkpoints_past_latest() {
        let provider = MockProvider::new(1000, 64);
        let range = resolve(10, 1128, ExportMode::ScanAndFill, 1, &provider)
            .await
            .unwrap();
        assert_eq!(range.end, 1128);

        assert_eq!(
            resolve(10, 1129, ExportMode::ScanAndFill, 1, &provider).await,
            Err(RangeError::EndBeyondNetwork {
                end: 1129,
                ceiling: 1128
            })
        );
        assert_eq!(
            resolve(1129, 0, ExportMode::Append, 1, &provider).await,
            Err(RangeError::StartBeyondNetwork {
                start: 1129,
                ceiling: 1128
            })
        );
    }

    #[tokio::test]
    async fn test_ceiling_does_not_overflow() {
        let provider = MockProvider::new(u32::MAX - 10, 64);
        let range = resolve(100, u32::MAX - 1, ExportMode::ScanAndFill, 1, &provider)
            .await
            .unwrap();
        assert_eq!(range.end, u32::MAX - 1);
    }

    #[tokio::test]
    async fn test_alignment_overflow() {
        let provider = MockProvider::new(u32::MAX - 10, 64);
        assert_eq!(
            resolve(100, u32::MAX - 1, ExportMode::ScanAndFill, 64, &provider).await,
            Err(RangeError::AlignmentOverflow {
                end: u32::MAX - 1,
                ledgers_per_file: 64
            })
        );
    }

    #[tokio::test]
    async fn test_provider_failure() {
        let provider = MockProvider::failing("archives unreachable");
        let err = resolve(10, 100, ExportMode::ScanAndFill, 1, &provider)
            .await
            .unwrap_err();
        match err {
            RangeError::NetworkStateUnavailable(reason) => {
                assert!(reason.contains("archives unreachable"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_cancelled_query() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = resolve_range(
            10,
            100,
            ExportMode::ScanAndFill,
            &schema(1),
            &StalledProvider,
            &cancel,
        )
        .await;
        assert_eq!(result, Err(RangeError::Cancelled));
    }

    #[tokio::test]
    async fn test_aligned_range() {
        let provider = MockProvider::new(1000, 64);
        let range = resolve(23, 57, ExportMode::ScanAndFill, 10, &provider)
            .await
            .unwrap();
        assert_eq!(range, LedgerRange { start: 20, end: 60 });
    }

    #[test]
    fn test_align_start() {
        assert_eq!(align_start(23, &schema(10)), 20);
        assert_eq!(align_start(1, &schema(10)), 2);
        assert_eq!(align_start(2, &schema(1)), 2);
    }

    #[test]
    fn test_small_starts_pin_to_two() {
        let schema = schema(64);
        assert_eq!(align_start(2, &schema), 2);
        assert_eq!(align_start(3, &schema), 2);
        assert_eq!(align_start(63, &schema), 2);
        assert_eq!(align_start(64, &schema), 64);
    }

    #[test]
    fn test_align_end() {
        assert_eq!(align_end(57, &schema(10)), Ok(60));
        assert_eq!(align_end(60, &schema(10)), Ok(60));
        assert_eq!(align_end(0, &schema(10)), Ok(0));
    }

    #[test]
    fn test_alignment_is_idempotent() {
        for lpf in [1, 10, 64, 128] {
            let schema = schema(lpf);
            for seq in [2, 3, 23, 57, 63, 64, 65, 1000, 65_535] {
                let start = align_start(seq, &schema);
                assert_eq!(align_start(start, &schema), start);
                let end = align_end(seq, &schema).unwrap();
                assert_eq!(align_end(end, &schema), Ok(end));
            }
        }
    }
}
