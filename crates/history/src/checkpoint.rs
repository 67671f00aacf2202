//! Checkpoint arithmetic for history archives.
//!
//! Stellar history is organized into checkpoints - groups of
//! `frequency` ledgers (64 on the public networks). Checkpoints are
//! identified by their final ledger sequence number, which satisfies
//! `(seq + 1) % frequency == 0`.
//!
//! For example, with the default frequency:
//! - Checkpoint 63 contains ledgers 0-63
//! - Checkpoint 127 contains ledgers 64-127
//!
//! Private networks may run with an accelerated frequency, so unlike the
//! consensus-side helpers everything here is parameterized.

/// Checkpoint frequency used by pubnet and testnet.
pub const DEFAULT_CHECKPOINT_FREQUENCY: u32 = 64;

/// Checkpoint arithmetic for a fixed checkpoint frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointManager {
    frequency: u32,
}

impl Default for CheckpointManager {
    fn default() -> Self {
        Self::new(DEFAULT_CHECKPOINT_FREQUENCY)
    }
}

impl CheckpointManager {
    /// Create a manager for `frequency`; zero selects the default.
    pub fn new(frequency: u32) -> Self {
        let frequency = if frequency == 0 {
            DEFAULT_CHECKPOINT_FREQUENCY
        } else {
            frequency
        };
        Self { frequency }
    }

    /// Ledgers per checkpoint.
    pub fn frequency(&self) -> u32 {
        self.frequency
    }

    /// Whether `seq` closes a checkpoint.
    ///
    /// # Examples
    ///
    /// ```
    /// use henyey_history::CheckpointManager;
    ///
    /// let checkpoints = CheckpointManager::default();
    /// assert!(checkpoints.is_checkpoint(63));
    /// assert!(checkpoints.is_checkpoint(127));
    /// assert!(!checkpoints.is_checkpoint(64));
    /// ```
    pub fn is_checkpoint(&self, seq: u32) -> bool {
        (u64::from(seq) + 1) % u64::from(self.frequency) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_frequency_uses_default() {
        assert_eq!(CheckpointManager::new(0).frequency(), 64);
        assert_eq!(CheckpointManager::new(8).frequency(), 8);
    }

    #[test]
    fn test_accelerated_frequency() {
        let checkpoints = CheckpointManager::new(8);
        assert!(checkpoints.is_checkpoint(7));
        assert!(checkpoints.is_checkpoint(15));
        assert!(!checkpoints.is_checkpoint(16));
    }
}
