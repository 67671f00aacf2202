//! History Archive State (HAS) parsing.
//!
//! The History Archive State is a JSON file that describes the current state
//! of a Stellar history archive. The exporter reads only the root HAS,
//! published at `.well-known/stellar-history.json`, to learn the latest
//! checkpointed ledger. Bucket-list fields are present in the document but
//! ignored here.

use serde::{Deserialize, Serialize};

use crate::error::HistoryError;

/// History Archive State - the root JSON file describing archive state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryArchiveState {
    /// Format version (currently 2).
    pub version: u32,

    /// Server identifier (e.g., "stellar-core 25.0.1").
    #[serde(default)]
    pub server: Option<String>,

    /// Current ledger sequence (always a checkpoint ledger).
    pub current_ledger: u32,

    /// Network passphrase.
    #[serde(default)]
    pub network_passphrase: Option<String>,
}

impl HistoryArchiveState {
    /// Parse a History Archive State from JSON.
    ///
    /// # Examples
    ///
    /// ```
    /// use henyey_history::archive_state::HistoryArchiveState;
    ///
    /// let json = r#"{
    ///     "version": 2,
    ///     "server": "stellar-core 25.0.1",
    ///     "currentLedger": 12351,
    ///     "networkPassphrase": "Test SDF Network ; September 2015",
    ///     "currentBuckets": []
    /// }"#;
    ///
    /// let has = HistoryArchiveState::from_json(json).unwrap();
    /// assert_eq!(has.current_ledger(), 12351);
    /// ```
    pub fn from_json(json: &str) -> Result<Self, HistoryError> {
        serde_json::from_str(json).map_err(HistoryError::Json)
    }

    /// Parse a History Archive State from raw bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, HistoryError> {
        serde_json::from_slice(bytes).map_err(HistoryError::Json)
    }

    /// Get the current ledger sequence.
    #[inline]
    pub fn current_ledger(&self) -> u32 {
        self.current_ledger
    }

    /// Get the network passphrase if available.
    pub fn network_passphrase(&self) -> Option<&str> {
        self.network_passphrase.as_deref()
    }

    /// Get the server version string if available.
    pub fn server(&self) -> Option<&str> {
        self.server.as_deref()
    }
}
