//! Error types for export plan resolution.
//!
//! Each resolution stage has its own error family so callers can match on
//! the stage that failed; [`ExportError`] wraps them for the planner. All of
//! them are terminal: resolution never retries and never proceeds past a
//! failed check.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for export plan resolution.
pub type Result<T> = std::result::Result<T, ExportError>;

/// Datastore configuration shape problems.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// `datastore_config.type` is empty.
    #[error("datastore type is required")]
    MissingKind,

    /// The kind-specific required parameter is absent.
    #[error("{name} is required for {kind}")]
    MissingParameter {
        /// Datastore kind.
        kind: String,
        /// Name of the missing parameter.
        name: &'static str,
    },

    /// The datastore kind is not one of the supported backends.
    #[error("unsupported datastore type: {0}")]
    UnsupportedKind(String),

    /// A partitioning schema field is zero.
    #[error("{field} must be greater than 0")]
    InvalidSchema {
        /// Name of the offending schema field.
        field: &'static str,
    },
}

/// Config document parse and network merge problems.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config document could not be read.
    #[error("config file {} was not found: {source}", path.display())]
    NotFound {
        /// Path of the config document.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config document is not valid TOML or has wrong field types.
    #[error("error parsing config file {}: {source}", path.display())]
    Parse {
        /// Path of the config document.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },

    /// `stellar_core_config.network` names no known preset.
    #[error("invalid network {0:?}: must be pubnet or testnet, or leave it empty and set network_passphrase, history_archive_urls and captive_core_toml_path")]
    UnknownNetwork(String),

    /// Neither a preset nor the full set of custom network settings.
    #[error("invalid captive core config: stellar_core_config.network must be set to pubnet or testnet, or stellar_core_config.network_passphrase, stellar_core_config.history_archive_urls and stellar_core_config.captive_core_toml_path must all be set")]
    IncompleteNetworkConfig,

    /// The captive-core TOML override could not be read.
    #[error("failed to load captive_core_toml_path file {}: {source}", path.display())]
    ConfigFileUnreadable {
        /// Path of the captive-core TOML file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The sample config document could not be rendered.
    #[error("failed to render config document: {0}")]
    Render(#[from] toml::ser::Error),

    /// An environment override holds a value of the wrong type.
    #[error("invalid value {value:?} for environment variable {name}")]
    InvalidEnvOverride {
        /// Variable name.
        name: &'static str,
        /// Offending value.
        value: String,
    },
}

/// Ledger range legality problems.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    /// Ledger 1 is genesis and cannot be exported on its own.
    #[error("invalid start value {start}, must be greater than one")]
    StartTooLow {
        /// Requested start ledger.
        start: u32,
    },

    /// Scan-and-fill exports need a bounded range.
    #[error("invalid end value, unbounded mode not supported, end must be greater than start")]
    UnboundedNotAllowed,

    /// A bounded range must end after it starts.
    #[error("invalid end value {end}, must be greater than start {start}")]
    EndNotAfterStart {
        /// Requested start ledger.
        start: u32,
        /// Requested end ledger.
        end: u32,
    },

    /// The latest network ledger could not be determined.
    #[error("failed to retrieve the latest ledger sequence from history archives: {0}")]
    NetworkStateUnavailable(String),

    /// Resolution was cancelled while querying network state.
    #[error("ledger range resolution cancelled")]
    Cancelled,

    /// Start lies beyond what the network can have produced.
    #[error("start {start} exceeds latest network ledger {ceiling}")]
    StartBeyondNetwork {
        /// Requested start ledger.
        start: u32,
        /// Latest ledger plus the checkpoint buffer.
        ceiling: u64,
    },

    /// End lies beyond what the network can have produced.
    #[error("end {end} exceeds latest network ledger {ceiling}")]
    EndBeyondNetwork {
        /// Requested end ledger.
        end: u32,
        /// Latest ledger plus the checkpoint buffer.
        ceiling: u64,
    },

    /// Rounding the end up to a file boundary leaves the ledger number space.
    #[error("end {end} cannot be aligned to a file boundary of {ledgers_per_file} ledgers")]
    AlignmentOverflow {
        /// Requested end ledger.
        end: u32,
        /// Ledgers per datastore file.
        ledgers_per_file: u32,
    },
}

/// Captive-core configuration assembly problems.
#[derive(Debug, Error)]
pub enum BuildError {
    /// No stellar-core binary configured or found.
    #[error("invalid captive core config, no stellar-core binary path was provided")]
    NoBinaryPath,

    /// The version probe failed.
    #[error("failed to get stellar-core version from {}: {source}", path.display())]
    VersionProbeFailed {
        /// Binary that was probed.
        path: PathBuf,
        /// Underlying failure.
        source: std::io::Error,
    },

    /// The captive-core TOML payload is not valid TOML.
    #[error("failed to create captive-core toml: {0}")]
    InvalidCoreToml(String),

    /// The captive-core TOML names a different network.
    #[error("NETWORK_PASSPHRASE in captive core config {found:?} does not match network passphrase {expected:?}")]
    PassphraseMismatch {
        /// Resolved network passphrase.
        expected: String,
        /// Passphrase found in the captive-core TOML.
        found: String,
    },
}

/// Any failure while resolving an export plan.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Datastore validation failed.
    #[error("invalid datastore config: {0}")]
    Validation(#[from] ValidationError),

    /// Config document loading or network resolution failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The requested ledger range is not legal.
    #[error("invalid ledger range: {0}")]
    Range(#[from] RangeError),

    /// Captive-core configuration could not be built.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// The network-state provider could not be constructed.
    #[error("history archive setup failed: {0}")]
    History(#[from] henyey_history::HistoryError),
}
