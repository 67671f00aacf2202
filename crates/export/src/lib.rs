//! Export plan resolution for henyey.
//!
//! Before a ledger export starts, the request is turned into a plan that the
//! export pipeline can follow without further checks:
//!
//! 1. The config document is loaded and the network settings are resolved
//!    from a preset plus explicit overrides ([`config`], [`network`]).
//! 2. The datastore section is validated ([`datastore`]).
//! 3. The requested ledger range is checked against the latest ledger the
//!    network has published and aligned to datastore file boundaries
//!    ([`range`]).
//! 4. The captive stellar-core configuration is assembled ([`captive_core`]).
//!
//! [`ExportPlanner`] runs these steps in order and stops at the first error.
//!
//! # Example
//!
//! ```no_run
//! use std::path::PathBuf;
//!
//! use henyey_export::{CommandVersionProbe, ExportMode, ExportPlanner, ExportRequest};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> henyey_export::Result<()> {
//! let request = ExportRequest {
//!     start_ledger: 2,
//!     end_ledger: 0,
//!     mode: ExportMode::Append,
//!     config_path: PathBuf::from("config.toml"),
//! };
//! let (plan, core) = ExportPlanner::resolve(
//!     &request,
//!     None,
//!     &CommandVersionProbe,
//!     None,
//!     &CancellationToken::new(),
//! )
//! .await?;
//! println!("exporting {}..{} with {}", plan.start, plan.end, core.binary_path.display());
//! # Ok(())
//! # }
//! ```

pub mod captive_core;
pub mod config;
pub mod datastore;
pub mod error;
pub mod logging;
pub mod network;
pub mod plan;
pub mod range;

pub use captive_core::{
    build_captive_core_config, CaptiveCoreConfig, CaptiveCoreToml, CaptiveCoreTomlParams,
    CommandVersionProbe, VersionProbe,
};
pub use config::{ConfigDocument, ExportConfig, ExportMode, ExportRequest, StellarCoreConfig};
pub use datastore::{DataStoreBackend, DataStoreConfig, DataStoreSchema};
pub use error::{BuildError, ConfigError, ExportError, RangeError, Result, ValidationError};
pub use network::{overlay, Network, NetworkConfig};
pub use plan::{ExportPlan, ExportPlanner};
pub use range::{align_end, align_start, resolve_range, LedgerRange, NetworkStateProvider};
