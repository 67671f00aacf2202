//! Export plan assembly.
//!
//! [`ExportPlanner::resolve`] runs the whole resolution pass: load and
//! resolve the configuration, validate the datastore, check and align the
//! ledger range against the network, then build the captive-core
//! configuration. The result is immutable and handed to the export
//! pipeline as-is.

use std::path::Path;

use henyey_history::{ArchiveOptions, ArchivePool};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::captive_core::{build_captive_core_config, CaptiveCoreConfig, VersionProbe};
use crate::config::{ExportConfig, ExportMode, ExportRequest};
use crate::datastore::{DataStoreBackend, DataStoreConfig};
use crate::network::NetworkConfig;
use crate::range::{resolve_range, NetworkStateProvider};
use crate::Result;

/// A fully resolved export.
#[derive(Debug, Clone)]
pub struct ExportPlan {
    /// First ledger to export, aligned to a file boundary.
    pub start: u32,
    /// Last ledger to export, aligned to a file boundary; 0 is unbounded.
    pub end: u32,
    /// Export mode.
    pub mode: ExportMode,
    /// Whether an interrupted export can resume.
    pub resumable: bool,
    /// Resolved network settings.
    pub network: NetworkConfig,
    /// Datastore section as configured.
    pub datastore: DataStoreConfig,
    /// Validated datastore backend.
    pub backend: DataStoreBackend,
    /// Version reported by the stellar-core binary.
    pub core_version: String,
    /// User agent for archive requests.
    pub user_agent: String,
    /// Admin HTTP port; 0 disables it.
    pub admin_port: u16,
}

impl ExportPlan {
    /// Whether the export runs without an end ledger.
    pub fn is_unbounded(&self) -> bool {
        self.end == 0
    }
}

/// Resolves export requests into plans.
pub struct ExportPlanner;

impl ExportPlanner {
    /// Resolve `request` into an export plan and captive-core config.
    ///
    /// When `provider` is `None` the archives from the resolved network
    /// settings are queried through [`ExportPlanner::archive_pool`].
    pub async fn resolve<P>(
        request: &ExportRequest,
        provider: Option<&dyn NetworkStateProvider>,
        probe: &P,
        binary_override: Option<&Path>,
        cancel: &CancellationToken,
    ) -> Result<(ExportPlan, CaptiveCoreConfig)>
    where
        P: VersionProbe + ?Sized,
    {
        let config = ExportConfig::load(request)?;
        Self::resolve_config(config, provider, probe, binary_override, cancel).await
    }

    /// Resolve an already loaded configuration.
    pub async fn resolve_config<P>(
        config: ExportConfig,
        provider: Option<&dyn NetworkStateProvider>,
        probe: &P,
        binary_override: Option<&Path>,
        cancel: &CancellationToken,
    ) -> Result<(ExportPlan, CaptiveCoreConfig)>
    where
        P: VersionProbe + ?Sized,
    {
        let backend = config.datastore.validate()?;
        let schema = config.datastore.schema;
        let request = &config.request;

        let range = match provider {
            Some(provider) => {
                resolve_range(
                    request.start_ledger,
                    request.end_ledger,
                    request.mode,
                    &schema,
                    provider,
                    cancel,
                )
                .await?
            }
            None => {
                let pool = Self::archive_pool(&config)?;
                resolve_range(
                    request.start_ledger,
                    request.end_ledger,
                    request.mode,
                    &schema,
                    &pool,
                    cancel,
                )
                .await?
            }
        };

        let (core, core_version) =
            build_captive_core_config(&config.network, binary_override, &config.user_agent, probe)
                .await?;

        let plan = ExportPlan {
            start: range.start,
            end: range.end,
            mode: request.mode,
            resumable: request.mode.is_resumable(),
            network: config.network,
            datastore: config.datastore,
            backend,
            core_version,
            user_agent: config.user_agent,
            admin_port: config.admin_port,
        };

        info!(
            mode = plan.mode.name(),
            start = plan.start,
            end = plan.end,
            resumable = plan.resumable,
            datastore = plan.backend.kind(),
            core_version = %plan.core_version,
            "Resolved export plan"
        );

        Ok((plan, core))
    }

    /// Archive pool for the configured network, used as the default
    /// network-state provider.
    pub fn archive_pool(config: &ExportConfig) -> Result<ArchivePool> {
        let options = ArchiveOptions {
            user_agent: config.user_agent.clone(),
            checkpoint_frequency: config.network.checkpoint_frequency,
            network_passphrase: Some(config.network.passphrase.clone()),
            ..Default::default()
        };
        Ok(ArchivePool::from_urls(
            &config.network.history_archive_urls,
            options,
        )?)
    }
}
