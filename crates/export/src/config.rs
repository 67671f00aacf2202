//! Export configuration loading.
//!
//! The exporter is configured by a TOML document plus a handful of
//! environment overrides. Loading parses the document, applies the
//! overrides and resolves the network settings; the datastore section is
//! carried through unvalidated and checked by the planner.
//!
//! # Environment overrides
//!
//! Variables take precedence over the document:
//!
//! - `HENYEY_EXPORT_NETWORK`
//! - `HENYEY_EXPORT_USER_AGENT`
//! - `HENYEY_EXPORT_CORE_BINARY_PATH`
//! - `HENYEY_EXPORT_ADMIN_PORT`

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::datastore::{DataStoreConfig, DataStoreSchema};
use crate::error::ConfigError;
use crate::network::{Network, NetworkConfig};

/// Default config document path.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Default user agent for history archive requests.
pub const DEFAULT_USER_AGENT: &str = "henyey-export";

/// How the export treats the requested range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportMode {
    /// Export a closed, bounded range exactly once.
    ScanAndFill,
    /// Extend an existing dataset, possibly without an end.
    Append,
}

impl ExportMode {
    /// Human readable name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            ExportMode::ScanAndFill => "Scan and Fill",
            ExportMode::Append => "Append",
        }
    }

    /// Whether an interrupted export may pick up where it left off.
    pub fn is_resumable(&self) -> bool {
        matches!(self, ExportMode::Append)
    }
}

impl fmt::Display for ExportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What the user asked to export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    /// First ledger to export.
    pub start_ledger: u32,
    /// Last ledger to export; 0 means unbounded.
    pub end_ledger: u32,
    /// Export mode.
    pub mode: ExportMode,
    /// Path of the TOML config document.
    pub config_path: PathBuf,
}

/// The `[stellar_core_config]` section as written in the document.
///
/// Empty strings and lists mean "not set".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StellarCoreConfig {
    /// Preset network name (`pubnet` or `testnet`).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub network: String,

    /// Explicit network passphrase.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub network_passphrase: String,

    /// Explicit history archive URLs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history_archive_urls: Vec<String>,

    /// Path to the stellar-core binary.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stellar_core_binary_path: String,

    /// Captive-core TOML replacing the preset one.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub captive_core_toml_path: String,

    /// Checkpoint frequency; 0 uses the network default.
    #[serde(default)]
    pub checkpoint_frequency: u32,

    /// Working directory for captive core.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub storage_path: String,
}

/// The config document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigDocument {
    /// Port of the admin HTTP endpoint; 0 disables it.
    #[serde(default)]
    pub admin_port: u16,

    /// User agent for history archive requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Export destination.
    #[serde(default)]
    pub datastore_config: DataStoreConfig,

    /// Network and captive-core settings.
    #[serde(default)]
    pub stellar_core_config: StellarCoreConfig,
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl ConfigDocument {
    /// Parse a config document from a file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::NotFound {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `HENYEY_EXPORT_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides using `lookup` to read variables.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("HENYEY_EXPORT_NETWORK") {
            self.stellar_core_config.network = val;
        }
        if let Some(val) = lookup("HENYEY_EXPORT_USER_AGENT") {
            self.user_agent = val;
        }
        if let Some(val) = lookup("HENYEY_EXPORT_CORE_BINARY_PATH") {
            self.stellar_core_config.stellar_core_binary_path = val;
        }
        if let Some(val) = lookup("HENYEY_EXPORT_ADMIN_PORT") {
            self.admin_port = val.parse().map_err(|_| ConfigError::InvalidEnvOverride {
                name: "HENYEY_EXPORT_ADMIN_PORT",
                value: val.clone(),
            })?;
        }
        Ok(())
    }

    /// A testnet document writing single-ledger files to the local
    /// filesystem.
    pub fn testnet_sample() -> Self {
        Self {
            admin_port: 6061,
            user_agent: default_user_agent(),
            datastore_config: DataStoreConfig {
                kind: "FS".to_string(),
                params: [("base_path".to_string(), "ledgers/testnet".to_string())]
                    .into_iter()
                    .collect(),
                schema: DataStoreSchema {
                    ledgers_per_file: 1,
                    files_per_partition: 64000,
                },
            },
            stellar_core_config: StellarCoreConfig {
                network: Network::Testnet.to_string(),
                stellar_core_binary_path: "/usr/bin/stellar-core".to_string(),
                checkpoint_frequency: 64,
                ..Default::default()
            },
        }
    }
}

/// The combined configuration: request, validated network settings and the
/// datastore section.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// The request this configuration was loaded for.
    pub request: ExportRequest,
    /// Admin HTTP port; 0 disables it.
    pub admin_port: u16,
    /// User agent for history archive requests.
    pub user_agent: String,
    /// Datastore section, checked by the planner.
    pub datastore: DataStoreConfig,
    /// Resolved network settings.
    pub network: NetworkConfig,
}

impl ExportConfig {
    /// Load the config document named by `request`, apply environment
    /// overrides and resolve the network settings.
    pub fn load(request: &ExportRequest) -> Result<Self, ConfigError> {
        let mut document = ConfigDocument::from_file(&request.config_path)?;
        document.apply_env_overrides()?;
        Self::from_document(request, document)
    }

    /// Resolve an already parsed document.
    ///
    /// A relative `captive_core_toml_path` is taken relative to the
    /// directory holding `request.config_path`.
    pub fn from_document(
        request: &ExportRequest,
        document: ConfigDocument,
    ) -> Result<Self, ConfigError> {
        info!(
            mode = request.mode.name(),
            start = request.start_ledger,
            end = request.end_ledger,
            config = %request.config_path.display(),
            "Loading export config"
        );

        let base_dir = request
            .config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let network = NetworkConfig::resolve(&document.stellar_core_config, &base_dir)?;

        let user_agent = if document.user_agent.trim().is_empty() {
            default_user_agent()
        } else {
            document.user_agent
        };

        Ok(Self {
            request: request.clone(),
            admin_port: document.admin_port,
            user_agent,
            datastore: document.datastore_config,
            network,
        })
    }

    /// Render a sample config document.
    pub fn sample_config() -> Result<String, ConfigError> {
        let header = "# henyey export configuration\n\
                      #\n\
                      # Custom networks leave `network` empty and set network_passphrase,\n\
                      # history_archive_urls and captive_core_toml_path instead.\n\n";
        let body = toml::to_string_pretty(&ConfigDocument::testnet_sample())?;
        Ok(format!("{header}{body}"))
    }
}
