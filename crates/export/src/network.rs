//! Network presets and network setting resolution.
//!
//! A config document either names a preset network (`pubnet` or
//! `testnet`) or spells out a custom network completely. Preset values form
//! the baseline; any explicitly configured passphrase, archive URL list or
//! captive-core TOML file replaces the corresponding baseline value.
//!
//! | Network | Passphrase |
//! |---------|------------|
//! | Pubnet | `"Public Global Stellar Network ; September 2015"` |
//! | Testnet | `"Test SDF Network ; September 2015"` |

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::info;

use crate::config::StellarCoreConfig;
use crate::error::ConfigError;

/// Passphrase of the Stellar public network.
pub const PUBNET_PASSPHRASE: &str = "Public Global Stellar Network ; September 2015";

/// Passphrase of the Stellar test network.
pub const TESTNET_PASSPHRASE: &str = "Test SDF Network ; September 2015";

/// SDF history archives for the public network.
pub const PUBNET_ARCHIVE_URLS: &[&str] = &[
    "https://history.stellar.org/prd/core-live/core_live_001",
    "https://history.stellar.org/prd/core-live/core_live_002",
    "https://history.stellar.org/prd/core-live/core_live_003",
];

/// SDF history archives for the test network.
pub const TESTNET_ARCHIVE_URLS: &[&str] = &[
    "https://history.stellar.org/prd/core-testnet/core_testnet_001",
    "https://history.stellar.org/prd/core-testnet/core_testnet_002",
    "https://history.stellar.org/prd/core-testnet/core_testnet_003",
];

const PUBNET_CORE_TOML: &[u8] = include_bytes!("../configs/pubnet.cfg");
const TESTNET_CORE_TOML: &[u8] = include_bytes!("../configs/testnet.cfg");

/// A preset Stellar network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Network {
    /// The public network.
    Pubnet,
    /// The SDF test network.
    Testnet,
}

impl Network {
    /// Network passphrase.
    pub fn passphrase(&self) -> &'static str {
        match self {
            Network::Pubnet => PUBNET_PASSPHRASE,
            Network::Testnet => TESTNET_PASSPHRASE,
        }
    }

    /// SDF history archive URLs.
    pub fn archive_urls(&self) -> Vec<String> {
        let urls = match self {
            Network::Pubnet => PUBNET_ARCHIVE_URLS,
            Network::Testnet => TESTNET_ARCHIVE_URLS,
        };
        urls.iter().map(|url| url.to_string()).collect()
    }

    /// Default captive-core TOML for this network.
    pub fn default_core_toml(&self) -> &'static [u8] {
        match self {
            Network::Pubnet => PUBNET_CORE_TOML,
            Network::Testnet => TESTNET_CORE_TOML,
        }
    }
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pubnet" | "public" => Ok(Network::Pubnet),
            "testnet" | "test" => Ok(Network::Testnet),
            _ => Err(ConfigError::UnknownNetwork(s.to_string())),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Pubnet => write!(f, "pubnet"),
            Network::Testnet => write!(f, "testnet"),
        }
    }
}

/// Three-tier setting resolution: an explicit value wins over the preset,
/// and the preset wins over the default.
///
/// # Examples
///
/// ```
/// use henyey_export::network::overlay;
///
/// assert_eq!(overlay(Some("mine"), Some("preset"), ""), "mine");
/// assert_eq!(overlay(None, Some("preset"), ""), "preset");
/// assert_eq!(overlay::<&str>(None, None, ""), "");
/// ```
pub fn overlay<T>(explicit: Option<T>, preset: Option<T>, default: T) -> T {
    explicit.or(preset).unwrap_or(default)
}

/// Resolved network settings.
///
/// After [`NetworkConfig::resolve`] the passphrase and the archive URL list
/// are never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Preset the settings were based on, `None` for a custom network.
    pub network: Option<Network>,
    /// Network passphrase.
    pub passphrase: String,
    /// History archive base URLs.
    pub history_archive_urls: Vec<String>,
    /// Checkpoint frequency; zero means the network default.
    pub checkpoint_frequency: u32,
    /// Configured stellar-core binary.
    pub core_binary_path: Option<PathBuf>,
    /// Captive-core TOML payload before parameter substitution.
    pub core_toml: Vec<u8>,
    /// Working directory for captive core.
    pub storage_path: Option<PathBuf>,
}

impl NetworkConfig {
    /// Merge the `[stellar_core_config]` section with its preset.
    ///
    /// Relative `captive_core_toml_path` values are resolved against
    /// `base_dir`, normally the directory holding the config document.
    pub fn resolve(raw: &StellarCoreConfig, base_dir: &Path) -> Result<Self, ConfigError> {
        let explicit_passphrase = non_empty(&raw.network_passphrase).map(str::to_string);
        let explicit_urls = Some(raw.history_archive_urls.clone()).filter(|urls| !urls.is_empty());
        let toml_path = non_empty(&raw.captive_core_toml_path).map(|p| base_dir.join(p));

        let network = match non_empty(&raw.network) {
            Some(name) => Some(name.trim().parse::<Network>()?),
            None => {
                if explicit_passphrase.is_none() || explicit_urls.is_none() || toml_path.is_none()
                {
                    return Err(ConfigError::IncompleteNetworkConfig);
                }
                None
            }
        };

        let explicit_toml = match &toml_path {
            Some(path) => Some(std::fs::read(path).map_err(|source| {
                ConfigError::ConfigFileUnreadable {
                    path: path.clone(),
                    source,
                }
            })?),
            None => None,
        };

        let passphrase = overlay(
            explicit_passphrase,
            network.map(|n| n.passphrase().to_string()),
            String::new(),
        );
        let history_archive_urls =
            overlay(explicit_urls, network.map(|n| n.archive_urls()), Vec::new());
        let core_toml = overlay(
            explicit_toml,
            network.map(|n| n.default_core_toml().to_vec()),
            Vec::new(),
        );

        let resolved = Self {
            network,
            passphrase,
            history_archive_urls,
            checkpoint_frequency: raw.checkpoint_frequency,
            core_binary_path: non_empty(&raw.stellar_core_binary_path).map(PathBuf::from),
            core_toml,
            storage_path: non_empty(&raw.storage_path).map(PathBuf::from),
        };

        info!(
            network = %resolved.network.map_or_else(|| "custom".to_string(), |n| n.to_string()),
            passphrase = %resolved.passphrase,
            archive_urls = ?resolved.history_archive_urls,
            core_binary_path = ?resolved.core_binary_path,
            core_toml_bytes = resolved.core_toml.len(),
            "Resolved network config"
        );

        Ok(resolved)
    }
}

/// `value` unchanged, or `None` when it is blank.
fn non_empty(value: &str) -> Option<&str> {
    (!value.trim().is_empty()).then_some(value)
}
