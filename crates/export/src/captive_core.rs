//! Captive stellar-core configuration.
//!
//! The exporter streams ledgers from a captive stellar-core process. This
//! module assembles everything needed to launch it: the binary (and its
//! version), and the core TOML with the network passphrase and history
//! archive get-commands filled in. Nothing here starts the process.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use henyey_history::DEFAULT_CHECKPOINT_FREQUENCY;
use tokio::process::Command;
use toml::{Table, Value};
use tracing::{debug, info};

use crate::error::BuildError;
use crate::network::NetworkConfig;

/// Get-command template for history archives; `{0}` is the remote file,
/// `{1}` the local destination.
const HISTORY_GET_TEMPLATE: &str = "curl -sf {url}/{0} -o {1}";

/// Reports the version of a stellar-core binary.
#[async_trait]
pub trait VersionProbe: Send + Sync {
    /// Return the version string of the binary at `path`.
    async fn probe(&self, path: &Path) -> io::Result<String>;
}

#[async_trait]
impl<F> VersionProbe for F
where
    F: Fn(&Path) -> io::Result<String> + Send + Sync,
{
    async fn probe(&self, path: &Path) -> io::Result<String> {
        self(path)
    }
}

/// Runs `<binary> version` and reports the first non-empty line.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandVersionProbe;

#[async_trait]
impl VersionProbe for CommandVersionProbe {
    async fn probe(&self, path: &Path) -> io::Result<String> {
        debug!(binary = %path.display(), "Probing stellar-core version");
        let output = Command::new(path)
            .arg("version")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(io::Error::other(format!(
                "`{} version` exited with {:?}: {}",
                path.display(),
                output.status.code(),
                stderr.trim()
            )));
        }

        String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidData, "empty version output")
            })
    }
}

/// Values substituted into the captive-core TOML.
#[derive(Debug, Clone, Default)]
pub struct CaptiveCoreTomlParams {
    /// Network passphrase.
    pub network_passphrase: String,
    /// Archives used for the generated `[HISTORY.hN]` tables.
    pub history_archive_urls: Vec<String>,
    /// Whether core keeps its ledger state in an on-disk database.
    pub use_db: bool,
    /// Captive-core working directory.
    pub storage_path: Option<PathBuf>,
}

/// A materialized captive-core TOML document.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptiveCoreToml {
    table: Table,
}

impl CaptiveCoreToml {
    /// Parse `data` and fill in the values from `params`.
    ///
    /// `NETWORK_PASSPHRASE` is set when absent and must agree with the
    /// resolved passphrase when present. History tables are generated only
    /// if the document has none of its own.
    pub fn from_data(data: &[u8], params: &CaptiveCoreTomlParams) -> Result<Self, BuildError> {
        let text = std::str::from_utf8(data)
            .map_err(|e| BuildError::InvalidCoreToml(e.to_string()))?;
        let mut table: Table = text
            .parse()
            .map_err(|e: toml::de::Error| BuildError::InvalidCoreToml(e.to_string()))?;

        match table.get("NETWORK_PASSPHRASE") {
            Some(Value::String(found)) if found != &params.network_passphrase => {
                return Err(BuildError::PassphraseMismatch {
                    expected: params.network_passphrase.clone(),
                    found: found.clone(),
                });
            }
            Some(Value::String(_)) => {}
            Some(other) => {
                return Err(BuildError::InvalidCoreToml(format!(
                    "NETWORK_PASSPHRASE must be a string, found {}",
                    other.type_str()
                )));
            }
            None => {
                table.insert(
                    "NETWORK_PASSPHRASE".to_string(),
                    Value::String(params.network_passphrase.clone()),
                );
            }
        }

        if !table.contains_key("HISTORY") {
            let history: Table = params
                .history_archive_urls
                .iter()
                .enumerate()
                .map(|(i, url)| {
                    let mut archive = Table::new();
                    archive.insert("get".to_string(), Value::String(history_get_command(url)));
                    (format!("h{i}"), Value::Table(archive))
                })
                .collect();
            table.insert("HISTORY".to_string(), Value::Table(history));
        }

        if params.use_db && !table.contains_key("DATABASE") {
            let database = match &params.storage_path {
                Some(dir) => format!("sqlite3://{}", dir.join("stellar.db").display()),
                None => "sqlite3://stellar.db".to_string(),
            };
            table.insert("DATABASE".to_string(), Value::String(database));
        }

        Ok(Self { table })
    }

    /// The `NETWORK_PASSPHRASE` entry.
    pub fn network_passphrase(&self) -> Option<&str> {
        self.table.get("NETWORK_PASSPHRASE").and_then(Value::as_str)
    }

    /// Names of the `[HISTORY.*]` tables.
    pub fn history_archives(&self) -> Vec<&str> {
        self.table
            .get("HISTORY")
            .and_then(Value::as_table)
            .map(|history| history.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// The parsed document.
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Serialize for writing next to the captive-core process.
    pub fn to_toml_string(&self) -> Result<String, BuildError> {
        toml::to_string(&self.table).map_err(|e| BuildError::InvalidCoreToml(e.to_string()))
    }
}

fn history_get_command(url: &str) -> String {
    HISTORY_GET_TEMPLATE.replace("{url}", url.trim_end_matches('/'))
}

/// Everything needed to launch captive core.
#[derive(Debug, Clone)]
pub struct CaptiveCoreConfig {
    /// stellar-core binary.
    pub binary_path: PathBuf,
    /// Network passphrase.
    pub network_passphrase: String,
    /// History archive URLs.
    pub history_archive_urls: Vec<String>,
    /// Checkpoint frequency.
    pub checkpoint_frequency: u32,
    /// Materialized core TOML.
    pub toml: CaptiveCoreToml,
    /// User agent for archive requests.
    pub user_agent: String,
    /// Whether core keeps its state on disk.
    pub use_db: bool,
    /// Working directory.
    pub storage_path: Option<PathBuf>,
}

/// Assemble the captive-core configuration and probe the binary version.
///
/// `binary_override` is only consulted when the network settings do not
/// name a binary. Returns the configuration and the probed version.
pub async fn build_captive_core_config<P>(
    network: &NetworkConfig,
    binary_override: Option<&Path>,
    user_agent: &str,
    probe: &P,
) -> Result<(CaptiveCoreConfig, String), BuildError>
where
    P: VersionProbe + ?Sized,
{
    let binary_path = network
        .core_binary_path
        .clone()
        .filter(|path| !path.as_os_str().is_empty())
        .or_else(|| binary_override.map(Path::to_path_buf))
        .filter(|path| !path.as_os_str().is_empty())
        .ok_or(BuildError::NoBinaryPath)?;

    let version = probe
        .probe(&binary_path)
        .await
        .map_err(|source| BuildError::VersionProbeFailed {
            path: binary_path.clone(),
            source,
        })?;

    let params = CaptiveCoreTomlParams {
        network_passphrase: network.passphrase.clone(),
        history_archive_urls: network.history_archive_urls.clone(),
        use_db: true,
        storage_path: network.storage_path.clone(),
    };
    let toml = CaptiveCoreToml::from_data(&network.core_toml, &params)?;

    let checkpoint_frequency = match network.checkpoint_frequency {
        0 => DEFAULT_CHECKPOINT_FREQUENCY,
        n => n,
    };

    info!(
        binary = %binary_path.display(),
        version = %version,
        checkpoint_frequency = checkpoint_frequency,
        history_archives = toml.history_archives().len(),
        "Built captive core config"
    );

    let config = CaptiveCoreConfig {
        binary_path,
        network_passphrase: params.network_passphrase,
        history_archive_urls: params.history_archive_urls,
        checkpoint_frequency,
        toml,
        user_agent: user_agent.to_string(),
        use_db: params.use_db,
        storage_path: params.storage_path,
    };
    Ok((config, version))
}
