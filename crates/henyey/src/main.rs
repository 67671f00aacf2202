//! henyey - resolve Stellar ledger exports
//!
//! Turns an export request into a validated, file-aligned export plan and
//! the captive stellar-core configuration that drives it.
//!
//! # Quick Start
//!
//! ```bash
//! # Print a sample configuration
//! henyey sample-config > config.toml
//!
//! # Export a closed range
//! henyey scan-and-fill --start 2 --end 64000 --config-file config.toml
//!
//! # Extend an existing dataset without an end
//! henyey append --start 64001
//! ```
//!
//! Every command fails with a non-zero exit status on the first invalid
//! setting.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use henyey_export::config::DEFAULT_CONFIG_PATH;
use henyey_export::logging::{self, LogConfig, LogFormat};
use henyey_export::{
    CaptiveCoreConfig, CommandVersionProbe, ExportConfig, ExportMode, ExportPlan, ExportPlanner,
    ExportRequest,
};

/// Stellar ledger export planner
#[derive(Parser)]
#[command(name = "henyey")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Log output format
    #[arg(long, default_value = "text", global = true)]
    log_format: CliLogFormat,

    /// stellar-core binary used when the config names none
    #[arg(long, value_name = "PATH", global = true)]
    core_binary: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Log output format for CLI
#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum CliLogFormat {
    #[default]
    Text,
    Json,
}

impl From<CliLogFormat> for LogFormat {
    fn from(fmt: CliLogFormat) -> Self {
        match fmt {
            CliLogFormat::Text => LogFormat::Text,
            CliLogFormat::Json => LogFormat::Json,
        }
    }
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Export a bounded ledger range exactly once
    ScanAndFill {
        /// First ledger to export
        #[arg(long)]
        start: u32,

        /// Last ledger to export
        #[arg(long)]
        end: u32,

        /// Path to the export config document
        #[arg(long, value_name = "FILE", default_value = DEFAULT_CONFIG_PATH)]
        config_file: PathBuf,
    },

    /// Extend an existing dataset, resuming where it left off
    Append {
        /// First ledger to export
        #[arg(long)]
        start: u32,

        /// Last ledger to export; 0 keeps exporting new ledgers
        #[arg(long, default_value_t = 0)]
        end: u32,

        /// Path to the export config document
        #[arg(long, value_name = "FILE", default_value = DEFAULT_CONFIG_PATH)]
        config_file: PathBuf,
    },

    /// Print a sample configuration file
    SampleConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&cli)?;

    let binary_override = cli
        .core_binary
        .clone()
        .or_else(|| find_on_path("stellar-core"));

    match cli.command {
        Commands::ScanAndFill {
            start,
            end,
            config_file,
        } => {
            cmd_export(
                ExportMode::ScanAndFill,
                start,
                end,
                config_file,
                binary_override.as_deref(),
            )
            .await
        }

        Commands::Append {
            start,
            end,
            config_file,
        } => {
            cmd_export(
                ExportMode::Append,
                start,
                end,
                config_file,
                binary_override.as_deref(),
            )
            .await
        }

        Commands::SampleConfig => cmd_sample_config(),
    }
}

/// Initialize the logging subsystem.
fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    logging::init(&log_config(cli))
}

/// Logging configuration selected by the global flags.
fn log_config(cli: &Cli) -> LogConfig {
    let config = match LogFormat::from(cli.log_format) {
        LogFormat::Json => LogConfig::json(),
        LogFormat::Text if cli.verbose || cli.trace => LogConfig::verbose(),
        LogFormat::Text => LogConfig::default(),
    };

    if cli.trace {
        config.with_level("trace")
    } else if cli.verbose {
        config.with_level("debug")
    } else {
        config
    }
}

/// Resolve an export and print the plan.
async fn cmd_export(
    mode: ExportMode,
    start: u32,
    end: u32,
    config_file: PathBuf,
    binary_override: Option<&Path>,
) -> anyhow::Result<()> {
    let request = ExportRequest {
        start_ledger: start,
        end_ledger: end,
        mode,
        config_path: config_file,
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling");
            on_interrupt.cancel();
        }
    });

    let config = ExportConfig::load(&request).with_context(|| {
        format!(
            "failed to load config {}",
            request.config_path.display()
        )
    })?;
    let (plan, core) = ExportPlanner::resolve_config(
        config,
        None,
        &CommandVersionProbe,
        binary_override,
        &cancel,
    )
    .await
    .with_context(|| format!("{} export could not be planned", mode.name()))?;

    print_plan(&plan, &core)
}

fn print_plan(plan: &ExportPlan, core: &CaptiveCoreConfig) -> anyhow::Result<()> {
    let end = if plan.is_unbounded() {
        "unbounded".to_string()
    } else {
        plan.end.to_string()
    };
    let network = plan
        .network
        .network
        .map_or_else(|| "custom".to_string(), |n| n.to_string());

    println!("Export plan");
    println!("  mode:               {}", plan.mode.name());
    println!("  start ledger:       {}", plan.start);
    println!("  end ledger:         {}", end);
    println!("  resumable:          {}", plan.resumable);
    println!("  network:            {}", network);
    println!("  passphrase:         {}", plan.network.passphrase);
    println!("  datastore:          {}", plan.backend.kind());
    println!(
        "  ledgers per file:   {}",
        plan.datastore.schema.ledgers_per_file
    );
    println!(
        "  files per partition: {}",
        plan.datastore.schema.files_per_partition
    );
    println!("  stellar-core:       {}", core.binary_path.display());
    println!("  core version:       {}", plan.core_version);
    println!("  checkpoint freq:    {}", core.checkpoint_frequency);
    println!("  user agent:         {}", plan.user_agent);
    if plan.admin_port != 0 {
        println!("  admin port:         {}", plan.admin_port);
    }
    println!();
    println!("Captive core config");
    println!("{}", core.toml.to_toml_string()?);
    Ok(())
}

/// Print a sample configuration file.
fn cmd_sample_config() -> anyhow::Result<()> {
    print!("{}", ExportConfig::sample_config()?);
    Ok(())
}

/// First executable named `name` on `PATH`.
fn find_on_path(name: &str) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_append_end_defaults_to_unbounded() {
        let cli = Cli::try_parse_from(["henyey", "append", "--start", "64001"]).unwrap();
        match cli.command {
            Commands::Append {
                start,
                end,
                config_file,
            } => {
                assert_eq!(start, 64001);
                assert_eq!(end, 0);
                assert_eq!(config_file, PathBuf::from(DEFAULT_CONFIG_PATH));
            }
            _ => panic!("expected append"),
        }
    }

    #[test]
    fn test_scan_and_fill_requires_end() {
        assert!(Cli::try_parse_from(["henyey", "scan-and-fill", "--start", "2"]).is_err());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from([
            "henyey",
            "sample-config",
            "--log-format",
            "json",
            "--core-binary",
            "/opt/stellar-core",
            "--verbose",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.log_format, CliLogFormat::Json));
        assert_eq!(cli.core_binary, Some(PathBuf::from("/opt/stellar-core")));
    }

    #[test]
    fn test_log_config_from_flags() {
        let cli = Cli::try_parse_from(["henyey", "sample-config"]).unwrap();
        let config = log_config(&cli);
        assert_eq!(config.level, tracing::Level::INFO);
        assert_eq!(config.format, LogFormat::Text);
        assert!(!config.with_source_location);

        let cli = Cli::try_parse_from(["henyey", "--verbose", "sample-config"]).unwrap();
        let config = log_config(&cli);
        assert_eq!(config.level, tracing::Level::DEBUG);
        assert!(config.with_source_location);

        let cli =
            Cli::try_parse_from(["henyey", "--trace", "--log-format", "json", "sample-config"])
                .unwrap();
        let config = log_config(&cli);
        assert_eq!(config.level, tracing::Level::TRACE);
        assert_eq!(config.format, LogFormat::Json);
        assert!(!config.ansi_colors);
    }
}
