//! Logging setup for the exporter binaries.
//!
//! Library code only emits `tracing` events; a binary calls [`init`] once at
//! startup to install the global subscriber. `RUST_LOG`, when set, takes
//! precedence over the configured level.
//!
//! # Example
//!
//! ```no_run
//! use henyey_export::logging::{self, LogConfig};
//!
//! logging::init(&LogConfig::default().with_level("debug")).expect("logging");
//! ```

use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable text, optionally colored.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level to output.
    pub level: Level,
    /// Output format.
    pub format: LogFormat,
    /// Enable ANSI color codes (text format only).
    pub ansi_colors: bool,
    /// Include file/line source locations.
    pub with_source_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Text,
            ansi_colors: true,
            with_source_location: false,
        }
    }
}

impl LogConfig {
    /// Debug level with source locations.
    pub fn verbose() -> Self {
        Self {
            level: Level::DEBUG,
            with_source_location: true,
            ..Self::default()
        }
    }

    /// JSON output for log aggregation.
    pub fn json() -> Self {
        Self {
            format: LogFormat::Json,
            ansi_colors: false,
            ..Self::default()
        }
    }

    /// Set the log level from a string; unknown names fall back to INFO.
    pub fn with_level(mut self, level: &str) -> Self {
        self.level = match level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" | "warning" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };
        self
    }

    /// Filter used when `RUST_LOG` is unset. HTTP client internals are
    /// kept at WARN.
    pub fn filter(&self) -> anyhow::Result<EnvFilter> {
        Ok(EnvFilter::new(self.level.as_str().to_lowercase())
            .add_directive("hyper=warn".parse()?)
            .add_directive("reqwest=warn".parse()?)
            .add_directive("h2=warn".parse()?))
    }
}

/// Install the global subscriber.
///
/// Fails if a global subscriber is already installed.
pub fn init(config: &LogConfig) -> anyhow::Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => config.filter()?,
    };

    match config.format {
        LogFormat::Text => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_ansi(config.ansi_colors)
                .with_target(true)
                .with_file(config.with_source_location)
                .with_line_number(config.with_source_location);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .try_init()?;
        }
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_file(config.with_source_location)
                .with_line_number(config.with_source_location);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .try_init()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_level() {
        assert_eq!(LogConfig::default().with_level("TRACE").level, Level::TRACE);
        assert_eq!(LogConfig::default().with_level("warning").level, Level::WARN);
        assert_eq!(LogConfig::default().with_level("bogus").level, Level::INFO);
    }

    #[test]
    fn test_presets() {
        let verbose = LogConfig::verbose();
        assert_eq!(verbose.level, Level::DEBUG);
        assert!(verbose.with_source_location);

        let json = LogConfig::json();
        assert_eq!(json.format, LogFormat::Json);
        assert!(!json.ansi_colors);
    }

    #[test]
    fn test_filter_builds() {
        let filter = LogConfig::default().with_level("debug").filter().unwrap();
        let rendered = filter.to_string();
        assert!(rendered.contains("debug"));
        assert!(rendered.contains("reqwest=warn"));
    }
}
