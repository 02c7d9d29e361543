//! Logging setup using `tracing` and `tracing-subscriber`.
//!
//! Logs always go to stderr so `--json` output on stdout stays parseable.
//!
//! # Log Levels
//!
//! - `warn`: rejected requests, busy store lock
//! - `info`: committed outcomes (task bound, row saved, rows merged)
//! - `debug`: per-request decisions (conflict counts, binding partitions)
//! - `trace`: everything else
//!
//! `RUST_LOG` overrides the configured level when set.

use crate::config::LoggingSection;
use clap::ValueEnum;
use serde::Deserialize;
use std::io::{self, IsTerminal};
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-line format.
    Pretty,
    /// Single-line format.
    #[default]
    Compact,
    /// JSON lines for machine parsing.
    Json,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub format: LogFormat,
    pub with_ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            format: LogFormat::default(),
            with_ansi: false,
        }
    }
}

impl LogConfig {
    /// Combine the config file section with command-line overrides.
    ///
    /// `-v` selects debug and `-vv` trace regardless of the configured level.
    /// Colour is used only when stderr is a terminal.
    pub fn resolve(
        section: &LoggingSection,
        verbosity: u8,
        format: Option<LogFormat>,
    ) -> Result<Self, String> {
        let configured = match &section.level {
            Some(level) => Level::from_str(level)
                .map_err(|_| format!("invalid [logging].level `{level}`"))?,
            None => Level::WARN,
        };
        let level = match verbosity {
            0 => configured,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        };
        Ok(Self {
            level,
            format: format.or(section.format).unwrap_or_default(),
            with_ansi: io::stderr().is_terminal(),
        })
    }
}

/// Install the global subscriber writing to stderr.
pub fn init_logging(config: &LogConfig) {
    init_logging_with_writer(config, io::stderr);
}

pub fn init_logging_with_writer<W>(config: &LogConfig, writer: W)
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    let filter = build_env_filter(config.level);

    match config.format {
        LogFormat::Json => {
            let layer = fmt::layer().json().with_writer(writer).with_target(true);
            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .init();
        }
        LogFormat::Compact => {
            let layer = fmt::layer()
                .compact()
                .with_writer(writer)
                .with_ansi(config.with_ansi)
                .with_target(false)
                .without_time();
            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .init();
        }
        LogFormat::Pretty => {
            let layer = fmt::layer()
                .pretty()
                .with_writer(writer)
                .with_ansi(config.with_ansi)
                .with_target(true);
            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .init();
        }
    }
}

/// Filter from `RUST_LOG`, else `level` for our crates and warn elsewhere.
fn build_env_filter(level: Level) -> EnvFilter {
    let level = level.as_str().to_lowercase();
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,codemap={level},codemap_kernel={level},codemap_store={level},\
             codemap_workflow={level}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_overrides_configured_level() {
        let section = LoggingSection {
            level: Some("info".to_string()),
            format: Some(LogFormat::Json),
        };
        let quiet = LogConfig::resolve(&section, 0, None).expect("resolve");
        assert_eq!(quiet.level, Level::INFO);
        assert_eq!(quiet.format, LogFormat::Json);

        let loud = LogConfig::resolve(&section, 2, Some(LogFormat::Pretty)).expect("resolve");
        assert_eq!(loud.level, Level::TRACE);
        assert_eq!(loud.format, LogFormat::Pretty);
    }

    #[test]
    fn ansi_follows_stderr_terminal() {
        let resolved = LogConfig::resolve(&LoggingSection::default(), 0, None).expect("resolve");
        assert_eq!(resolved.with_ansi, io::stderr().is_terminal());
        assert!(!LogConfig::default().with_ansi);
    }

    #[test]
    fn unknown_level_is_rejected() {
        let section = LoggingSection {
            level: Some("chatty".to_string()),
            format: None,
        };
        assert!(LogConfig::resolve(&section, 0, None).is_err());
    }
}
