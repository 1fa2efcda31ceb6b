//! Structured logging setup.
//!
//! The engine only emits `tracing` events; installing a subscriber is the
//! embedding application's call. [`init_logging`] is the stock setup: an
//! `EnvFilter` plus a JSON (production) or pretty (development) formatter.
//!
//! | variable                         | default | meaning                          |
//! |----------------------------------|---------|----------------------------------|
//! | `SARATOGA_LOG_LEVEL`             | `info`  | trace/debug/info/warn/error      |
//! | `SARATOGA_LOG_FORMAT`            | `json`  | `json` or `pretty`               |
//! | `SARATOGA_LOG_TARGET_FILTER`     | unset   | extra directives, comma-separated|
//! | `SARATOGA_LOG_INCLUDE_LOCATION`  | `false` | add file and line to each event  |
//!
//! `RUST_LOG`, when set, replaces the level.

use anyhow::{Context, Result};
use std::env;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// JSON for production, pretty-print for development.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub log_level: String,
    pub format: LogFormat,
    /// Extra filter directives, comma-separated (`saratoga::router=debug`).
    pub target_filter: Option<String>,
    pub include_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Json,
            target_filter: None,
            include_location: false,
        }
    }
}

impl LogConfig {
    /// Read the `SARATOGA_LOG_*` variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            log_level: lookup("SARATOGA_LOG_LEVEL").unwrap_or(defaults.log_level),
            format: lookup("SARATOGA_LOG_FORMAT")
                .map_or(defaults.format, |f| LogFormat::parse(&f)),
            target_filter: lookup("SARATOGA_LOG_TARGET_FILTER").filter(|f| !f.trim().is_empty()),
            include_location: lookup("SARATOGA_LOG_INCLUDE_LOCATION")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.include_location),
        }
    }

    fn level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level().as_str()));
        if let Some(targets) = &self.target_filter {
            for directive in targets.split(',').map(str::trim).filter(|d| !d.is_empty()) {
                match directive.parse() {
                    Ok(d) => filter = filter.add_directive(d),
                    Err(_) => eprintln!("Warning: Invalid log filter directive: {directive}"),
                }
            }
        }
        filter
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// A global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn parses_variables() {
        let vars: HashMap<&str, &str> = [
            ("SARATOGA_LOG_LEVEL", "debug"),
            ("SARATOGA_LOG_FORMAT", "PRETTY"),
            ("SARATOGA_LOG_TARGET_FILTER", "saratoga::router=trace"),
            ("SARATOGA_LOG_INCLUDE_LOCATION", "true"),
        ]
        .into_iter()
        .collect();
        let c = LogConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(c.level(), Level::DEBUG);
        assert_eq!(c.format, LogFormat::Pretty);
        assert_eq!(c.target_filter.as_deref(), Some("saratoga::router=trace"));
        assert!(c.include_location);
    }

    #[test]
    fn defaults_when_unset() {
        let c = LogConfig::from_lookup(|_| None);
        assert_eq!(c.level(), Level::INFO);
        assert_eq!(c.format, LogFormat::Json);
        assert!(c.target_filter.is_none());
        assert!(!c.include_location);
    }
}
