//! Tracing subscriber setup.

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::config::LoggerSettings;

/// Log level used when no filter overrides it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_filter(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Output format of log lines.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Compact,
    Pretty,
    Json,
}

/// Filter applied to events: `RUST_LOG`, then the configured override, then
/// the configured level for this crate.
fn env_filter(settings: &LoggerSettings) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    settings
        .override_filter
        .as_deref()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_CRATE_NAME"),
                settings.level.as_filter()
            ))
        })
}

/// Installs the global subscriber described by `settings`.
///
/// Returns `false` when logging is disabled or a global subscriber was
/// already installed, in which case the existing one is kept.
pub fn init(settings: &LoggerSettings) -> bool {
    if !settings.enable {
        return false;
    }
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(settings))
        .with_ansi(settings.ansi)
        .with_target(true);
    let installed = match settings.format {
        Format::Compact => builder.compact().try_init(),
        Format::Pretty => builder.pretty().try_init(),
        Format::Json => builder.json().try_init(),
    };
    match installed {
        Ok(()) => {
            tracing::debug!(format = ?settings.format, level = ?settings.level, "logger_initialized");
            true
        }
        Err(err) => {
            tracing::debug!(err.msg = %err, "logger_already_initialized");
            false
        }
    }
}
