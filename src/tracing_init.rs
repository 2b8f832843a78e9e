//! Tracing Infrastructure
//!
//! Diagnostic logging for the crate itself (log files opened, snapshots written,
//! forms committed). This is separate from the per-run nested log file, which is a
//! plain-text artifact owned by each run.
//!
//! Everything comes from [`ScriptSettings`]: `log_level` is the default directive
//! (`RUST_LOG` still wins when set), `log_format` picks the formatter and
//! `log_spans` adds span open/close events. Output goes to stderr so that commands
//! printing results on stdout stay pipeable.
//!
//! # Example
//! ```no_run
//! use iokit::{config::ScriptSettings, tracing_init};
//! use tracing::info;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = ScriptSettings::load()?;
//! tracing_init::init_from_settings(&settings)?;
//! info!("Application started");
//! # Ok(())
//! # }
//! ```

use crate::config::{LogFormat, ScriptSettings};
use crate::error::{AppResult, IoKitError};
use std::io::IsTerminal;
use tracing::Level;
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// Subscriber options derived from settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// Default level when `RUST_LOG` is not set
    pub level: Level,
    /// Formatter for each event
    pub format: LogFormat,
    /// Report span NEW/CLOSE events
    pub span_events: bool,
    /// Colour output; only when stderr is a terminal
    pub ansi: bool,
}

impl TracingConfig {
    /// Read the diagnostic options out of script settings.
    pub fn from_settings(settings: &ScriptSettings) -> AppResult<Self> {
        let level = settings.log_level.parse::<Level>().map_err(|_| {
            IoKitError::Configuration(format!("Invalid log_level '{}'", settings.log_level))
        })?;

        Ok(Self {
            level,
            format: settings.log_format,
            span_events: settings.log_spans,
            ansi: std::io::stderr().is_terminal(),
        })
    }

    fn span_events(&self) -> FmtSpan {
        if self.span_events {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }

    /// The formatting layer for the configured format, writing to stderr.
    fn layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let base = fmt::layer()
            .with_span_events(self.span_events())
            .with_writer(std::io::stderr);

        match self.format {
            LogFormat::Pretty => base.pretty().with_ansi(self.ansi).boxed(),
            LogFormat::Compact => base.compact().with_ansi(self.ansi).with_target(false).boxed(),
            LogFormat::Json => base.json().with_ansi(false).with_current_span(self.span_events).boxed(),
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::builder()
            .with_default_directive(LevelFilter::from_level(self.level).into())
            .from_env_lossy()
    }
}

/// Install the global subscriber described by `settings`.
pub fn init_from_settings(settings: &ScriptSettings) -> AppResult<()> {
    init(TracingConfig::from_settings(settings)?)
}

/// Install the global subscriber.
///
/// A subscriber that is already installed is kept, so calling this from tests and
/// several entry points is harmless.
pub fn init(config: TracingConfig) -> AppResult<()> {
    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }

    let filter = config.filter();
    tracing_subscriber::registry()
        .with(config.layer().with_filter(filter))
        .try_init()
        .or_else(|e| {
            if tracing::dispatcher::has_been_set() {
                Ok(())
            } else {
                Err(IoKitError::Configuration(format!(
                    "Failed to initialize tracing: {e}"
                )))
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(level: &str, format: LogFormat, spans: bool) -> ScriptSettings {
        ScriptSettings {
            log_level: level.to_string(),
            log_format: format,
            log_spans: spans,
            ..Default::default()
        }
    }

    #[test]
    fn config_follows_settings() {
        let config = TracingConfig::from_settings(&settings("Debug", LogFormat::Json, true)).unwrap();
        assert_eq!(config.level, Level::DEBUG);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.span_events(), FmtSpan::NEW | FmtSpan::CLOSE);

        let config = TracingConfig::from_settings(&ScriptSettings::default()).unwrap();
        assert_eq!(config.level, Level::INFO);
        assert_eq!(config.format, LogFormat::Compact);
        assert_eq!(config.span_events(), FmtSpan::NONE);
    }

    #[test]
    fn bad_level_is_a_configuration_error() {
        let err = TracingConfig::from_settings(&settings("chatty", LogFormat::Compact, false))
            .unwrap_err();
        assert!(matches!(err, IoKitError::Configuration(ref msg) if msg.contains("chatty")));
    }

    #[test]
    fn every_format_builds_a_layer() {
        for format in [LogFormat::Pretty, LogFormat::Compact, LogFormat::Json] {
            let config = TracingConfig::from_settings(&settings("warn", format, true)).unwrap();
            let _layer = config.layer();
        }
    }

    #[test]
    fn init_is_idempotent() {
        let config = TracingConfig::from_settings(&ScriptSettings::default()).unwrap();
        assert!(init(config.clone()).is_ok());
        assert!(init(config).is_ok());
    }
}
