//! Script run configuration using Figment
//!
//! Settings are loaded from:
//! 1. `config/iokit.toml` (base configuration, optional)
//! 2. Environment variables prefixed with `IOKIT_`
//!
//! Every field has a default, so a missing file yields the built-in settings.
//!
//! # Example
//! ```no_run
//! use iokit::config::ScriptSettings;
//!
//! let settings = ScriptSettings::load()?;
//! println!("Logs go to {}", settings.resolve_logs_dir()?.display());
//! # Ok::<(), iokit::error::IoKitError>(())
//! ```

use crate::error::{AppResult, IoKitError};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory name placed between the data directory and the log location.
pub const APP_DIR_NAME: &str = "iokit";

/// Where relative log locations are anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogRootPolicy {
    /// The current user's local data directory.
    #[default]
    User,
    /// The machine-wide shared data directory.
    System,
}

/// When a run writes its JSON snapshot next to the log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SerializePolicy {
    #[default]
    Never,
    /// Only when the constructor body failed.
    OnFailure,
    Always,
}

impl SerializePolicy {
    /// Whether a run with the given result should be snapshotted.
    pub fn applies(self, succeeded: bool) -> bool {
        match self {
            SerializePolicy::Never => false,
            SerializePolicy::OnFailure => !succeeded,
            SerializePolicy::Always => true,
        }
    }
}

impl From<bool> for SerializePolicy {
    fn from(value: bool) -> Self {
        if value {
            SerializePolicy::Always
        } else {
            SerializePolicy::Never
        }
    }
}

/// Output format of the crate's own diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Multi-line, coloured output for development
    Pretty,
    /// One line per event
    #[default]
    Compact,
    /// Newline-delimited JSON for log aggregation
    Json,
}

/// Settings shared by every run of a script class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptSettings {
    /// Log directory. Absolute paths are used as-is.
    #[serde(default = "default_log_location")]
    pub log_location: PathBuf,
    /// Anchor for a relative `log_location`
    #[serde(default)]
    pub log_root: LogRootPolicy,
    /// Echo call start/finish lines to the console
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub serialize: SerializePolicy,
    /// Repeated once per nesting level in front of file lines
    #[serde(default = "default_indentation_token")]
    pub indentation_token: String,
    /// Default for the console channel
    #[serde(default = "default_true")]
    pub to_stream: bool,
    /// Default for the file channel
    #[serde(default = "default_true")]
    pub to_file: bool,
    /// Diagnostic log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Diagnostic output format
    #[serde(default)]
    pub log_format: LogFormat,
    /// Emit span open/close events in diagnostics
    #[serde(default)]
    pub log_spans: bool,
}

fn default_log_location() -> PathBuf {
    PathBuf::from("logs")
}

fn default_indentation_token() -> String {
    "    ".to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ScriptSettings {
    fn default() -> Self {
        Self {
            log_location: default_log_location(),
            log_root: LogRootPolicy::default(),
            verbose: false,
            serialize: SerializePolicy::default(),
            indentation_token: default_indentation_token(),
            to_stream: true,
            to_file: true,
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            log_spans: false,
        }
    }
}

impl ScriptSettings {
    /// Load settings from `config/iokit.toml` and environment variables
    ///
    /// Environment variables override the file with prefix `IOKIT_`.
    /// Example: `IOKIT_VERBOSE=true`, `IOKIT_LOG_LOCATION=/var/log/scripts`
    pub fn load() -> AppResult<Self> {
        Self::load_from("config/iokit.toml")
    }

    /// Load settings from a specific file path
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let settings: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("IOKIT_"))
            .extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate settings after loading
    pub fn validate(&self) -> AppResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(IoKitError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            )));
        }

        if self.indentation_token.is_empty() {
            return Err(IoKitError::Configuration(
                "indentation_token must not be empty".to_string(),
            ));
        }

        if self.log_location.as_os_str().is_empty() {
            return Err(IoKitError::Configuration(
                "log_location must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// The directory holding dated run logs.
    pub fn resolve_logs_dir(&self) -> AppResult<PathBuf> {
        if self.log_location.is_absolute() {
            return Ok(self.log_location.clone());
        }

        let base = match self.log_root {
            LogRootPolicy::User => dirs::data_local_dir(),
            LogRootPolicy::System => system_data_dir(),
        }
        .ok_or_else(|| IoKitError::NoDataDirectory(format!("{:?}", self.log_root)))?;

        Ok(base.join(APP_DIR_NAME).join(&self.log_location))
    }
}

/// Machine-wide data directory for the current platform.
#[cfg(windows)]
fn system_data_dir() -> Option<PathBuf> {
    std::env::var_os("ProgramData").map(PathBuf::from)
}

#[cfg(target_os = "macos")]
fn system_data_dir() -> Option<PathBuf> {
    Some(PathBuf::from("/Library/Application Support"))
}

#[cfg(all(unix, not(target_os = "macos")))]
fn system_data_dir() -> Option<PathBuf> {
    Some(PathBuf::from("/var/lib"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let settings = ScriptSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.log_location, PathBuf::from("logs"));
        assert_eq!(settings.indentation_token, "    ");
        assert_eq!(settings.serialize, SerializePolicy::Never);
    }

    #[test]
    fn test_config_validation() {
        let mut settings = ScriptSettings::default();
        settings.log_level = "loud".to_string();
        assert!(settings.validate().is_err());

        let mut settings = ScriptSettings::default();
        settings.indentation_token = String::new();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn absolute_log_location_is_used_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let settings = ScriptSettings {
            log_location: dir.path().to_path_buf(),
            ..Default::default()
        };
        assert_eq!(settings.resolve_logs_dir().unwrap(), dir.path());
    }

    #[test]
    fn relative_log_location_is_anchored_under_app_dir() {
        let settings = ScriptSettings {
            log_location: PathBuf::from("runs"),
            log_root: LogRootPolicy::System,
            ..Default::default()
        };
        let resolved = settings.resolve_logs_dir().unwrap();
        assert!(resolved.ends_with(Path::new(APP_DIR_NAME).join("runs")));
    }

    #[test]
    fn serialize_policy_applies() {
        assert!(!SerializePolicy::Never.applies(false));
        assert!(SerializePolicy::OnFailure.applies(false));
        assert!(!SerializePolicy::OnFailure.applies(true));
        assert!(SerializePolicy::Always.applies(true));
    }

    #[test]
    #[serial]
    fn test_load_from_file_and_env() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "log_location = \"custom\"\nverbose = true\nserialize = \"on_failure\""
        )
        .unwrap();

        std::env::set_var("IOKIT_INDENTATION_TOKEN", "ab");
        let settings = ScriptSettings::load_from(file.path());
        std::env::remove_var("IOKIT_INDENTATION_TOKEN");

        let settings = settings.unwrap();
        assert_eq!(settings.log_location, PathBuf::from("custom"));
        assert!(settings.verbose);
        assert_eq!(settings.serialize, SerializePolicy::OnFailure);
        assert_eq!(settings.indentation_token, "ab");
    }

    #[test]
    #[serial]
    fn log_format_comes_from_env() {
        std::env::set_var("IOKIT_LOG_FORMAT", "json");
        std::env::set_var("IOKIT_LOG_SPANS", "true");
        let settings = ScriptSettings::load_from("does/not/exist.toml");
        std::env::remove_var("IOKIT_LOG_FORMAT");
        std::env::remove_var("IOKIT_LOG_SPANS");

        let settings = settings.unwrap();
        assert_eq!(settings.log_format, LogFormat::Json);
        assert!(settings.log_spans);
    }

    #[test]
    #[serial]
    fn missing_file_yields_defaults() {
        let settings = ScriptSettings::load_from("does/not/exist.toml").unwrap();
        assert_eq!(settings, ScriptSettings::default());
    }

    #[test]
    #[serial]
    fn shipped_config_matches_defaults() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/iokit.toml");
        let settings = ScriptSettings::load_from(path).unwrap();
        assert_eq!(settings, ScriptSettings::default());
    }
}
