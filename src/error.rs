//! Custom error types for the crate.
//!
//! This module defines `IoKitError`, the error type shared by the argument model, the
//! widget mapper, the nested logger and the script lifecycle. Built on `thiserror`, it
//! keeps fast local failures (an argument kind no widget can edit, a member that cannot
//! be classified) apart from pass-through failures of the file system, configuration and
//! serialization layers.
//!
//! Errors raised *inside* script bodies are not `IoKitError`s. Those bodies return
//! `anyhow::Result`, and the lifecycle hands their error back to the caller unchanged.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type AppResult<T> = std::result::Result<T, IoKitError>;

/// Errors raised by the crate outside script bodies.
#[derive(Error, Debug)]
pub enum IoKitError {
    /// No widget can edit this argument kind.
    #[error("Don't know how to build a widget for {kind} argument '{name}'")]
    UnsupportedArgument {
        /// Argument name
        name: String,
        /// Declared kind, as written in a schema
        kind: String,
    },

    /// A class member is not a function of any known calling convention.
    #[error("Don't know the call kind of {owner}.{member}, refusing to wrap it")]
    UnclassifiableMember {
        /// Qualified class name
        owner: String,
        /// Member name
        member: String,
    },

    /// A value does not fit its argument kind.
    #[error("Invalid value for argument '{name}': {reason}")]
    InvalidValue {
        /// Argument name, empty for list items
        name: String,
        /// What did not fit
        reason: String,
    },

    /// Dispatch to a member that was never registered.
    #[error("No method named '{0}'")]
    UnknownMethod(String),

    /// An instance or class member called without its receiver.
    #[error("Method '{0}' needs a receiver but was called without one")]
    MissingReceiver(String),

    /// The platform has no directory for the configured log root.
    #[error("No data directory available for log root policy '{0}'")]
    NoDataDirectory(String),

    /// A log path with nothing to create above it.
    #[error("Log file path has no parent directory: {0}")]
    InvalidLogPath(PathBuf),

    /// The native window failed to start or run.
    #[error("GUI error: {0}")]
    Gui(String),

    /// Proceed was refused; each entry names an argument and what is wrong with it.
    #[error("Cannot proceed until these are resolved: {}", problems.join("; "))]
    IncompleteForm {
        /// One entry per blocking problem
        problems: Vec<String>,
    },

    /// Settings could not be loaded or merged.
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// Settings loaded but hold a value the crate cannot use.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// File system failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Argument schema is not valid TOML.
    #[error("Schema parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl From<figment::Error> for IoKitError {
    fn from(value: figment::Error) -> Self {
        IoKitError::Config(Box::new(value))
    }
}

impl IoKitError {
    pub(crate) fn invalid_value(name: impl Into<String>, reason: impl Into<String>) -> Self {
        IoKitError::InvalidValue {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
