//! # iokit
//!
//! Two conveniences for small operational scripts: input forms generated from argument
//! descriptors, and script runs that log their own call tree.
//!
//! ## Crate Structure
//!
//! - **`argument`**: The typed argument descriptor (`Argument`), its values (`ArgValue`)
//!   and the TOML schema format they are loaded from.
//! - **`gui`**: Maps each descriptor to an `egui` control (`gui::widget::Widget`) and lays a
//!   set of them out as a form that can run in an `eframe` window.
//! - **`nested_log`**: The per-run log writer with timestamped, indentation-aware file lines
//!   and an independently switchable console channel.
//! - **`script`**: Script classes built from explicitly registered members. Every member is
//!   wrapped so each call is logged with its arguments, duration and return value, and each
//!   run gets a dated log file plus an optional JSON snapshot.
//! - **`config`**: `ScriptSettings`, loaded with Figment from TOML and `IOKIT_` variables.
//! - **`error`**: The crate error type `IoKitError`.
//! - **`tracing_init`**: Diagnostic `tracing` subscriber setup.

pub mod argument;
pub mod config;
pub mod error;
pub mod gui;
pub mod nested_log;
pub mod script;
pub mod tracing_init;

pub use argument::{ArgKind, ArgValue, Argument, ArgumentSet, SharedArgument};
pub use config::ScriptSettings;
pub use error::{AppResult, IoKitError};
pub use script::{Script, ScriptClass};
