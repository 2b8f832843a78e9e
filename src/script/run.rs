//! The live context of one script run.
//!
//! A [`Run`] is threaded through every wrapped member as an explicit parameter. It
//! owns the run's [`NestedLog`], the keyword arguments the run was started with, and
//! a handle to the class registry used to dispatch nested calls.

use super::function::{ClassInfo, Member};
use super::profile::CallArgs;
use super::{Registry, Script};
use crate::config::ScriptSettings;
use crate::error::IoKitError;
use crate::nested_log::NestedLog;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use std::fmt;
use std::rc::Rc;

/// Which entry point started a run. Passed to the constructor as `run_mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Called from code.
    Programmatic,
    /// Arguments came from the form.
    Gui,
    /// Started from the command line.
    Commandline,
}

impl RunMode {
    /// The value passed as `run_mode`.
    pub fn as_str(self) -> &'static str {
        match self {
            RunMode::Programmatic => "programmatic",
            RunMode::Gui => "gui",
            RunMode::Commandline => "commandline",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State shared by every member call of one run.
pub struct Run<S> {
    log: NestedLog,
    registry: Rc<Registry<S>>,
    arguments: Map<String, Json>,
    mode: RunMode,
    started: NaiveDateTime,
}

impl<S: Script> Run<S> {
    pub(crate) fn new(
        log: NestedLog,
        registry: Rc<Registry<S>>,
        arguments: Map<String, Json>,
        mode: RunMode,
        started: NaiveDateTime,
    ) -> Self {
        Self {
            log,
            registry,
            arguments,
            mode,
            started,
        }
    }

    /// The run log.
    pub fn log(&self) -> &NestedLog {
        &self.log
    }

    /// The run log, for writing entries directly.
    pub fn log_mut(&mut self) -> &mut NestedLog {
        &mut self.log
    }

    /// The keyword arguments the run was started with, including `run_mode`.
    pub fn arguments(&self) -> &Map<String, Json> {
        &self.arguments
    }

    /// One keyword argument by name.
    pub fn argument(&self, name: &str) -> Option<&Json> {
        self.arguments.get(name)
    }

    /// Which entry point started this run.
    pub fn mode(&self) -> RunMode {
        self.mode
    }

    /// Local time the run started; also names the log file.
    pub fn started(&self) -> NaiveDateTime {
        self.started
    }

    /// Settings of the script class.
    pub fn settings(&self) -> &ScriptSettings {
        &self.registry.settings
    }

    /// Names of the script class.
    pub fn class_info(&self) -> &ClassInfo {
        &self.registry.info
    }

    /// Print through the run log: console and file, per the log's channel flags.
    pub fn println(&mut self, text: impl AsRef<str>) -> anyhow::Result<()> {
        self.log.write(&format!("{}\n", text.as_ref()), None, None, 0)?;
        Ok(())
    }

    /// Call an instance member on `script`.
    ///
    /// Nested class members are addressed as `Inner.member`.
    pub fn call(&mut self, script: &mut S, name: &str, args: CallArgs) -> anyhow::Result<Json> {
        let registry = Rc::clone(&self.registry);
        registry.entry(name)?.invoke(script, self, &args)
    }

    /// Call a member that takes no script object.
    pub fn call_static(&mut self, name: &str, args: CallArgs) -> anyhow::Result<Json> {
        let registry = Rc::clone(&self.registry);
        let entry = registry.entry(name)?;
        match &entry.member {
            Member::Static(f) => f(self, &args),
            Member::Class(f) => f(&entry.owner, self, &args),
            Member::Function(_) => Err(IoKitError::MissingReceiver(entry.record.name.clone()).into()),
            Member::Other(_) => Err(entry.record.unclassifiable().into()),
        }
    }
}

impl<S> fmt::Debug for Run<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Run")
            .field("log", &self.log)
            .field("mode", &self.mode)
            .field("started", &self.started)
            .field("arguments", &self.arguments)
            .finish()
    }
}
