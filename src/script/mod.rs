//! Self-logging script runs.
//!
//! A script is a plain struct implementing [`Script`] plus a class definition that
//! registers its constructor and members explicitly:
//!
//! ```no_run
//! use iokit::script::{CallArgs, Member, Script, ScriptClass};
//! use serde::Serialize;
//! use serde_json::{json, Map};
//!
//! #[derive(Debug, Default, Serialize)]
//! struct Pipeline {
//!     total: i64,
//! }
//!
//! impl Script for Pipeline {}
//!
//! let class = ScriptClass::<Pipeline>::define("Pipeline")
//!     .defined_in(file!())
//!     .constructor(|script, run, _args| {
//!         let doubled = run.call(script, "double", CallArgs::new().arg(21))?;
//!         script.total = serde_json::from_value(doubled)?;
//!         Ok(())
//!     })
//!     .member(
//!         "double",
//!         Member::function(|_script, _run, args| Ok(json!(args.get::<i64>(0)? * 2))),
//!     )
//!     .build()?;
//!
//! let outcome = class.from_code(Map::new())?;
//! assert_eq!(outcome.script.total, 42);
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! Building the class wraps every member with [`profile::profile`]. Instantiating it
//! opens a dated log file, runs the constructor body (each nested call logged one level
//! deeper), records the failure if there is one, writes the final object state and an
//! optional JSON snapshot, and only then hands the result or the original error back.

pub mod function;
pub mod profile;
pub mod run;
pub mod snapshot;

pub use function::{CallKind, ClassInfo, FunctionRecord, Member, Receiver};
pub use profile::CallArgs;
pub use run::{Run, RunMode};
pub use snapshot::RunSnapshot;

use crate::argument::SharedArgument;
use crate::config::{ScriptSettings, SerializePolicy};
use crate::error::{AppResult, IoKitError};
use crate::nested_log::{LogOptions, NestedLog};
use chrono::{Local, NaiveDateTime, Timelike};
use serde::Serialize;
use serde_json::{Map, Value as Json};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{info, warn};

/// The name of the constructor member.
pub const CONSTRUCTOR: &str = "__init__";

/// State and behaviour of a script object.
///
/// Runs start from `Default` and the constructor body fills the object in. `Debug` is
/// written to the log as the final state; `Serialize` feeds the JSON snapshot.
pub trait Script: Default + Serialize + fmt::Debug + 'static {
    /// A short description written after each instance call, when `Some`.
    fn describe(&self) -> Option<String> {
        None
    }
}

/// Body of the constructor, run once per instantiation.
pub type ConstructorFn<S> = Rc<dyn Fn(&mut S, &mut Run<S>, &CallArgs) -> anyhow::Result<()>>;
type ConsoleFactory = Rc<dyn Fn() -> Box<dyn Write>>;

// =============================================================================
// Class definition
// =============================================================================

/// Builder for a script class or a class nested inside one.
pub struct ClassDef<S> {
    name: String,
    doc: Option<String>,
    source_file: Option<PathBuf>,
    settings: ScriptSettings,
    constructor: Option<ConstructorFn<S>>,
    members: Vec<(String, Member<S>)>,
    member_docs: HashMap<String, String>,
    nested: Vec<ClassDef<S>>,
    console: Option<ConsoleFactory>,
}

impl<S: Script> ClassDef<S> {
    /// An empty class named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            doc: None,
            source_file: None,
            settings: ScriptSettings::default(),
            constructor: None,
            members: Vec::new(),
            member_docs: HashMap::new(),
            nested: Vec::new(),
            console: None,
        }
    }

    /// Class doc string, shown as the form title when collecting arguments.
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// The source file defining the script. Its stem names the run's log directory.
    pub fn defined_in(mut self, file: impl AsRef<Path>) -> Self {
        self.source_file = Some(file.as_ref().to_path_buf());
        self
    }

    /// Replace all settings. Call before the single-setting helpers below.
    pub fn settings(mut self, settings: ScriptSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Root directory for run logs.
    pub fn log_location(mut self, location: impl Into<PathBuf>) -> Self {
        self.settings.log_location = location.into();
        self
    }

    /// Echo start and finish lines to the console.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.settings.verbose = verbose;
        self
    }

    /// When to write the JSON snapshot next to the log.
    pub fn serialize(mut self, policy: impl Into<SerializePolicy>) -> Self {
        self.settings.serialize = policy.into();
        self
    }

    /// Console sink for runs of this class. Each run writes to a clone.
    pub fn console<W: Write + Clone + 'static>(mut self, stream: W) -> Self {
        self.console = Some(Rc::new(move || Box::new(stream.clone()) as Box<dyn Write>));
        self
    }

    /// The body run by every entry point, logged as `__init__`.
    pub fn constructor<F>(mut self, body: F) -> Self
    where
        F: Fn(&mut S, &mut Run<S>, &CallArgs) -> anyhow::Result<()> + 'static,
    {
        self.constructor = Some(Rc::new(body));
        self
    }

    /// Register a member under `name`.
    pub fn member(mut self, name: impl Into<String>, member: Member<S>) -> Self {
        self.members.push((name.into(), member));
        self
    }

    /// Doc string for a member registered on this class.
    pub fn member_doc(mut self, name: impl Into<String>, doc: impl Into<String>) -> Self {
        self.member_docs.insert(name.into(), doc.into());
        self
    }

    /// Add a nested class. Its members are addressed as `Nested.member`.
    pub fn nested(mut self, class: ClassDef<S>) -> Self {
        self.nested.push(class);
        self
    }

    /// Classify and wrap every member, recursing into nested classes.
    ///
    /// Dunder members other than the constructor are kept unwrapped. Any other member
    /// that is not a function fails the build with
    /// [`IoKitError::UnclassifiableMember`].
    pub fn build(self) -> AppResult<ScriptClass<S>> {
        let run_name = self
            .source_file
            .as_deref()
            .and_then(Path::file_stem)
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.name.clone());

        let info = ClassInfo {
            name: self.name.clone(),
            qualified_name: self.name.clone(),
            run_name,
            doc: self.doc.clone(),
        };

        let settings = self.settings.clone();
        let console = self.console.clone();

        let mut members = HashMap::new();
        let constructor = register_class(self, &info, "", &mut members)?;

        tracing::debug!(
            class = %info.name,
            members = members.len(),
            "Script class built"
        );

        Ok(ScriptClass {
            registry: Rc::new(Registry {
                info,
                settings,
                members,
                constructor,
                console,
            }),
        })
    }
}

fn is_dunder(name: &str) -> bool {
    name.len() > 4 && name.starts_with("__") && name.ends_with("__")
}

fn constructor_member<S: Script>(body: ConstructorFn<S>) -> Member<S> {
    Member::function(move |script, run, args| {
        body(script, run, args)?;
        Ok(Json::Null)
    })
}

fn decorate<S: Script>(record: &FunctionRecord, member: Member<S>) -> AppResult<Member<S>> {
    let body = member
        .into_universal(&record.name)
        .ok_or_else(|| record.unclassifiable())?;
    let profiled = record.clone();
    record.wrap(function::universal(move |receiver, run, args| {
        profile::profile(&profiled, receiver, run, args, &body)
    }))
}

/// Register `class` under `prefix` and return its wrapped constructor.
fn register_class<S: Script>(
    class: ClassDef<S>,
    info: &ClassInfo,
    prefix: &str,
    members: &mut HashMap<String, Entry<S>>,
) -> AppResult<Option<Entry<S>>> {
    let ClassDef {
        constructor,
        members: own_members,
        mut member_docs,
        nested,
        ..
    } = class;

    let constructor = match constructor {
        Some(body) => {
            let member = constructor_member(body);
            let record = FunctionRecord::classify(&info.qualified_name, CONSTRUCTOR, &member)
                .with_doc(member_docs.remove(CONSTRUCTOR));
            let member = decorate(&record, member)?;
            Some(Entry {
                record,
                member,
                owner: info.clone(),
            })
        }
        None => None,
    };

    for (name, member) in own_members {
        let record = FunctionRecord::classify(&info.qualified_name, &name, &member)
            .with_doc(member_docs.remove(&name));

        let member = if is_dunder(&name) {
            if record.kind == CallKind::Unknown {
                continue;
            }
            member
        } else {
            decorate(&record, member)?
        };

        members.insert(
            format!("{prefix}{name}"),
            Entry {
                record,
                member,
                owner: info.clone(),
            },
        );
    }

    for inner in nested {
        let inner_info = ClassInfo {
            name: inner.name.clone(),
            qualified_name: format!("{}.{}", info.qualified_name, inner.name),
            run_name: info.run_name.clone(),
            doc: inner.doc.clone(),
        };
        let inner_prefix = format!("{prefix}{}.", inner.name);
        if let Some(entry) = register_class(inner, &inner_info, &inner_prefix, members)? {
            members.insert(format!("{inner_prefix}{CONSTRUCTOR}"), entry);
        }
    }

    Ok(constructor)
}

// =============================================================================
// Built class
// =============================================================================

pub(crate) struct Entry<S> {
    pub(crate) record: FunctionRecord,
    pub(crate) member: Member<S>,
    pub(crate) owner: ClassInfo,
}

impl<S: Script> Entry<S> {
    pub(crate) fn invoke(
        &self,
        script: &mut S,
        run: &mut Run<S>,
        args: &CallArgs,
    ) -> anyhow::Result<Json> {
        match &self.member {
            Member::Function(f) => f(script, run, args),
            Member::Static(f) => f(run, args),
            Member::Class(f) => f(&self.owner, run, args),
            Member::Other(_) => Err(self.record.unclassifiable().into()),
        }
    }
}

pub(crate) struct Registry<S> {
    pub(crate) info: ClassInfo,
    pub(crate) settings: ScriptSettings,
    pub(crate) members: HashMap<String, Entry<S>>,
    pub(crate) constructor: Option<Entry<S>>,
    pub(crate) console: Option<ConsoleFactory>,
}

impl<S> Registry<S> {
    pub(crate) fn entry(&self, name: &str) -> AppResult<&Entry<S>> {
        self.members
            .get(name)
            .ok_or_else(|| IoKitError::UnknownMethod(format!("{}.{}", self.info.name, name)))
    }
}

/// What a successful run hands back.
#[derive(Debug)]
pub struct ScriptOutcome<S> {
    /// The constructed script object.
    pub script: S,
    /// The run log.
    pub log_path: PathBuf,
    /// Where the snapshot went, if one was written.
    pub snapshot_path: Option<PathBuf>,
    /// Keyword arguments the run was started with, including `run_mode`.
    pub arguments: Map<String, Json>,
}

/// A built script class, ready to be instantiated.
pub struct ScriptClass<S> {
    registry: Rc<Registry<S>>,
}

enum BodyOutcome {
    Succeeded,
    Failed(anyhow::Error),
    Panicked(Box<dyn Any + Send>),
}

impl<S: Script> ScriptClass<S> {
    /// Start defining a script class.
    pub fn define(name: impl Into<String>) -> ClassDef<S> {
        ClassDef::new(name)
    }

    /// Names of the top-level class.
    pub fn info(&self) -> &ClassInfo {
        &self.registry.info
    }

    /// Settings every run of this class uses.
    pub fn settings(&self) -> &ScriptSettings {
        &self.registry.settings
    }

    /// Record of a member, addressed like [`Run::call`] addresses it.
    pub fn record(&self, name: &str) -> Option<&FunctionRecord> {
        if name == CONSTRUCTOR {
            return self.registry.constructor.as_ref().map(|entry| &entry.record);
        }
        self.registry.members.get(name).map(|entry| &entry.record)
    }

    /// Records of the constructor and every member.
    pub fn records(&self) -> impl Iterator<Item = &FunctionRecord> {
        self.registry
            .constructor
            .iter()
            .chain(self.registry.members.values())
            .map(|entry| &entry.record)
    }

    /// Run with `run_mode = "programmatic"`.
    #[allow(clippy::wrong_self_convention)]
    pub fn from_code(&self, kwargs: Map<String, Json>) -> anyhow::Result<ScriptOutcome<S>> {
        self.instantiate(RunMode::Programmatic, kwargs)
    }

    /// Run with `run_mode = "gui"`; the arguments were already collected.
    #[allow(clippy::wrong_self_convention)]
    pub fn from_gui(&self, kwargs: Map<String, Json>) -> anyhow::Result<ScriptOutcome<S>> {
        self.instantiate(RunMode::Gui, kwargs)
    }

    /// Run with `run_mode = "commandline"`.
    #[allow(clippy::wrong_self_convention)]
    pub fn from_commandline(&self, kwargs: Map<String, Json>) -> anyhow::Result<ScriptOutcome<S>> {
        self.instantiate(RunMode::Commandline, kwargs)
    }

    /// Collect the keyword arguments in a native form, then run in GUI mode.
    ///
    /// Returns `Ok(None)` when the form was cancelled.
    #[allow(clippy::wrong_self_convention)]
    pub fn from_form(
        &self,
        title: &str,
        arguments: &[SharedArgument],
    ) -> anyhow::Result<Option<ScriptOutcome<S>>> {
        match crate::gui::collect_arguments(title, arguments)? {
            Some(kwargs) => self.from_gui(kwargs).map(Some),
            None => Ok(None),
        }
    }

    /// Run the constructor body inside a logged run.
    ///
    /// The error or panic of the body reaches the caller unchanged, after the log
    /// trailer and the snapshot (when the serialize policy asks for one) are written.
    pub fn instantiate(
        &self,
        mode: RunMode,
        mut kwargs: Map<String, Json>,
    ) -> anyhow::Result<ScriptOutcome<S>> {
        let registry = &self.registry;
        kwargs.insert("run_mode".to_string(), Json::from(mode.as_str()));

        let started = Local::now().naive_local();
        let logs_dir = registry.settings.resolve_logs_dir()?;
        let log_path = run_log_path(&logs_dir, &registry.info.run_name, started);

        let mut log = NestedLog::open(&log_path, LogOptions::from(&registry.settings))?;
        if let Some(console) = &registry.console {
            log = log.with_stream(console());
        }
        log.greeting()?;
        info!(
            class = %registry.info.name,
            mode = %mode,
            log = %log_path.display(),
            "Script run started"
        );

        let mut run = Run::new(log, Rc::clone(registry), kwargs.clone(), mode, started);
        let mut script = S::default();
        let args = CallArgs::from_map(&kwargs);

        let outcome = match &registry.constructor {
            Some(entry) => {
                match panic::catch_unwind(AssertUnwindSafe(|| {
                    entry.invoke(&mut script, &mut run, &args)
                })) {
                    Ok(Ok(_)) => BodyOutcome::Succeeded,
                    Ok(Err(err)) => BodyOutcome::Failed(err),
                    Err(payload) => BodyOutcome::Panicked(payload),
                }
            }
            None => BodyOutcome::Succeeded,
        };

        let failure = match &outcome {
            BodyOutcome::Succeeded => None,
            BodyOutcome::Failed(err) => Some(format!("{err:?}")),
            BodyOutcome::Panicked(payload) => Some(format!("panicked: {}", panic_message(payload.as_ref()))),
        };
        let succeeded = failure.is_none();

        if let Some(trace) = &failure {
            settle(
                run.log_mut().write(&format!("{trace}\n"), Some(false), Some(true), 0),
                succeeded,
            )?;
        }

        settle(
            run.log_mut().write_raw(&format!(
                "\nAt point of exit, the final state of the script object was:\n{script:#?}\n"
            )),
            succeeded,
        )?;

        let mut snapshot_path = None;
        if registry.settings.serialize.applies(succeeded) {
            let path = log_path.with_extension("json");
            let written = serde_json::to_value(&script)
                .map_err(IoKitError::from)
                .and_then(|state| {
                    RunSnapshot {
                        format_version: snapshot::SNAPSHOT_FORMAT_VERSION,
                        class: registry.info.name.clone(),
                        run_name: registry.info.run_name.clone(),
                        mode,
                        started,
                        arguments: kwargs.clone(),
                        succeeded,
                        error: failure.clone(),
                        state,
                    }
                    .save(&path)
                });
            settle(written, succeeded)?;
            if path.exists() {
                snapshot_path = Some(path);
            }
        }

        drop(run);

        match outcome {
            BodyOutcome::Succeeded => {
                info!(class = %registry.info.name, "Script run finished");
                Ok(ScriptOutcome {
                    script,
                    log_path,
                    snapshot_path,
                    arguments: kwargs,
                })
            }
            BodyOutcome::Failed(err) => {
                warn!(class = %registry.info.name, log = %log_path.display(), "Script run failed");
                Err(err)
            }
            BodyOutcome::Panicked(payload) => panic::resume_unwind(payload),
        }
    }
}

impl<S> fmt::Debug for ScriptClass<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.registry.members.keys().collect();
        names.sort();
        f.debug_struct("ScriptClass")
            .field("info", &self.registry.info)
            .field("members", &names)
            .finish()
    }
}

/// `<logs>/<YYYY-MM-DD>/<run_name>/[HHh MMm SSs].txt`
pub fn run_log_path(logs_dir: &Path, run_name: &str, started: NaiveDateTime) -> PathBuf {
    logs_dir
        .join(started.format("%Y-%m-%d").to_string())
        .join(run_name)
        .join(format!(
            "[{:02}h {:02}m {:02}s].txt",
            started.hour(),
            started.minute(),
            started.second()
        ))
}

/// Side effects after a failed body must not mask the body's error.
fn settle(result: AppResult<()>, succeeded: bool) -> AppResult<()> {
    match result {
        Err(err) if !succeeded => {
            warn!(error = %err, "Run side effect failed after the body failed");
            Ok(())
        }
        other => other,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
