//! Call profiling for wrapped script members.
//!
//! Every wrapped call goes through [`profile`]:
//!
//! 1. A start-line `Name.member(args) starting...` is written to the file, and to the
//!    console only when the class is verbose.
//! 2. The body runs one indentation level deeper, so nested calls read as a tree.
//! 3. On success a finish-line records the elapsed seconds and the returned value.
//!    Instance members whose script describes itself also record that description.
//! 4. On failure no finish-line is written and the error is returned as-is.

use super::function::{FunctionRecord, Receiver, Universal};
use super::run::Run;
use super::Script;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as Json};
use std::fmt;
use std::time::Instant;

/// Arguments of one call: positional values followed by named ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    positional: Vec<Json>,
    keyword: Vec<(String, Json)>,
}

impl CallArgs {
    /// No arguments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keyword arguments taken from a map, in map order.
    pub fn from_map(map: &Map<String, Json>) -> Self {
        Self {
            positional: Vec::new(),
            keyword: map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        }
    }

    /// Append a positional argument.
    pub fn arg(mut self, value: impl Into<Json>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Append a keyword argument.
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Json>) -> Self {
        self.keyword.push((name.into(), value.into()));
        self
    }

    /// Positional values, in call order.
    pub fn positional(&self) -> &[Json] {
        &self.positional
    }

    /// Named values, in call order.
    pub fn keyword(&self) -> &[(String, Json)] {
        &self.keyword
    }

    /// No arguments of either sort.
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keyword.is_empty()
    }

    /// Deserialize the positional argument at `index`.
    pub fn get<T: DeserializeOwned>(&self, index: usize) -> anyhow::Result<T> {
        let value = self
            .positional
            .get(index)
            .ok_or_else(|| anyhow::anyhow!("missing positional argument {index}"))?;
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Deserialize the keyword argument `name`.
    pub fn get_kw<T: DeserializeOwned>(&self, name: &str) -> anyhow::Result<T> {
        let value = self
            .keyword
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
            .ok_or_else(|| anyhow::anyhow!("missing keyword argument '{name}'"))?;
        Ok(serde_json::from_value(value.clone())?)
    }
}

impl fmt::Display for CallArgs {
    /// `a, b, key=value`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .positional
            .iter()
            .map(Json::to_string)
            .chain(self.keyword.iter().map(|(k, v)| format!("{k}={v}")))
            .collect::<Vec<_>>()
            .join(", ");
        f.write_str(&rendered)
    }
}

pub(crate) fn start_line(record: &FunctionRecord, args: &CallArgs) -> String {
    format!("{}({}) starting...\n", record.name, args)
}

pub(crate) fn finish_line(
    record: &FunctionRecord,
    seconds: f64,
    returned: &Json,
    receiver: Option<String>,
) -> String {
    match receiver {
        Some(state) => format!(
            "{} finished in {} seconds, returning: {}. Receiver is now: {}.\n",
            record.name, seconds, returned, state
        ),
        None => format!(
            "{} finished in {} seconds, returning: {}.\n",
            record.name, seconds, returned
        ),
    }
}

/// Run `body` bracketed by start and finish lines in the run log.
pub fn profile<S: Script>(
    record: &FunctionRecord,
    mut receiver: Receiver<'_, S>,
    run: &mut Run<S>,
    args: &CallArgs,
    body: &Universal<S>,
) -> anyhow::Result<Json> {
    let verbose = run.settings().verbose;

    {
        let _channels = run.log().channels();
        run.log_mut()
            .write(&start_line(record, args), Some(verbose), Some(true), 0)?;
    }

    let timer = Instant::now();
    let returned = {
        let _indent = run.log().indentation();
        body(receiver.reborrow(), run, args)?
    };
    let seconds = timer.elapsed().as_secs_f64();

    let description = receiver.instance().and_then(S::describe);
    {
        let _channels = run.log().channels();
        run.log_mut().write(
            &finish_line(record, seconds, &returned, description),
            Some(verbose),
            Some(true),
            0,
        )?;
    }

    Ok(returned)
}
