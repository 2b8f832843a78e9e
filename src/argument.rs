//! Argument descriptors.
//!
//! An [`Argument`] describes one configurable input: its [`ArgKind`], its default value,
//! an optional set of allowed choices and an optional "magnitude" display hint that tells
//! the widget mapper how much room to give the control. Descriptors are built once and then
//! shared through [`SharedArgument`] so that a widget bound to a descriptor can push its
//! current value back into the descriptor's default slot.
//!
//! Values travel as [`ArgValue`], a small dynamically typed value that can be converted
//! from and to `serde_json::Value` against a kind, and rendered to and parsed from the
//! plain text shown in editable controls.
//!
//! Descriptor sets can be loaded from TOML:
//!
//! ```toml
//! [[argument]]
//! name = "retries"
//! kind = "integer"
//! default = 3
//!
//! [[argument]]
//! name = "stages"
//! kind = { dict = "boolean" }
//! default = { load = true, clean = false }
//! ```

use crate::error::{AppResult, IoKitError};
use crate::gui::widget::WidgetKind;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

const DATETIME_TEXT_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
const DATETIME_JSON_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// A descriptor shared between the form that owns it and the widget bound to it.
pub type SharedArgument = Rc<RefCell<Argument>>;

// =============================================================================
// ArgKind
// =============================================================================

/// The declared type of an argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgKind {
    String,
    Boolean,
    Integer,
    Float,
    /// Any filesystem path. Accepted by descriptors, but no widget edits it.
    Path,
    File,
    Dir,
    #[serde(rename = "datetime")]
    DateTime,
    Date,
    List(Box<ArgKind>),
    /// String-keyed mapping whose values have the inner kind.
    Dict(Box<ArgKind>),
    /// Unordered collection. Accepted by descriptors, but no widget edits it.
    Set(Box<ArgKind>),
    /// Untyped value, inferred from its JSON shape.
    Any,
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgKind::String => write!(f, "string"),
            ArgKind::Boolean => write!(f, "boolean"),
            ArgKind::Integer => write!(f, "integer"),
            ArgKind::Float => write!(f, "float"),
            ArgKind::Path => write!(f, "path"),
            ArgKind::File => write!(f, "file"),
            ArgKind::Dir => write!(f, "dir"),
            ArgKind::DateTime => write!(f, "datetime"),
            ArgKind::Date => write!(f, "date"),
            ArgKind::List(item) => write!(f, "list<{item}>"),
            ArgKind::Dict(value) => write!(f, "dict<string, {value}>"),
            ArgKind::Set(item) => write!(f, "set<{item}>"),
            ArgKind::Any => write!(f, "any"),
        }
    }
}

// =============================================================================
// ArgValue
// =============================================================================

/// A dynamically typed argument value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ArgValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Path(PathBuf),
    DateTime(NaiveDateTime),
    Date(NaiveDate),
    List(Vec<ArgValue>),
    Dict(BTreeMap<String, ArgValue>),
}

impl ArgValue {
    /// Returns true for [`ArgValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, ArgValue::Null)
    }

    /// The kind a value of this shape would be parsed back as.
    pub fn kind_hint(&self) -> ArgKind {
        match self {
            ArgValue::Null => ArgKind::Any,
            ArgValue::Bool(_) => ArgKind::Boolean,
            ArgValue::Int(_) => ArgKind::Integer,
            ArgValue::Float(_) => ArgKind::Float,
            ArgValue::Str(_) => ArgKind::String,
            ArgValue::Path(_) => ArgKind::Path,
            ArgValue::DateTime(_) => ArgKind::DateTime,
            ArgValue::Date(_) => ArgKind::Date,
            ArgValue::List(_) => ArgKind::List(Box::new(ArgKind::Any)),
            ArgValue::Dict(_) => ArgKind::Dict(Box::new(ArgKind::Any)),
        }
    }

    /// Convert a JSON value into a value of the given kind.
    pub fn from_json(kind: &ArgKind, json: &Json, name: &str) -> AppResult<Self> {
        if json.is_null() {
            return Ok(ArgValue::Null);
        }

        let mismatch = || IoKitError::invalid_value(name, format!("expected {kind}, got {json}"));

        match kind {
            ArgKind::String => json
                .as_str()
                .map(|s| ArgValue::Str(s.to_string()))
                .ok_or_else(mismatch),
            ArgKind::Boolean => match json {
                Json::Bool(b) => Ok(ArgValue::Bool(*b)),
                Json::String(s) => ArgValue::parse(kind, s, name),
                _ => Err(mismatch()),
            },
            ArgKind::Integer => match json {
                Json::Number(n) => n.as_i64().map(ArgValue::Int).ok_or_else(mismatch),
                Json::String(s) => ArgValue::parse(kind, s, name),
                _ => Err(mismatch()),
            },
            ArgKind::Float => match json {
                Json::Number(n) => n.as_f64().map(ArgValue::Float).ok_or_else(mismatch),
                Json::String(s) => ArgValue::parse(kind, s, name),
                _ => Err(mismatch()),
            },
            ArgKind::Path
            | ArgKind::File
            | ArgKind::Dir
            | ArgKind::DateTime
            | ArgKind::Date => match json {
                Json::String(s) => ArgValue::parse(kind, s, name),
                _ => Err(mismatch()),
            },
            ArgKind::List(item) | ArgKind::Set(item) => match json {
                Json::Array(items) => items
                    .iter()
                    .map(|v| ArgValue::from_json(item, v, name))
                    .collect::<AppResult<Vec<_>>>()
                    .map(ArgValue::List),
                _ => Err(mismatch()),
            },
            ArgKind::Dict(value) => match json {
                Json::Object(map) => map
                    .iter()
                    .map(|(k, v)| Ok::<_, IoKitError>((k.clone(), ArgValue::from_json(value, v, name)?)))
                    .collect::<AppResult<BTreeMap<_, _>>>()
                    .map(ArgValue::Dict),
                _ => Err(mismatch()),
            },
            ArgKind::Any => Ok(ArgValue::infer(json)),
        }
    }

    fn infer(json: &Json) -> Self {
        match json {
            Json::Null => ArgValue::Null,
            Json::Bool(b) => ArgValue::Bool(*b),
            Json::Number(n) => n
                .as_i64()
                .map(ArgValue::Int)
                .unwrap_or_else(|| ArgValue::Float(n.as_f64().unwrap_or(f64::NAN))),
            Json::String(s) => ArgValue::Str(s.clone()),
            Json::Array(items) => ArgValue::List(items.iter().map(ArgValue::infer).collect()),
            Json::Object(map) => ArgValue::Dict(
                map.iter()
                    .map(|(k, v)| (k.clone(), ArgValue::infer(v)))
                    .collect(),
            ),
        }
    }

    /// Convert into JSON. Non-finite floats become `null`.
    pub fn to_json(&self) -> Json {
        match self {
            ArgValue::Null => Json::Null,
            ArgValue::Bool(b) => Json::Bool(*b),
            ArgValue::Int(i) => Json::from(*i),
            ArgValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            ArgValue::Str(s) => Json::String(s.clone()),
            ArgValue::Path(p) => Json::String(p.display().to_string()),
            ArgValue::DateTime(dt) => Json::String(dt.format(DATETIME_JSON_FORMAT).to_string()),
            ArgValue::Date(d) => Json::String(d.format(DATE_FORMAT).to_string()),
            ArgValue::List(items) => Json::Array(items.iter().map(ArgValue::to_json).collect()),
            ArgValue::Dict(map) => Json::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    /// Render as the text an editable control displays.
    pub fn to_text(&self) -> String {
        match self {
            ArgValue::Null => String::new(),
            ArgValue::Bool(b) => b.to_string(),
            ArgValue::Int(i) => i.to_string(),
            ArgValue::Float(f) => f.to_string(),
            ArgValue::Str(s) => s.clone(),
            ArgValue::Path(p) => p.display().to_string(),
            ArgValue::DateTime(dt) => dt.format(DATETIME_TEXT_FORMAT).to_string(),
            ArgValue::Date(d) => d.format(DATE_FORMAT).to_string(),
            ArgValue::List(_) | ArgValue::Dict(_) => self.to_json().to_string(),
        }
    }

    /// Parse control text back into a value of the given kind.
    ///
    /// Empty text is `Null` for every kind except `String`.
    pub fn parse(kind: &ArgKind, text: &str, name: &str) -> AppResult<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() && *kind != ArgKind::String {
            return Ok(ArgValue::Null);
        }

        let invalid = |reason: String| IoKitError::invalid_value(name, reason);

        match kind {
            ArgKind::String => Ok(ArgValue::Str(text.to_string())),
            ArgKind::Boolean => match trimmed.to_lowercase().as_str() {
                "true" | "yes" | "y" | "1" => Ok(ArgValue::Bool(true)),
                "false" | "no" | "n" | "0" => Ok(ArgValue::Bool(false)),
                other => Err(invalid(format!("'{other}' is not a boolean"))),
            },
            ArgKind::Integer => trimmed
                .parse::<i64>()
                .map(ArgValue::Int)
                .map_err(|e| invalid(format!("'{trimmed}' is not an integer: {e}"))),
            ArgKind::Float => trimmed
                .parse::<f64>()
                .map(ArgValue::Float)
                .map_err(|e| invalid(format!("'{trimmed}' is not a number: {e}"))),
            ArgKind::Path | ArgKind::File | ArgKind::Dir => {
                Ok(ArgValue::Path(PathBuf::from(trimmed)))
            }
            ArgKind::DateTime => parse_datetime(trimmed)
                .map(ArgValue::DateTime)
                .ok_or_else(|| invalid(format!("'{trimmed}' is not a date and time"))),
            ArgKind::Date => NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
                .map(ArgValue::Date)
                .map_err(|e| invalid(format!("'{trimmed}' is not a date: {e}"))),
            ArgKind::List(_) | ArgKind::Dict(_) | ArgKind::Set(_) => {
                let json: Json = serde_json::from_str(trimmed)
                    .map_err(|e| invalid(format!("'{trimmed}' is not valid JSON: {e}")))?;
                ArgValue::from_json(kind, &json, name)
            }
            ArgKind::Any => Ok(serde_json::from_str::<Json>(trimmed)
                .map(|json| ArgValue::infer(&json))
                .unwrap_or_else(|_| ArgValue::Str(text.to_string()))),
        }
    }
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    [DATETIME_JSON_FORMAT, DATETIME_TEXT_FORMAT, "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Null => write!(f, "null"),
            ArgValue::Str(s) => write!(f, "{s:?}"),
            other => write!(f, "{}", other.to_text()),
        }
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        ArgValue::Bool(value)
    }
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        ArgValue::Int(value)
    }
}

impl From<f64> for ArgValue {
    fn from(value: f64) -> Self {
        ArgValue::Float(value)
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        ArgValue::Str(value.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        ArgValue::Str(value)
    }
}

impl From<PathBuf> for ArgValue {
    fn from(value: PathBuf) -> Self {
        ArgValue::Path(value)
    }
}

impl From<NaiveDate> for ArgValue {
    fn from(value: NaiveDate) -> Self {
        ArgValue::Date(value)
    }
}

impl From<NaiveDateTime> for ArgValue {
    fn from(value: NaiveDateTime) -> Self {
        ArgValue::DateTime(value)
    }
}

// =============================================================================
// Argument
// =============================================================================

/// Immutable description of one configurable argument.
///
/// Only the default slot changes after construction, and only through a bound widget
/// committing its current value.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    name: String,
    kind: ArgKind,
    default: ArgValue,
    choices: Option<Vec<ArgValue>>,
    magnitude: Option<u32>,
    info: Option<String>,
    nullable: bool,
    widget: Option<WidgetKind>,
}

impl Argument {
    /// Create a descriptor with no default, choices or hints.
    pub fn new(name: impl Into<String>, kind: ArgKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: ArgValue::Null,
            choices: None,
            magnitude: None,
            info: None,
            nullable: false,
            widget: None,
        }
    }

    /// Initial value, also what an untouched widget reports.
    pub fn with_default(mut self, default: impl Into<ArgValue>) -> Self {
        self.default = default.into();
        self
    }

    /// Restrict to these values; the form shows a drop-down.
    pub fn with_choices<I, V>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ArgValue>,
    {
        self.choices = Some(choices.into_iter().map(Into::into).collect());
        self
    }

    /// Display hint: for strings, anything above 1 asks for a multi-line editor.
    pub fn with_magnitude(mut self, magnitude: u32) -> Self {
        self.magnitude = Some(magnitude);
        self
    }

    /// Help text, shown as the widget tooltip.
    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = Some(info.into());
        self
    }

    /// Accept null as a final value.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Wrap into the shared form used for widget binding.
    pub fn shared(self) -> SharedArgument {
        Rc::new(RefCell::new(self))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ArgKind {
        &self.kind
    }

    /// Current value. Committing a widget overwrites it.
    pub fn default(&self) -> &ArgValue {
        &self.default
    }

    /// The allowed values, if the argument is restricted to a non-empty choice set.
    pub fn choices(&self) -> Option<&[ArgValue]> {
        self.choices.as_deref().filter(|c| !c.is_empty())
    }

    pub fn magnitude(&self) -> Option<u32> {
        self.magnitude
    }

    pub fn info(&self) -> Option<&str> {
        self.info.as_deref()
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// An argument with no default that does not accept null must be supplied.
    pub fn is_required(&self) -> bool {
        self.default.is_null() && !self.nullable
    }

    /// True for `dict<string, boolean>` arguments.
    pub fn is_flag_map(&self) -> bool {
        matches!(&self.kind, ArgKind::Dict(value) if **value == ArgKind::Boolean)
    }

    /// The kind of widget currently bound to this argument, if any.
    pub fn bound_widget(&self) -> Option<WidgetKind> {
        self.widget
    }

    pub(crate) fn bind_widget(&mut self, kind: WidgetKind) {
        self.widget = Some(kind);
    }

    pub(crate) fn set_default(&mut self, value: ArgValue) {
        self.default = value;
    }
}

// =============================================================================
// Schema files
// =============================================================================

/// Serializable form of an [`Argument`], as written in schema files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArgumentDef {
    pub name: String,
    pub kind: ArgKind,
    #[serde(default)]
    pub default: Option<Json>,
    #[serde(default)]
    pub choices: Option<Vec<Json>>,
    #[serde(default)]
    pub magnitude: Option<u32>,
    #[serde(default)]
    pub info: Option<String>,
    #[serde(default)]
    pub nullable: bool,
}

impl ArgumentDef {
    /// Coerce the raw default and choices against the declared kind.
    pub fn build(&self) -> AppResult<Argument> {
        let default = match &self.default {
            Some(json) => ArgValue::from_json(&self.kind, json, &self.name)?,
            None => ArgValue::Null,
        };

        let choices = self
            .choices
            .as_ref()
            .map(|choices| {
                choices
                    .iter()
                    .map(|c| ArgValue::from_json(&self.kind, c, &self.name))
                    .collect::<AppResult<Vec<_>>>()
            })
            .transpose()?;

        if let Some(choices) = &choices {
            if !default.is_null() && !choices.is_empty() && !choices.contains(&default) {
                return Err(IoKitError::invalid_value(
                    &self.name,
                    format!("default {default} is not one of the allowed choices"),
                ));
            }
        }

        Ok(Argument {
            name: self.name.clone(),
            kind: self.kind.clone(),
            default,
            choices,
            magnitude: self.magnitude,
            info: self.info.clone(),
            nullable: self.nullable,
            widget: None,
        })
    }
}

/// A list of argument definitions, loaded from a TOML schema with `[[argument]]` tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArgumentSet {
    #[serde(rename = "argument", default)]
    pub arguments: Vec<ArgumentDef>,
}

impl ArgumentSet {
    /// Parse a schema held in memory.
    pub fn from_toml_str(text: &str) -> AppResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a schema file.
    pub fn load(path: &Path) -> AppResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Build every descriptor, failing on the first one that does not coerce.
    pub fn build(&self) -> AppResult<Vec<Argument>> {
        self.arguments.iter().map(ArgumentDef::build).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_display_nests() {
        let kind = ArgKind::Dict(Box::new(ArgKind::List(Box::new(ArgKind::Integer))));
        assert_eq!(kind.to_string(), "dict<string, list<integer>>");
    }

    #[test]
    fn from_json_coerces_by_kind() {
        let dt = ArgValue::from_json(&ArgKind::DateTime, &json!("2024-03-01T09:30:00"), "at")
            .unwrap();
        assert_eq!(
            dt,
            ArgValue::DateTime(
                NaiveDate::from_ymd_opt(2024, 3, 1)
                    .unwrap()
                    .and_hms_opt(9, 30, 0)
                    .unwrap()
            )
        );

        let flags = ArgValue::from_json(
            &ArgKind::Dict(Box::new(ArgKind::Boolean)),
            &json!({"a": true, "b": false}),
            "flags",
        )
        .unwrap();
        match flags {
            ArgValue::Dict(map) => {
                assert_eq!(map.get("a"), Some(&ArgValue::Bool(true)));
                assert_eq!(map.get("b"), Some(&ArgValue::Bool(false)));
            }
            other => panic!("unexpected value: {:?}", other),
        }
    }

    #[test]
    fn from_json_rejects_wrong_shape() {
        let err = ArgValue::from_json(&ArgKind::Integer, &json!([1, 2]), "count").unwrap_err();
        assert!(err.to_string().contains("count"));
    }

    #[test]
    fn datetime_text_keeps_fractional_seconds() {
        let whole = NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_opt(10, 0, 0))
            .unwrap();
        let fractional = NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_milli_opt(10, 0, 0, 500))
            .unwrap();

        assert_eq!(ArgValue::DateTime(whole).to_text(), "2024-03-01 10:00:00");
        assert_eq!(ArgValue::DateTime(fractional).to_text(), "2024-03-01 10:00:00.500");
        for value in [ArgValue::DateTime(whole), ArgValue::DateTime(fractional)] {
            assert_eq!(ArgValue::parse(&ArgKind::DateTime, &value.to_text(), "at").unwrap(), value);
            assert_eq!(ArgValue::from_json(&ArgKind::DateTime, &value.to_json(), "at").unwrap(), value);
        }
    }

    #[test]
    fn parse_treats_empty_text_as_null_except_for_strings() {
        assert_eq!(ArgValue::parse(&ArgKind::Integer, "  ", "n").unwrap(), ArgValue::Null);
        assert_eq!(
            ArgValue::parse(&ArgKind::String, "", "s").unwrap(),
            ArgValue::Str(String::new())
        );
    }

    #[test]
    fn text_round_trips_for_editable_scalars() {
        let values = [
            (ArgKind::Integer, ArgValue::Int(-12)),
            (ArgKind::Float, ArgValue::Float(0.1)),
            (ArgKind::Boolean, ArgValue::Bool(true)),
            (
                ArgKind::Date,
                ArgValue::Date(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()),
            ),
        ];
        for (kind, value) in values {
            assert_eq!(ArgValue::parse(&kind, &value.to_text(), "x").unwrap(), value);
        }
    }

    #[test]
    fn any_kind_falls_back_to_plain_text() {
        assert_eq!(ArgValue::parse(&ArgKind::Any, "42", "x").unwrap(), ArgValue::Int(42));
        assert_eq!(
            ArgValue::parse(&ArgKind::Any, "hello world", "x").unwrap(),
            ArgValue::Str("hello world".into())
        );
    }

    #[test]
    fn empty_choice_set_counts_as_no_choices() {
        let arg = Argument::new("mode", ArgKind::String).with_choices(Vec::<ArgValue>::new());
        assert!(arg.choices().is_none());
    }

    #[test]
    fn required_when_no_default_and_not_nullable() {
        assert!(Argument::new("x", ArgKind::Integer).is_required());
        assert!(!Argument::new("x", ArgKind::Integer).nullable().is_required());
        assert!(!Argument::new("x", ArgKind::Integer).with_default(1i64).is_required());
    }

    #[test]
    fn schema_builds_arguments() {
        let set = ArgumentSet::from_toml_str(
            r#"
            [[argument]]
            name = "retries"
            kind = "integer"
            default = 3

            [[argument]]
            name = "colour"
            kind = "string"
            default = "red"
            choices = ["red", "green"]

            [[argument]]
            name = "stages"
            kind = { dict = "boolean" }
            default = { load = true, clean = false }
            "#,
        )
        .unwrap();

        let args = set.build().unwrap();
        assert_eq!(args.len(), 3);
        assert_eq!(args[0].default(), &ArgValue::Int(3));
        assert_eq!(args[1].choices().map(|c| c.len()), Some(2));
        assert!(args[2].is_flag_map());
    }

    #[test]
    fn schema_rejects_default_outside_choices() {
        let def = ArgumentDef {
            name: "colour".into(),
            kind: ArgKind::String,
            default: Some(json!("blue")),
            choices: Some(vec![json!("red"), json!("green")]),
            magnitude: None,
            info: None,
            nullable: false,
        };
        let err = def.build().unwrap_err();
        assert!(matches!(err, IoKitError::InvalidValue { .. }));
    }
}
