//! Concrete input controls.
//!
//! Each control keeps its own editable state (usually the text the user is typing) and
//! knows how to turn that state into an [`ArgValue`]. Controls never touch an
//! [`Argument`](crate::argument::Argument) directly: binding and committing values is
//! the job of [`WidgetHandle`](super::widget::WidgetHandle).
//!
//! A control created from a `Null` default reports `Null` until the user edits it.

use super::widget::WidgetKind;
use crate::argument::{ArgKind, ArgValue};
use crate::error::{AppResult, IoKitError};
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use egui::{Color32, ComboBox, DragValue, Response, TextEdit, Ui};
use egui_extras::DatePickerButton;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Common interface over every input control.
pub trait Control {
    /// Which widget this is.
    fn kind(&self) -> WidgetKind;

    /// The value currently entered.
    fn state(&self) -> ArgValue;

    /// Replace the value shown by the control.
    fn set_state(&mut self, value: &ArgValue);

    /// Entered text that does not parse, one message per problem.
    fn problems(&self) -> Vec<String> {
        Vec::new()
    }

    /// Draw the control.
    fn ui(&mut self, ui: &mut Ui) -> Response;
}

fn invalid_colour(valid: bool) -> Option<Color32> {
    (!valid).then_some(Color32::from_rgb(255, 100, 100))
}

// =============================================================================
// Selection
// =============================================================================

/// Single choice out of a fixed set.
pub struct DropDown {
    choices: Vec<ArgValue>,
    selected: Option<usize>,
}

impl DropDown {
    /// Start on `state` when it is one of `choices`, otherwise on nothing.
    pub fn new(choices: Vec<ArgValue>, state: &ArgValue) -> Self {
        let mut dropdown = Self {
            choices,
            selected: None,
        };
        dropdown.set_state(state);
        dropdown
    }

    /// Values offered, in order.
    pub fn choices(&self) -> &[ArgValue] {
        &self.choices
    }
}

impl Control for DropDown {
    fn kind(&self) -> WidgetKind {
        WidgetKind::DropDown
    }

    fn state(&self) -> ArgValue {
        self.selected
            .and_then(|index| self.choices.get(index))
            .cloned()
            .unwrap_or_default()
    }

    fn set_state(&mut self, value: &ArgValue) {
        self.selected = self.choices.iter().position(|choice| choice == value);
    }

    fn ui(&mut self, ui: &mut Ui) -> Response {
        let selected_text = self.state().to_text();
        let choices = &self.choices;
        let selected = &mut self.selected;

        ComboBox::from_id_salt("choices")
            .selected_text(selected_text)
            .show_ui(ui, |ui| {
                for (index, choice) in choices.iter().enumerate() {
                    ui.selectable_value(selected, Some(index), choice.to_text());
                }
            })
            .response
    }
}

/// A single on/off toggle.
pub struct Checkbox {
    checked: bool,
}

impl Checkbox {
    /// An unset state starts unchecked.
    pub fn new(state: &ArgValue) -> Self {
        Self {
            checked: matches!(state, ArgValue::Bool(true)),
        }
    }
}

impl Control for Checkbox {
    fn kind(&self) -> WidgetKind {
        WidgetKind::Checkbox
    }

    fn state(&self) -> ArgValue {
        ArgValue::Bool(self.checked)
    }

    fn set_state(&mut self, value: &ArgValue) {
        self.checked = matches!(value, ArgValue::Bool(true));
    }

    fn ui(&mut self, ui: &mut Ui) -> Response {
        ui.checkbox(&mut self.checked, "")
    }
}

/// A row of labelled checkboxes editing a `dict<string, boolean>`.
pub struct CheckBar {
    boxes: Vec<(String, bool)>,
    unset: bool,
}

impl CheckBar {
    /// One box per key of a boolean dict.
    pub fn new(state: &ArgValue) -> Self {
        let boxes = match state {
            ArgValue::Dict(map) => map
                .iter()
                .map(|(key, value)| (key.clone(), matches!(value, ArgValue::Bool(true))))
                .collect(),
            _ => Vec::new(),
        };
        Self {
            boxes,
            unset: state.is_null(),
        }
    }
}

impl Control for CheckBar {
    fn kind(&self) -> WidgetKind {
        WidgetKind::CheckBar
    }

    fn state(&self) -> ArgValue {
        if self.unset && self.boxes.is_empty() {
            return ArgValue::Null;
        }
        ArgValue::Dict(
            self.boxes
                .iter()
                .map(|(key, checked)| (key.clone(), ArgValue::Bool(*checked)))
                .collect(),
        )
    }

    fn set_state(&mut self, value: &ArgValue) {
        if self.boxes.is_empty() {
            *self = Self::new(value);
            return;
        }
        if let ArgValue::Dict(map) = value {
            for (key, checked) in &mut self.boxes {
                if let Some(ArgValue::Bool(b)) = map.get(key.as_str()) {
                    *checked = *b;
                }
            }
        }
    }

    fn ui(&mut self, ui: &mut Ui) -> Response {
        ui.horizontal(|ui| {
            for (key, checked) in &mut self.boxes {
                ui.checkbox(checked, key.as_str());
            }
        })
        .response
    }
}

// =============================================================================
// Text-backed entries
// =============================================================================

/// Integer or float entry. Unparseable text reads as `Null` and is drawn in red.
pub struct NumericEntry {
    kind: ArgKind,
    text: String,
}

impl NumericEntry {
    /// Entry for whole numbers.
    pub fn integer(state: &ArgValue) -> Self {
        Self {
            kind: ArgKind::Integer,
            text: state.to_text(),
        }
    }

    /// Entry for floats.
    pub fn float(state: &ArgValue) -> Self {
        Self {
            kind: ArgKind::Float,
            text: state.to_text(),
        }
    }

    fn parsed(&self) -> Option<ArgValue> {
        ArgValue::parse(&self.kind, &self.text, "").ok()
    }
}

impl Control for NumericEntry {
    fn kind(&self) -> WidgetKind {
        match self.kind {
            ArgKind::Integer => WidgetKind::IntEntry,
            _ => WidgetKind::FloatEntry,
        }
    }

    fn state(&self) -> ArgValue {
        self.parsed().unwrap_or_default()
    }

    fn set_state(&mut self, value: &ArgValue) {
        self.text = value.to_text();
    }

    fn problems(&self) -> Vec<String> {
        match self.parsed() {
            Some(_) => Vec::new(),
            None => vec![format!("'{}' is not a valid {}", self.text.trim(), self.kind)],
        }
    }

    fn ui(&mut self, ui: &mut Ui) -> Response {
        let valid = self.parsed().is_some();
        let mut edit = TextEdit::singleline(&mut self.text).desired_width(120.0);
        if let Some(colour) = invalid_colour(valid) {
            edit = edit.text_color(colour);
        }
        ui.add(edit)
    }
}

/// Free text. Multi-line when `magnitude` is given, one line otherwise.
pub struct TextEntry {
    text: String,
    magnitude: Option<u32>,
    null_when_empty: bool,
}

impl TextEntry {
    /// A single-line entry.
    pub fn single_line(state: &ArgValue) -> Self {
        Self {
            text: state.to_text(),
            magnitude: None,
            null_when_empty: state.is_null(),
        }
    }

    /// A multi-line area showing `magnitude` rows.
    pub fn multi_line(state: &ArgValue, magnitude: u32) -> Self {
        Self {
            magnitude: Some(magnitude.max(1)),
            ..Self::single_line(state)
        }
    }

    /// Visible rows.
    pub fn rows(&self) -> usize {
        self.magnitude.unwrap_or(1) as usize
    }
}

impl Control for TextEntry {
    fn kind(&self) -> WidgetKind {
        if self.magnitude.is_some() {
            WidgetKind::Text
        } else {
            WidgetKind::Entry
        }
    }

    fn state(&self) -> ArgValue {
        if self.text.is_empty() && self.null_when_empty {
            ArgValue::Null
        } else {
            ArgValue::Str(self.text.clone())
        }
    }

    fn set_state(&mut self, value: &ArgValue) {
        self.text = value.to_text();
        self.null_when_empty = value.is_null();
    }

    fn ui(&mut self, ui: &mut Ui) -> Response {
        match self.magnitude {
            Some(rows) => ui.add(TextEdit::multiline(&mut self.text).desired_rows(rows as usize)),
            None => ui.text_edit_singleline(&mut self.text),
        }
    }
}

/// Path entry for files or directories, flagging paths that do not exist as such.
pub struct PathSelect {
    text: String,
    directory: bool,
}

impl PathSelect {
    /// Text entry with a browse button for files.
    pub fn file(state: &ArgValue) -> Self {
        Self {
            text: state.to_text(),
            directory: false,
        }
    }

    /// Same, for directories.
    pub fn dir(state: &ArgValue) -> Self {
        Self {
            text: state.to_text(),
            directory: true,
        }
    }

    fn points_at_expected_kind(&self) -> bool {
        let path = Path::new(&self.text);
        if self.directory {
            path.is_dir()
        } else {
            path.is_file()
        }
    }
}

impl Control for PathSelect {
    fn kind(&self) -> WidgetKind {
        if self.directory {
            WidgetKind::DirSelect
        } else {
            WidgetKind::FileSelect
        }
    }

    fn state(&self) -> ArgValue {
        if self.text.trim().is_empty() {
            ArgValue::Null
        } else {
            ArgValue::Path(PathBuf::from(self.text.trim()))
        }
    }

    fn set_state(&mut self, value: &ArgValue) {
        self.text = value.to_text();
    }

    fn ui(&mut self, ui: &mut Ui) -> Response {
        ui.horizontal(|ui| {
            ui.add(TextEdit::singleline(&mut self.text).desired_width(280.0));
            if !self.text.is_empty() && !self.points_at_expected_kind() {
                let what = if self.directory { "directory" } else { "file" };
                ui.colored_label(Color32::YELLOW, "⚠")
                    .on_hover_text(format!("No {what} at this path"));
            }
        })
        .response
    }
}

// =============================================================================
// Dates
// =============================================================================

/// Date picker.
pub struct Calendar {
    date: Option<NaiveDate>,
}

impl Calendar {
    /// A date picker.
    pub fn new(state: &ArgValue) -> Self {
        let mut calendar = Self { date: None };
        calendar.set_state(state);
        calendar
    }
}

impl Control for Calendar {
    fn kind(&self) -> WidgetKind {
        WidgetKind::Calendar
    }

    fn state(&self) -> ArgValue {
        self.date.map(ArgValue::Date).unwrap_or_default()
    }

    fn set_state(&mut self, value: &ArgValue) {
        self.date = match value {
            ArgValue::Date(d) => Some(*d),
            ArgValue::DateTime(dt) => Some(dt.date()),
            _ => None,
        };
    }

    fn ui(&mut self, ui: &mut Ui) -> Response {
        match &mut self.date {
            Some(date) => ui.add(DatePickerButton::new(date)),
            None => {
                let response = ui.button("Pick date");
                if response.clicked() {
                    self.date = Some(Local::now().date_naive());
                }
                response
            }
        }
    }
}

/// Date and time editor. `magnitude` is the precision shown, from 1 (year) to 6 (seconds).
pub struct DateTimeEdit {
    value: Option<NaiveDateTime>,
    magnitude: u32,
}

impl DateTimeEdit {
    /// Full precision, used when no magnitude is given.
    pub const DEFAULT_MAGNITUDE: u32 = 6;

    pub fn new(state: &ArgValue, magnitude: Option<u32>) -> Self {
        let mut edit = Self {
            value: None,
            magnitude: magnitude.unwrap_or(Self::DEFAULT_MAGNITUDE).clamp(1, 6),
        };
        edit.set_state(state);
        edit
    }

    /// Precision shown, 1 (year) to 6 (seconds).
    pub fn magnitude(&self) -> u32 {
        self.magnitude
    }
}

impl Control for DateTimeEdit {
    fn kind(&self) -> WidgetKind {
        WidgetKind::DateTimeEdit
    }

    fn state(&self) -> ArgValue {
        self.value.map(ArgValue::DateTime).unwrap_or_default()
    }

    fn set_state(&mut self, value: &ArgValue) {
        self.value = match value {
            ArgValue::DateTime(dt) => Some(*dt),
            ArgValue::Date(d) => d.and_hms_opt(0, 0, 0),
            _ => None,
        };
    }

    fn ui(&mut self, ui: &mut Ui) -> Response {
        let magnitude = self.magnitude;
        let Some(value) = &mut self.value else {
            let response = ui.button("Pick date and time");
            if response.clicked() {
                let now = Local::now().naive_local();
                self.value = Some(now.with_nanosecond(0).unwrap_or(now));
            }
            return response;
        };

        ui.horizontal(|ui| {
            let mut date = value.date();
            let (mut hour, mut minute, mut second) = (value.hour(), value.minute(), value.second());

            ui.add(DatePickerButton::new(&mut date));
            if magnitude >= 4 {
                ui.add(DragValue::new(&mut hour).range(0..=23).suffix("h"));
            }
            if magnitude >= 5 {
                ui.add(DragValue::new(&mut minute).range(0..=59).suffix("m"));
            }
            if magnitude >= 6 {
                ui.add(DragValue::new(&mut second).range(0..=59).suffix("s"));
            }

            if let Some(time) = NaiveTime::from_hms_opt(hour, minute, second) {
                *value = date.and_time(time);
            }
        })
        .response
    }
}

// =============================================================================
// Collections
// =============================================================================

/// One list row: the text being edited and the value it was created from.
struct ListItem {
    text: String,
    original: Option<ArgValue>,
}

impl ListItem {
    fn from_value(value: &ArgValue) -> Self {
        Self {
            text: value.to_text(),
            original: Some(value.clone()),
        }
    }

    fn blank() -> Self {
        Self {
            text: String::new(),
            original: None,
        }
    }

    /// The untouched original, or the text parsed as `kind`.
    fn value(&self, kind: &ArgKind) -> AppResult<ArgValue> {
        match &self.original {
            Some(original) if original.to_text() == self.text => Ok(original.clone()),
            _ => match ArgValue::parse(kind, &self.text, "")? {
                ArgValue::Null => Err(IoKitError::invalid_value("", "empty item")),
                value => Ok(value),
            },
        }
    }
}

/// Editable list. Each item is typed as text and parsed with the list's item kind.
/// Items keep their original value until their text is edited.
pub struct ListEditor {
    item_kind: ArgKind,
    items: Vec<ListItem>,
    unset: bool,
}

impl ListEditor {
    /// One text row per item, parsed as `item_kind`.
    pub fn new(item_kind: ArgKind, state: &ArgValue) -> Self {
        let items = match state {
            ArgValue::List(items) => items.iter().map(ListItem::from_value).collect(),
            _ => Vec::new(),
        };
        Self {
            item_kind,
            items,
            unset: state.is_null(),
        }
    }

    /// Number of rows, including ones that do not parse.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Append an item as if typed by the user.
    pub fn push(&mut self, text: impl Into<String>) {
        self.items.push(ListItem {
            text: text.into(),
            original: None,
        });
    }

    /// Drop the row at `index`; out of range is ignored.
    pub fn remove(&mut self, index: usize) {
        if index < self.items.len() {
            self.items.remove(index);
        }
    }
}

impl Control for ListEditor {
    fn kind(&self) -> WidgetKind {
        WidgetKind::List
    }

    /// Items that fail to parse are skipped; [`Control::problems`] reports them.
    fn state(&self) -> ArgValue {
        if self.unset && self.items.is_empty() {
            return ArgValue::Null;
        }
        ArgValue::List(
            self.items
                .iter()
                .filter_map(|item| item.value(&self.item_kind).ok())
                .collect(),
        )
    }

    fn set_state(&mut self, value: &ArgValue) {
        *self = Self::new(self.item_kind.clone(), value);
    }

    fn problems(&self) -> Vec<String> {
        self.items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| {
                item.value(&self.item_kind)
                    .err()
                    .map(|_| format!("item {}: '{}' is not a valid {}", index + 1, item.text, self.item_kind))
            })
            .collect()
    }

    fn ui(&mut self, ui: &mut Ui) -> Response {
        let item_kind = self.item_kind.clone();
        let mut removed = None;

        let response = ui
            .vertical(|ui| {
                for (index, item) in self.items.iter_mut().enumerate() {
                    ui.push_id(index, |ui| {
                        ui.horizontal(|ui| {
                            let valid = item.value(&item_kind).is_ok();
                            let mut edit = TextEdit::singleline(&mut item.text).desired_width(200.0);
                            if let Some(colour) = invalid_colour(valid) {
                                edit = edit.text_color(colour);
                            }
                            ui.add(edit);
                            if ui.small_button("−").clicked() {
                                removed = Some(index);
                            }
                        });
                    });
                }
                if ui.small_button("+").clicked() {
                    self.items.push(ListItem::blank());
                }
            })
            .response;

        if let Some(index) = removed {
            self.remove(index);
        }
        response
    }
}

enum TreeNode {
    Leaf { kind: ArgKind, text: String },
    Branch(Vec<(String, TreeNode)>),
}

impl TreeNode {
    fn from_value(value_kind: &ArgKind, value: &ArgValue) -> Self {
        match value {
            ArgValue::Dict(map) => TreeNode::Branch(
                map.iter()
                    .map(|(key, value)| {
                        let inner = match value_kind {
                            ArgKind::Dict(inner) => inner.as_ref().clone(),
                            _ => ArgKind::Any,
                        };
                        (key.clone(), TreeNode::from_value(&inner, value))
                    })
                    .collect(),
            ),
            other => {
                let kind = match value_kind {
                    ArgKind::Any => other.kind_hint(),
                    kind => kind.clone(),
                };
                TreeNode::Leaf {
                    kind,
                    text: other.to_text(),
                }
            }
        }
    }

    fn value(&self) -> ArgValue {
        match self {
            TreeNode::Leaf { kind, text } => ArgValue::parse(kind, text, "").unwrap_or_default(),
            TreeNode::Branch(children) => ArgValue::Dict(
                children
                    .iter()
                    .map(|(key, node)| (key.clone(), node.value()))
                    .collect(),
            ),
        }
    }

    fn collect_problems(&self, path: &str, problems: &mut Vec<String>) {
        match self {
            TreeNode::Leaf { kind, text } => {
                if ArgValue::parse(kind, text, "").is_err() {
                    problems.push(format!("{path}: '{text}' is not a valid {kind}"));
                }
            }
            TreeNode::Branch(children) => {
                for (key, node) in children {
                    let path = if path.is_empty() {
                        key.clone()
                    } else {
                        format!("{path}.{key}")
                    };
                    node.collect_problems(&path, problems);
                }
            }
        }
    }

    fn ui(&mut self, ui: &mut Ui) {
        let TreeNode::Branch(children) = self else {
            return;
        };
        egui::Grid::new("tree_rows").num_columns(2).show(ui, |ui| {
            for (index, (key, node)) in children.iter_mut().enumerate() {
                ui.push_id(index, |ui| match node {
                    TreeNode::Leaf { text, .. } => {
                        ui.label(key.as_str());
                        ui.text_edit_singleline(text);
                    }
                    branch @ TreeNode::Branch(_) => {
                        ui.collapsing(key.as_str(), |ui| branch.ui(ui));
                    }
                });
                ui.end_row();
            }
        });
    }
}

/// Key/value editor for dictionaries, with nested dictionaries shown as subtrees.
pub struct Tree {
    value_kind: ArgKind,
    root: TreeNode,
    unset: bool,
}

impl Tree {
    /// Nested editor for dicts whose leaves are `value_kind`.
    pub fn new(value_kind: ArgKind, state: &ArgValue) -> Self {
        let empty = ArgValue::Dict(BTreeMap::new());
        let unset = state.is_null();
        let state = if unset { &empty } else { state };
        Self {
            root: TreeNode::from_value(&ArgKind::Dict(Box::new(value_kind.clone())), state),
            value_kind,
            unset,
        }
    }
}

impl Control for Tree {
    fn kind(&self) -> WidgetKind {
        WidgetKind::Tree
    }

    fn state(&self) -> ArgValue {
        match &self.root {
            TreeNode::Branch(children) if self.unset && children.is_empty() => ArgValue::Null,
            root => root.value(),
        }
    }

    fn set_state(&mut self, value: &ArgValue) {
        *self = Self::new(self.value_kind.clone(), value);
    }

    fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        self.root.collect_problems("", &mut problems);
        problems
    }

    fn ui(&mut self, ui: &mut Ui) -> Response {
        ui.vertical(|ui| self.root.ui(ui)).response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropdown_ignores_values_outside_choices() {
        let mut dropdown = DropDown::new(vec!["a".into(), "b".into()], &"b".into());
        assert_eq!(dropdown.state(), ArgValue::Str("b".into()));
        dropdown.set_state(&"z".into());
        assert_eq!(dropdown.state(), ArgValue::Null);
    }

    #[test]
    fn numeric_entry_reads_null_for_bad_text() {
        let mut entry = NumericEntry::integer(&ArgValue::Int(7));
        assert_eq!(entry.state(), ArgValue::Int(7));
        entry.text = "seven".into();
        assert_eq!(entry.state(), ArgValue::Null);
    }

    #[test]
    fn collections_report_null_until_filled() {
        assert_eq!(CheckBar::new(&ArgValue::Null).state(), ArgValue::Null);
        assert_eq!(Tree::new(ArgKind::Integer, &ArgValue::Null).state(), ArgValue::Null);

        let mut list = ListEditor::new(ArgKind::Integer, &ArgValue::Null);
        assert_eq!(list.state(), ArgValue::Null);
        list.push("4");
        assert_eq!(list.state(), ArgValue::List(vec![ArgValue::Int(4)]));

        let empty = ArgValue::List(Vec::new());
        assert_eq!(ListEditor::new(ArgKind::Integer, &empty).state(), empty);
    }

    #[test]
    fn list_items_keep_their_value_until_edited() {
        let default = ArgValue::List(vec!["42".into(), "true".into(), ArgValue::Null]);
        let mut list = ListEditor::new(ArgKind::Any, &default);
        assert_eq!(list.state(), default);
        assert!(list.problems().is_empty());

        list.items[0].text = "43".into();
        assert_eq!(
            list.state(),
            ArgValue::List(vec![ArgValue::Int(43), "true".into(), ArgValue::Null])
        );
    }

    #[test]
    fn unparseable_text_is_reported() {
        let mut entry = NumericEntry::float(&ArgValue::Float(1.5));
        assert!(entry.problems().is_empty());
        entry.text = "fast".into();
        assert_eq!(entry.problems(), vec!["'fast' is not a valid float".to_string()]);

        let mut list = ListEditor::new(ArgKind::Integer, &ArgValue::List(vec![ArgValue::Int(1)]));
        list.push("two");
        list.push("");
        assert_eq!(list.state(), ArgValue::List(vec![ArgValue::Int(1)]));
        assert_eq!(list.problems().len(), 2);
        assert!(list.problems()[0].starts_with("item 2: 'two'"));

        let tree = Tree::new(
            ArgKind::Integer,
            &ArgValue::Dict([("cpu".to_string(), ArgValue::Int(2))].into_iter().collect()),
        );
        assert!(tree.problems().is_empty());
    }

    #[test]
    fn text_entry_keeps_empty_string_default() {
        let entry = TextEntry::single_line(&ArgValue::Str(String::new()));
        assert_eq!(entry.state(), ArgValue::Str(String::new()));
        let unset = TextEntry::single_line(&ArgValue::Null);
        assert_eq!(unset.state(), ArgValue::Null);
    }

    #[test]
    fn datetime_magnitude_is_clamped() {
        assert_eq!(DateTimeEdit::new(&ArgValue::Null, Some(9)).magnitude(), 6);
        assert_eq!(DateTimeEdit::new(&ArgValue::Null, None).magnitude(), 6);
        assert_eq!(DateTimeEdit::new(&ArgValue::Null, Some(3)).magnitude(), 3);
    }

    #[test]
    fn list_editor_add_and_remove() {
        let mut list = ListEditor::new(ArgKind::Integer, &ArgValue::List(vec![1i64.into()]));
        list.push("2");
        list.push("oops");
        assert_eq!(list.state(), ArgValue::List(vec![1i64.into(), 2i64.into()]));
        list.remove(0);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn tree_preserves_nested_values() {
        let mut inner = BTreeMap::new();
        inner.insert("depth".to_string(), ArgValue::Int(2));
        let mut outer = BTreeMap::new();
        outer.insert("name".to_string(), ArgValue::Str("root".into()));
        outer.insert("child".to_string(), ArgValue::Dict(inner));
        let value = ArgValue::Dict(outer);

        let tree = Tree::new(ArgKind::Any, &value);
        assert_eq!(tree.state(), value);
    }
}
