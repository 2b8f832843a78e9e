//! Argument-to-widget mapping.
//!
//! [`Widget::from_argument`] turns a descriptor into a ready-to-draw [`WidgetHandle`].
//! The dispatch order matters because the categories overlap: a choice set wins over
//! the declared kind, and a `dict<string, boolean>` is a row of checkboxes rather than
//! a generic tree.
//!
//! | Descriptor                          | Widget                      |
//! |-------------------------------------|-----------------------------|
//! | has choices                         | `DropDown`                  |
//! | `dict<string, boolean>`             | `CheckBar`                  |
//! | `boolean`                           | `Checkbox`                  |
//! | `integer` / `float`                 | `IntEntry` / `FloatEntry`   |
//! | `file` / `dir`                      | `FileSelect` / `DirSelect`  |
//! | `datetime`                          | `DateTimeEdit`              |
//! | `date`                              | `Calendar`                  |
//! | `string`, magnitude > 1             | `Text` (multi-line)         |
//! | `string`                            | `Entry`                     |
//! | `list`                              | `List`                      |
//! | `dict` (any other value kind)       | `Tree`                      |
//!
//! Anything else (`path`, `set`, `any`) is rejected with
//! [`IoKitError::UnsupportedArgument`].

use super::controls::{
    Calendar, CheckBar, Checkbox, Control, DateTimeEdit, DropDown, ListEditor, NumericEntry,
    PathSelect, TextEntry, Tree,
};
use crate::argument::{ArgKind, ArgValue, SharedArgument};
use crate::error::{AppResult, IoKitError};
use egui::{Response, Ui};
use std::fmt;

/// The kinds of input control the mapper can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidgetKind {
    DropDown,
    CheckBar,
    Checkbox,
    IntEntry,
    FloatEntry,
    FileSelect,
    DirSelect,
    DateTimeEdit,
    Calendar,
    Text,
    Entry,
    List,
    Tree,
}

impl WidgetKind {
    /// True for the selection-style controls.
    pub fn is_selection(self) -> bool {
        matches!(self, WidgetKind::DropDown)
    }
}

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Namespace for the widget factory.
pub struct Widget;

impl Widget {
    /// Build the control for a descriptor and bind it to that descriptor.
    pub fn from_argument(argument: &SharedArgument) -> AppResult<WidgetHandle> {
        let control = {
            let arg = argument.borrow();
            let default = arg.default();

            let control: Box<dyn Control> = if let Some(choices) = arg.choices() {
                Box::new(DropDown::new(choices.to_vec(), default))
            } else if arg.is_flag_map() {
                Box::new(CheckBar::new(default))
            } else {
                match arg.kind() {
                    ArgKind::Boolean => Box::new(Checkbox::new(default)),
                    ArgKind::Integer => Box::new(NumericEntry::integer(default)),
                    ArgKind::Float => Box::new(NumericEntry::float(default)),
                    ArgKind::File => Box::new(PathSelect::file(default)),
                    ArgKind::Dir => Box::new(PathSelect::dir(default)),
                    ArgKind::DateTime => Box::new(DateTimeEdit::new(default, arg.magnitude())),
                    ArgKind::Date => Box::new(Calendar::new(default)),
                    ArgKind::String => match arg.magnitude() {
                        Some(magnitude) if magnitude > 1 => {
                            Box::new(TextEntry::multi_line(default, magnitude))
                        }
                        _ => Box::new(TextEntry::single_line(default)),
                    },
                    ArgKind::List(item) => Box::new(ListEditor::new(item.as_ref().clone(), default)),
                    ArgKind::Dict(value) => Box::new(Tree::new(value.as_ref().clone(), default)),
                    ArgKind::Path | ArgKind::Set(_) | ArgKind::Any => {
                        return Err(IoKitError::UnsupportedArgument {
                            name: arg.name().to_string(),
                            kind: arg.kind().to_string(),
                        })
                    }
                }
            };
            control
        };

        Ok(WidgetHandle::new(control).with_argument(argument.clone()))
    }
}

// =============================================================================
// WidgetHandle
// =============================================================================

/// A live input control, optionally bound to the descriptor it was built from.
pub struct WidgetHandle {
    control: Box<dyn Control>,
    argument: Option<SharedArgument>,
}

impl WidgetHandle {
    /// Wrap a control that is not bound to any descriptor.
    pub fn new(control: Box<dyn Control>) -> Self {
        Self {
            control,
            argument: None,
        }
    }

    /// Bind to a descriptor. The descriptor records which widget edits it.
    pub fn with_argument(mut self, argument: SharedArgument) -> Self {
        argument.borrow_mut().bind_widget(self.control.kind());
        self.argument = Some(argument);
        self
    }

    pub fn kind(&self) -> WidgetKind {
        self.control.kind()
    }

    /// The value currently entered, without touching the descriptor.
    pub fn state(&self) -> ArgValue {
        self.control.state()
    }

    /// Show `value` in the control. The descriptor is untouched.
    pub fn set_state(&mut self, value: &ArgValue) {
        self.control.set_state(value);
    }

    /// Text in the control that does not parse as the argument's kind.
    pub fn problems(&self) -> Vec<String> {
        self.control.problems()
    }

    /// The bound descriptor, if any.
    pub fn argument(&self) -> Option<&SharedArgument> {
        self.argument.as_ref()
    }

    /// Push the current value into the bound descriptor's default slot and return it.
    pub fn commit(&self) -> ArgValue {
        let state = self.control.state();
        if let Some(argument) = &self.argument {
            argument.borrow_mut().set_default(state.clone());
        }
        state
    }

    /// Draw the control, with the descriptor's help text as tooltip.
    pub fn ui(&mut self, ui: &mut Ui) -> Response {
        let (id, info) = match &self.argument {
            Some(argument) => {
                let arg = argument.borrow();
                (arg.name().to_string(), arg.info().map(str::to_string))
            }
            None => (String::from("unbound"), None),
        };

        let response = ui.push_id(id, |ui| self.control.ui(ui)).inner;
        match info {
            Some(info) => response.on_hover_text(info),
            None => response,
        }
    }
}

impl fmt::Debug for WidgetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetHandle")
            .field("kind", &self.kind())
            .field("state", &self.state())
            .field(
                "argument",
                &self.argument.as_ref().map(|a| a.borrow().name().to_string()),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::argument::Argument;

    #[test]
    fn binding_records_widget_kind_on_argument() {
        let arg = Argument::new("verbose", ArgKind::Boolean).shared();
        let handle = Widget::from_argument(&arg).unwrap();
        assert_eq!(handle.kind(), WidgetKind::Checkbox);
        assert_eq!(arg.borrow().bound_widget(), Some(WidgetKind::Checkbox));
    }

    #[test]
    fn unset_boolean_defaults_to_false() {
        let arg = Argument::new("verbose", ArgKind::Boolean).shared();
        let handle = Widget::from_argument(&arg).unwrap();
        assert_eq!(handle.state(), ArgValue::Bool(false));
    }

    #[test]
    fn commit_pushes_state_into_default_slot() {
        let arg = Argument::new("count", ArgKind::Integer)
            .with_default(1i64)
            .shared();
        let mut handle = Widget::from_argument(&arg).unwrap();
        handle.set_state(&ArgValue::Int(5));
        assert_eq!(arg.borrow().default(), &ArgValue::Int(1));

        assert_eq!(handle.commit(), ArgValue::Int(5));
        assert_eq!(arg.borrow().default(), &ArgValue::Int(5));
    }

    #[test]
    fn unsupported_kind_names_the_argument() {
        let arg = Argument::new("anything", ArgKind::Any).shared();
        let err = Widget::from_argument(&arg).unwrap_err();
        match err {
            IoKitError::UnsupportedArgument { name, kind } => {
                assert_eq!(name, "anything");
                assert_eq!(kind, "any");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(arg.borrow().bound_widget(), None);
    }
}
