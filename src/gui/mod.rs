//! The eframe/egui front end for argument descriptors.
//!
//! [`widget::Widget::from_argument`] maps one descriptor to one control. [`ArgsForm`]
//! lays a whole argument set out as a labelled grid with Proceed/Cancel buttons, and
//! [`collect_arguments`] runs that form in a native window and hands back the values
//! the user confirmed.
pub mod controls;
pub mod widget;

use crate::argument::SharedArgument;
use crate::error::{AppResult, IoKitError};
use eframe::egui;
use serde_json::{Map, Value as Json};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, warn};

use self::widget::{Widget, WidgetHandle};

/// What the user decided on the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormDecision {
    Proceed,
    Cancel,
}

/// A form with one bound control per argument.
pub struct ArgsForm {
    title: String,
    handles: Vec<WidgetHandle>,
    decision: Option<FormDecision>,
    problems: Vec<String>,
    result: Rc<RefCell<Option<Map<String, Json>>>>,
}

impl ArgsForm {
    /// Build a control for every argument. Fails on the first argument no control can edit.
    pub fn new(title: impl Into<String>, arguments: &[SharedArgument]) -> AppResult<Self> {
        let handles = arguments
            .iter()
            .map(Widget::from_argument)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Self {
            title: title.into(),
            handles,
            decision: None,
            problems: Vec::new(),
            result: Rc::new(RefCell::new(None)),
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// One handle per argument, in form order.
    pub fn handles(&self) -> &[WidgetHandle] {
        &self.handles
    }

    pub fn handles_mut(&mut self) -> &mut [WidgetHandle] {
        &mut self.handles
    }

    /// `None` while the form is open.
    pub fn decision(&self) -> Option<FormDecision> {
        self.decision
    }

    /// Problems found by the last refused Proceed.
    pub fn problems(&self) -> &[String] {
        &self.problems
    }

    /// Everything that blocks proceeding: text that does not parse, and arguments
    /// that do not accept null but have no value.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for handle in &self.handles {
            let (name, nullable) = match handle.argument() {
                Some(arg) => {
                    let arg = arg.borrow();
                    (arg.name().to_string(), arg.is_nullable())
                }
                None => (String::from("unbound"), true),
            };

            let unparsed = handle.problems();
            if unparsed.is_empty() && !nullable && handle.state().is_null() {
                problems.push(format!("{name}: a value is required"));
            }
            problems.extend(unparsed.into_iter().map(|problem| format!("{name}: {problem}")));
        }
        problems
    }

    /// Commit every control into its argument and return the values by argument name.
    pub fn commit_all(&self) -> Map<String, Json> {
        self.handles
            .iter()
            .filter_map(|handle| {
                let value = handle.commit();
                handle
                    .argument()
                    .map(|arg| (arg.borrow().name().to_string(), value.to_json()))
            })
            .collect()
    }

    /// Draw the form. Returns the decision on the frame a button was clicked.
    pub fn ui(&mut self, ui: &mut egui::Ui) -> Option<FormDecision> {
        egui::ScrollArea::vertical().show(ui, |ui| {
            egui::Grid::new("arguments")
                .num_columns(2)
                .striped(true)
                .spacing([12.0, 6.0])
                .show(ui, |ui| {
                    for handle in &mut self.handles {
                        let label = handle
                            .argument()
                            .map(|arg| {
                                let arg = arg.borrow();
                                if arg.is_required() {
                                    format!("{} *", arg.name())
                                } else {
                                    arg.name().to_string()
                                }
                            })
                            .unwrap_or_default();
                        ui.label(label);
                        handle.ui(ui);
                        ui.end_row();
                    }
                });
        });

        ui.separator();

        for problem in &self.problems {
            ui.colored_label(egui::Color32::from_rgb(255, 100, 100), problem);
        }

        let mut clicked = None;
        ui.horizontal(|ui| {
            if ui.button("Proceed").clicked() {
                clicked = Some(FormDecision::Proceed);
            }
            if ui.button("Cancel").clicked() {
                clicked = Some(FormDecision::Cancel);
            }
        });

        clicked.filter(|decision| self.decide(*decision).is_ok())
    }

    /// Record a decision. Proceeding validates first and commits every control only
    /// when nothing blocks it; otherwise the form stays open with the problems listed.
    pub fn decide(&mut self, decision: FormDecision) -> AppResult<()> {
        if decision == FormDecision::Proceed {
            let problems = self.validate();
            if !problems.is_empty() {
                warn!(form = %self.title, count = problems.len(), "Cannot proceed");
                self.problems = problems.clone();
                return Err(IoKitError::IncompleteForm { problems });
            }
            self.problems.clear();
            let values = self.commit_all();
            debug!(form = %self.title, count = values.len(), "Arguments committed");
            *self.result.borrow_mut() = Some(values);
        }
        self.decision = Some(decision);
        Ok(())
    }

    fn result_slot(&self) -> Rc<RefCell<Option<Map<String, Json>>>> {
        Rc::clone(&self.result)
    }
}

impl eframe::App for ArgsForm {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("title_panel").show(ctx, |ui| {
            ui.heading(self.title.clone());
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            if self.ui(ui).is_some() {
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
        });
    }
}

/// Show the arguments in a native window and block until the user closes it.
///
/// Returns `None` when the window was cancelled or closed without proceeding.
pub fn collect_arguments(
    title: &str,
    arguments: &[SharedArgument],
) -> AppResult<Option<Map<String, Json>>> {
    let form = ArgsForm::new(title, arguments)?;
    let result = form.result_slot();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([480.0, 360.0]),
        ..Default::default()
    };

    eframe::run_native(title, options, Box::new(|_cc| Ok(Box::new(form))))
        .map_err(|e| IoKitError::Gui(e.to_string()))?;

    let values = result.borrow_mut().take();
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::argument::{ArgKind, ArgValue, Argument};

    fn arguments() -> Vec<SharedArgument> {
        vec![
            Argument::new("name", ArgKind::String)
                .with_default("sample")
                .shared(),
            Argument::new("repeat", ArgKind::Integer)
                .with_default(3i64)
                .shared(),
        ]
    }

    #[test]
    fn proceed_commits_values_by_name() {
        let args = arguments();
        let mut form = ArgsForm::new("Test", &args).unwrap();
        form.handles_mut()[1].set_state(&ArgValue::Int(7));
        form.decide(FormDecision::Proceed).unwrap();

        let values = form.result_slot().borrow().clone().unwrap();
        assert_eq!(values["name"], Json::from("sample"));
        assert_eq!(values["repeat"], Json::from(7));
        assert_eq!(args[1].borrow().default(), &ArgValue::Int(7));
    }

    #[test]
    fn cancel_leaves_arguments_untouched() {
        let args = arguments();
        let mut form = ArgsForm::new("Test", &args).unwrap();
        form.handles_mut()[1].set_state(&ArgValue::Int(7));
        form.decide(FormDecision::Cancel).unwrap();

        assert!(form.result_slot().borrow().is_none());
        assert_eq!(form.decision(), Some(FormDecision::Cancel));
        assert_eq!(args[1].borrow().default(), &ArgValue::Int(3));
    }

    #[test]
    fn form_renders_headless() {
        let args = arguments();
        let mut form = ArgsForm::new("Test", &args).unwrap();
        let ctx = egui::Context::default();
        let mut decision = None;
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| {
                decision = form.ui(ui);
            });
        });
        assert_eq!(decision, None);
        assert_eq!(form.handles().len(), 2);
    }

    #[test]
    fn proceed_is_refused_while_arguments_are_missing_or_unparsed() {
        let args = vec![
            Argument::new("retries", ArgKind::Integer).shared(),
            Argument::new("ratio", ArgKind::Float).with_default(0.5).shared(),
            Argument::new("note", ArgKind::String).nullable().shared(),
        ];
        let mut form = ArgsForm::new("Test", &args).unwrap();
        form.handles_mut()[1].set_state(&ArgValue::Str("half".into()));

        let err = form.decide(FormDecision::Proceed).unwrap_err();
        match err {
            IoKitError::IncompleteForm { problems } => assert_eq!(
                problems,
                vec![
                    "retries: a value is required".to_string(),
                    "ratio: 'half' is not a valid float".to_string(),
                ]
            ),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(form.decision(), None);
        assert_eq!(form.problems().len(), 2);
        assert!(form.result_slot().borrow().is_none());
        assert_eq!(args[1].borrow().default(), &ArgValue::Float(0.5));

        form.handles_mut()[0].set_state(&ArgValue::Int(2));
        form.handles_mut()[1].set_state(&ArgValue::Float(0.25));
        form.decide(FormDecision::Proceed).unwrap();

        assert!(form.problems().is_empty());
        assert_eq!(form.decision(), Some(FormDecision::Proceed));
        let values = form.result_slot().borrow().clone().unwrap();
        assert_eq!(values["retries"], Json::from(2));
        assert_eq!(values["note"], Json::Null);
    }

    #[test]
    fn unsupported_argument_fails_form_construction() {
        let args = vec![Argument::new("blob", ArgKind::Any).shared()];
        assert!(matches!(
            ArgsForm::new("Test", &args),
            Err(IoKitError::UnsupportedArgument { .. })
        ));
    }
}
