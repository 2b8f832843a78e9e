//! Descriptor to widget mapping, exercised through the public API.

use chrono::NaiveDate;
use iokit::argument::{ArgKind, ArgValue, Argument, ArgumentSet};
use iokit::gui::widget::{Widget, WidgetKind};
use iokit::IoKitError;
use std::collections::BTreeMap;
use std::path::PathBuf;

fn dict(entries: &[(&str, ArgValue)]) -> ArgValue {
    ArgValue::Dict(
        entries
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect::<BTreeMap<_, _>>(),
    )
}

fn samples() -> Vec<(Argument, WidgetKind)> {
    let started = NaiveDate::from_ymd_opt(2024, 5, 17)
        .and_then(|d| d.and_hms_opt(8, 30, 0))
        .unwrap();
    let precise = NaiveDate::from_ymd_opt(2024, 5, 17)
        .and_then(|d| d.and_hms_milli_opt(10, 0, 0, 500))
        .unwrap();

    vec![
        (Argument::new("dry_run", ArgKind::Boolean).with_default(true), WidgetKind::Checkbox),
        (Argument::new("retries", ArgKind::Integer).with_default(3i64), WidgetKind::IntEntry),
        (Argument::new("ratio", ArgKind::Float).with_default(2.5), WidgetKind::FloatEntry),
        (
            Argument::new("input", ArgKind::File).with_default(PathBuf::from("/tmp/input.csv")),
            WidgetKind::FileSelect,
        ),
        (
            Argument::new("output", ArgKind::Dir).with_default(PathBuf::from("/tmp")),
            WidgetKind::DirSelect,
        ),
        (Argument::new("started", ArgKind::DateTime).with_default(started), WidgetKind::DateTimeEdit),
        (Argument::new("day", ArgKind::Date).with_default(started.date()), WidgetKind::Calendar),
        (Argument::new("label", ArgKind::String).with_default("nightly"), WidgetKind::Entry),
        (
            Argument::new("notes", ArgKind::String)
                .with_default("line one\nline two")
                .with_magnitude(4),
            WidgetKind::Text,
        ),
        (
            Argument::new("hosts", ArgKind::List(Box::new(ArgKind::String)))
                .with_default(ArgValue::List(vec!["alpha".into(), "beta".into()])),
            WidgetKind::List,
        ),
        (
            Argument::new("tags", ArgKind::List(Box::new(ArgKind::Any)))
                .with_default(ArgValue::List(vec!["42".into(), "true".into(), ArgValue::Null])),
            WidgetKind::List,
        ),
        (
            Argument::new("checkpoints", ArgKind::List(Box::new(ArgKind::DateTime)))
                .with_default(ArgValue::List(vec![started.into(), precise.into()])),
            WidgetKind::List,
        ),
        (
            Argument::new("limits", ArgKind::Dict(Box::new(ArgKind::Integer)))
                .with_default(dict(&[("cpu", ArgValue::Int(4)), ("memory", ArgValue::Int(512))])),
            WidgetKind::Tree,
        ),
        (
            Argument::new("stages", ArgKind::Dict(Box::new(ArgKind::Boolean)))
                .with_default(dict(&[("load", true.into()), ("clean", false.into())])),
            WidgetKind::CheckBar,
        ),
        (
            Argument::new("mode", ArgKind::String)
                .with_choices(["fast", "safe"])
                .with_default("safe"),
            WidgetKind::DropDown,
        ),
    ]
}

#[test]
fn every_widget_starts_at_the_default() {
    for (argument, expected) in samples() {
        let default = argument.default().clone();
        let name = argument.name().to_string();
        let shared = argument.shared();

        let handle = Widget::from_argument(&shared).unwrap();
        assert_eq!(handle.kind(), expected, "widget for {name}");
        assert_eq!(handle.state(), default, "state of {name}");
        assert_eq!(shared.borrow().bound_widget(), Some(expected));
    }
}

#[test]
fn null_defaults_stay_null() {
    let kinds = [
        ArgKind::Integer,
        ArgKind::Float,
        ArgKind::String,
        ArgKind::File,
        ArgKind::Dir,
        ArgKind::Date,
        ArgKind::DateTime,
        ArgKind::List(Box::new(ArgKind::Integer)),
        ArgKind::Dict(Box::new(ArgKind::Float)),
        ArgKind::Dict(Box::new(ArgKind::Boolean)),
    ];

    for kind in kinds {
        let label = kind.to_string();
        let handle = Widget::from_argument(&Argument::new("unset", kind).shared()).unwrap();
        assert_eq!(handle.state(), ArgValue::Null, "state for {label}");
    }
}

#[test]
fn choices_win_over_declared_kind() {
    let argument = Argument::new("level", ArgKind::Integer)
        .with_choices([1i64, 2, 3])
        .with_default(2i64)
        .shared();
    let handle = Widget::from_argument(&argument).unwrap();
    assert_eq!(handle.kind(), WidgetKind::DropDown);
    assert!(handle.kind().is_selection());
    assert_eq!(handle.state(), ArgValue::Int(2));
}

#[test]
fn string_magnitude_picks_single_or_multi_line() {
    let single = Argument::new("name", ArgKind::String).with_magnitude(1).shared();
    let multi = Argument::new("name", ArgKind::String).with_magnitude(2).shared();

    assert_eq!(Widget::from_argument(&single).unwrap().kind(), WidgetKind::Entry);
    assert_eq!(Widget::from_argument(&multi).unwrap().kind(), WidgetKind::Text);
}

#[test]
fn kinds_without_a_widget_are_rejected() {
    for kind in [ArgKind::Path, ArgKind::Set(Box::new(ArgKind::String)), ArgKind::Any] {
        let argument = Argument::new("opaque", kind).shared();
        let err = Widget::from_argument(&argument).unwrap_err();
        assert!(matches!(err, IoKitError::UnsupportedArgument { ref name, .. } if name == "opaque"));
        assert_eq!(argument.borrow().bound_widget(), None);
    }
}

#[test]
fn commit_pushes_edits_into_the_descriptor() {
    let argument = Argument::new("retries", ArgKind::Integer)
        .with_default(3i64)
        .shared();
    let mut handle = Widget::from_argument(&argument).unwrap();

    handle.set_state(&ArgValue::Int(9));
    assert_eq!(argument.borrow().default(), &ArgValue::Int(3));

    assert_eq!(handle.commit(), ArgValue::Int(9));
    assert_eq!(argument.borrow().default(), &ArgValue::Int(9));
}

#[test]
fn schema_arguments_map_to_widgets() {
    let schema = r#"
        [[argument]]
        name = "retries"
        kind = "integer"
        default = 3

        [[argument]]
        name = "stages"
        kind = { dict = "boolean" }
        default = { load = true, clean = false }

        [[argument]]
        name = "notes"
        kind = "string"
        magnitude = 3
    "#;

    let kinds: Vec<_> = ArgumentSet::from_toml_str(schema)
        .unwrap()
        .build()
        .unwrap()
        .into_iter()
        .map(|argument| Widget::from_argument(&argument.shared()).unwrap().kind())
        .collect();

    assert_eq!(kinds, vec![WidgetKind::IntEntry, WidgetKind::CheckBar, WidgetKind::Text]);
}

#[test]
fn every_widget_renders_headless() {
    let mut handles: Vec<_> = samples()
        .into_iter()
        .map(|(argument, _)| Widget::from_argument(&argument.shared()).unwrap())
        .collect();

    let ctx = egui::Context::default();
    let _ = ctx.run(egui::RawInput::default(), |ctx| {
        egui::CentralPanel::default().show(ctx, |ui| {
            for handle in &mut handles {
                handle.ui(ui);
            }
        });
    });

    let flags = handles
        .iter()
        .find(|handle| handle.kind() == WidgetKind::CheckBar)
        .map(|handle| handle.state());
    assert_eq!(
        flags,
        Some(dict(&[("clean", false.into()), ("load", true.into())]))
    );
}

#[test]
fn demo_schema_builds_a_form() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/backup_form.toml");
    let arguments: Vec<_> = ArgumentSet::load(&path)
        .unwrap()
        .build()
        .unwrap()
        .into_iter()
        .map(Argument::shared)
        .collect();

    let form = iokit::gui::ArgsForm::new("Backup", &arguments).unwrap();
    let kinds: Vec<_> = form.handles().iter().map(|handle| handle.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            WidgetKind::DirSelect,
            WidgetKind::Entry,
            WidgetKind::DropDown,
            WidgetKind::IntEntry,
            WidgetKind::CheckBar,
            WidgetKind::DateTimeEdit,
            WidgetKind::Text,
        ]
    );
    assert!(arguments[0].borrow().is_required());
    assert!(!arguments[5].borrow().is_required());
}
