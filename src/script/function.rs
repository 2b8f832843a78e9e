//! Member classification and convention-preserving re-wrapping.
//!
//! A script class registers its members explicitly as a [`Member`], which names the
//! calling convention up front. [`FunctionRecord::classify`] reads that convention into
//! a [`CallKind`]; [`FunctionRecord::wrap`] takes a convention-agnostic replacement
//! ([`Universal`]) and hands back a member with the original convention, so callers
//! cannot tell a wrapped member from the original.

use super::profile::CallArgs;
use super::run::Run;
use crate::error::{AppResult, IoKitError};
use serde_json::Value as Json;
use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// How a member is bound when called.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// Receives the script object.
    Instance,
    /// Receives nothing implicit.
    Static,
    /// Receives the owning class.
    Class,
    /// Not callable, or of a convention nothing knows how to wrap.
    Unknown,
}

impl CallKind {
    /// Instance and class members receive an implicit first argument.
    pub fn is_bound(self) -> bool {
        matches!(self, CallKind::Instance | CallKind::Class)
    }
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallKind::Instance => "instance",
            CallKind::Static => "static",
            CallKind::Class => "class",
            CallKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Static facts about the class a member belongs to, passed to class members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassInfo {
    /// Simple name, e.g. `Inner`.
    pub name: String,
    /// Path from the script class, e.g. `Pipeline.Inner`.
    pub qualified_name: String,
    /// Name used for the log directory.
    pub run_name: String,
    /// Class doc string, if one was given.
    pub doc: Option<String>,
}

/// Body of an instance member.
pub type InstanceFn<S> = Rc<dyn Fn(&mut S, &mut Run<S>, &CallArgs) -> anyhow::Result<Json>>;
/// Body of a static member. No receiver.
pub type StaticFn<S> = Rc<dyn Fn(&mut Run<S>, &CallArgs) -> anyhow::Result<Json>>;
/// Body of a class member, bound to the class metadata.
pub type ClassFn<S> = Rc<dyn Fn(&ClassInfo, &mut Run<S>, &CallArgs) -> anyhow::Result<Json>>;

/// A convention-agnostic callable. The receiver says what was bound.
pub type Universal<S> =
    Rc<dyn Fn(Receiver<'_, S>, &mut Run<S>, &CallArgs) -> anyhow::Result<Json>>;

/// A registered class member.
pub enum Member<S> {
    /// Called on the script object.
    Function(InstanceFn<S>),
    /// Called without a receiver.
    Static(StaticFn<S>),
    /// Called on the class.
    Class(ClassFn<S>),
    /// A value that is not a function of any known convention.
    Other(Box<dyn Any>),
}

impl<S: 'static> Member<S> {
    /// An instance member.
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&mut S, &mut Run<S>, &CallArgs) -> anyhow::Result<Json> + 'static,
    {
        Member::Function(Rc::new(f))
    }

    /// A static member.
    pub fn static_fn<F>(f: F) -> Self
    where
        F: Fn(&mut Run<S>, &CallArgs) -> anyhow::Result<Json> + 'static,
    {
        Member::Static(Rc::new(f))
    }

    /// A class member.
    pub fn class_fn<F>(f: F) -> Self
    where
        F: Fn(&ClassInfo, &mut Run<S>, &CallArgs) -> anyhow::Result<Json> + 'static,
    {
        Member::Class(Rc::new(f))
    }

    /// Anything else. Building a class that holds one fails.
    pub fn other(value: impl Any) -> Self {
        Member::Other(Box::new(value))
    }

    /// The calling convention of this member.
    pub fn kind(&self) -> CallKind {
        match self {
            Member::Function(_) => CallKind::Instance,
            Member::Static(_) => CallKind::Static,
            Member::Class(_) => CallKind::Class,
            Member::Other(_) => CallKind::Unknown,
        }
    }

    /// Erase the calling convention. `None` for [`Member::Other`].
    pub(crate) fn into_universal(self, name: &str) -> Option<Universal<S>> {
        let name = name.to_string();
        let erased = match self {
            Member::Function(f) => universal(move |receiver, run, args| match receiver {
                Receiver::Instance(script) => f(script, run, args),
                _ => Err(IoKitError::MissingReceiver(name.clone()).into()),
            }),
            Member::Static(f) => universal(move |_, run, args| f(run, args)),
            Member::Class(f) => universal(move |receiver, run, args| match receiver {
                Receiver::Class(info) => f(info, run, args),
                _ => Err(IoKitError::MissingReceiver(name.clone()).into()),
            }),
            Member::Other(_) => return None,
        };
        Some(erased)
    }
}

/// Box a closure as a [`Universal`].
pub fn universal<S, F>(f: F) -> Universal<S>
where
    F: Fn(Receiver<'_, S>, &mut Run<S>, &CallArgs) -> anyhow::Result<Json> + 'static,
{
    Rc::new(f)
}

impl<S> fmt::Debug for Member<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Member::Function(_) => "Function",
            Member::Static(_) => "Static",
            Member::Class(_) => "Class",
            Member::Other(_) => "Other",
        };
        write!(f, "Member::{kind}")
    }
}

/// What a member was bound to at call time.
pub enum Receiver<'a, S> {
    /// Bound to the script object.
    Instance(&'a mut S),
    /// Bound to a class.
    Class(&'a ClassInfo),
    /// Bound to nothing.
    Static,
}

impl<S> Receiver<'_, S> {
    /// Borrow again for a nested call, keeping this receiver usable afterwards.
    pub fn reborrow(&mut self) -> Receiver<'_, S> {
        match self {
            Receiver::Instance(script) => Receiver::Instance(&mut **script),
            Receiver::Class(info) => Receiver::Class(*info),
            Receiver::Static => Receiver::Static,
        }
    }

    /// The script object, when bound to one.
    pub fn instance(&self) -> Option<&S> {
        match self {
            Receiver::Instance(script) => Some(&**script),
            _ => None,
        }
    }
}

/// Metadata recorded for every member when its class is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionRecord {
    /// Qualified name of the owning class.
    pub owner: String,
    /// `Owner.member`
    pub name: String,
    /// Calling convention found when the class was built.
    pub kind: CallKind,
    /// Doc string given with `member_doc`.
    pub doc: Option<String>,
}

impl FunctionRecord {
    /// Record the calling convention of `member` as found on `owner`.
    pub fn classify<S: 'static>(owner: &str, member_name: &str, member: &Member<S>) -> Self {
        let simple_owner = owner.rsplit('.').next().unwrap_or(owner);
        Self {
            owner: owner.to_string(),
            name: format!("{simple_owner}.{member_name}"),
            kind: member.kind(),
            doc: None,
        }
    }

    /// Attach a doc string.
    pub fn with_doc(mut self, doc: Option<String>) -> Self {
        self.doc = doc;
        self
    }

    /// The member name without its owner.
    pub fn member_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    /// Give `replacement` this record's calling convention.
    ///
    /// Fails with [`IoKitError::UnclassifiableMember`] when the kind is unknown.
    pub fn wrap<S: 'static>(&self, replacement: Universal<S>) -> AppResult<Member<S>> {
        let member = match self.kind {
            CallKind::Instance => Member::function(move |script, run, args| {
                replacement(Receiver::Instance(script), run, args)
            }),
            CallKind::Static => {
                Member::static_fn(move |run, args| replacement(Receiver::Static, run, args))
            }
            CallKind::Class => Member::class_fn(move |info, run, args| {
                replacement(Receiver::Class(info), run, args)
            }),
            CallKind::Unknown => return Err(self.unclassifiable()),
        };
        Ok(member)
    }

    pub(crate) fn unclassifiable(&self) -> IoKitError {
        IoKitError::UnclassifiableMember {
            owner: self.owner.clone(),
            member: self.member_name().to_string(),
        }
    }
}

impl fmt::Display for FunctionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, serde::Serialize)]
    struct Dummy;

    impl crate::script::Script for Dummy {}

    #[test]
    fn classification_follows_registration() {
        let instance = Member::<Dummy>::function(|_, _, _| Ok(Json::Null));
        let stat = Member::<Dummy>::static_fn(|_, _| Ok(Json::Null));
        let class = Member::<Dummy>::class_fn(|_, _, _| Ok(Json::Null));
        let other = Member::<Dummy>::other(42u8);

        assert_eq!(FunctionRecord::classify("Pipeline", "run", &instance).kind, CallKind::Instance);
        assert_eq!(FunctionRecord::classify("Pipeline", "make", &stat).kind, CallKind::Static);
        assert_eq!(FunctionRecord::classify("Pipeline", "info", &class).kind, CallKind::Class);
        assert_eq!(FunctionRecord::classify("Pipeline", "limit", &other).kind, CallKind::Unknown);
    }

    #[test]
    fn record_names_are_qualified_by_simple_owner() {
        let member = Member::<Dummy>::static_fn(|_, _| Ok(Json::Null));
        let record = FunctionRecord::classify("Pipeline.Inner", "helper", &member);
        assert_eq!(record.name, "Inner.helper");
        assert_eq!(record.owner, "Pipeline.Inner");
        assert_eq!(record.member_name(), "helper");
    }

    #[test]
    fn wrapping_preserves_convention() {
        let replacement: Universal<Dummy> = universal(|_, _, _| Ok(Json::Null));
        for member in [
            Member::<Dummy>::function(|_, _, _| Ok(Json::Null)),
            Member::<Dummy>::static_fn(|_, _| Ok(Json::Null)),
            Member::<Dummy>::class_fn(|_, _, _| Ok(Json::Null)),
        ] {
            let record = FunctionRecord::classify("Pipeline", "m", &member);
            let wrapped = record.wrap(Rc::clone(&replacement)).unwrap();
            assert_eq!(wrapped.kind(), member.kind());
        }
    }

    #[test]
    fn wrapping_unknown_member_fails_with_names() {
        let record = FunctionRecord::classify("Pipeline", "limit", &Member::<Dummy>::other(1));
        let replacement: Universal<Dummy> = universal(|_, _, _| Ok(Json::Null));
        match record.wrap(replacement) {
            Err(IoKitError::UnclassifiableMember { owner, member }) => {
                assert_eq!(owner, "Pipeline");
                assert_eq!(member, "limit");
            }
            other => panic!("unexpected: {:?}", other.map(|m| m.kind())),
        }
    }

    #[test]
    fn bound_kinds() {
        assert!(CallKind::Instance.is_bound());
        assert!(CallKind::Class.is_bound());
        assert!(!CallKind::Static.is_bound());
        assert!(!CallKind::Unknown.is_bound());
    }
}
