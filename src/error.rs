use core::fmt;
use std::{borrow::Cow, ops::Deref};

use ecow::EcoString;

/// An error that can occur during the conversion process.
///
/// Structural failures (`SchemaMismatch`, `InvariantViolation`) abort the
/// whole conversion; content-resolution failures never surface here, they
/// are logged and degraded at the call site.
#[derive(Clone)]
pub struct Error(Box<Repr>);

#[derive(Clone)]
enum Repr {
    /// A node kind the serializer has no handler and no default for.
    SchemaMismatch { type_name: EcoString },
    /// A structural invariant was broken by the input tree.
    InvariantViolation(Cow<'static, str>),
    /// Just a message.
    Msg(Cow<'static, str>),
}

impl Error {
    pub fn schema_mismatch(type_name: impl Into<EcoString>) -> Self {
        Error(Box::new(Repr::SchemaMismatch {
            type_name: type_name.into(),
        }))
    }

    pub fn invariant(msg: impl Into<Cow<'static, str>>) -> Self {
        Error(Box::new(Repr::InvariantViolation(msg.into())))
    }

    pub fn is_schema_mismatch(&self) -> bool {
        matches!(self.0.deref(), Repr::SchemaMismatch { .. })
    }

    pub fn is_invariant_violation(&self) -> bool {
        matches!(self.0.deref(), Repr::InvariantViolation(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.deref() {
            Repr::SchemaMismatch { type_name } => {
                write!(f, "node type `{type_name}` is not supported by the serializer")
            }
            Repr::InvariantViolation(s) => write!(f, "invariant violation: {s}"),
            Repr::Msg(s) => write!(f, "{s}"),
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        <Self as fmt::Display>::fmt(self, f)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error(Box::new(Repr::Msg(e.to_string().into())))
    }
}

impl From<fmt::Error> for Error {
    fn from(e: fmt::Error) -> Self {
        Error(Box::new(Repr::Msg(e.to_string().into())))
    }
}

impl From<&'static str> for Error {
    fn from(s: &'static str) -> Self {
        Error(Box::new(Repr::Msg(s.into())))
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error(Box::new(Repr::Msg(s.into())))
    }
}

impl From<Cow<'static, str>> for Error {
    fn from(s: Cow<'static, str>) -> Self {
        Error(Box::new(Repr::Msg(s)))
    }
}
