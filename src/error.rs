//! Error kinds surfaced by tables, views and the expression compiler.

use crate::value::DataType;
use thiserror::Error;

/// Failure outcomes for every fallible operation in the crate.
///
/// Constructors surface these directly; mutators log them through the
/// [`logging`](crate::logging) sink and report a sentinel result instead.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad name, duplicate column, arity mismatch, unusable source.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A value's tag does not match the type required at its destination.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: DataType, found: DataType },

    /// Column, function overload or row is absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// The formula text failed lexing or the grammar check.
    #[error("parse error: {0}")]
    Parse(String),

    /// A column reference or function overload could not be resolved.
    #[error("unresolved reference: {0}")]
    Reference(String),

    /// Snapshot or CSV read/write failure.
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    /// A wrapped foreign failure.
    #[error("unknown failure: {0}")]
    Unknown(String),
}

impl Error {
    pub(crate) fn mismatch(expected: DataType, found: DataType) -> Self {
        Error::TypeMismatch { expected, found }
    }
}
