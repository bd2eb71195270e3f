//! Error taxonomy for the object model kernel.
//!
//! Registry misuse (`DuplicateRepresentation`, `UnknownRepresentation`,
//! `DuplicateContext`, `UnknownContext`) is recoverable and reported to the
//! caller. A malformed meta-object (`MethodResolution`, `TypeCheck`) is a
//! configuration error surfaced as a hard failure at the dispatch site.
//! `NoSuchMethod` is not a kernel error at all: it is the *outcome* a
//! meta-object produces for an unresolvable name, and the dispatch engines
//! propagate it unchanged. Bootstrap failure is fatal — the runtime cannot
//! start without a closed meta-object loop.

use std::fmt;

/// Errors produced by the object model kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// A representation name was registered twice.
    DuplicateRepresentation { name: String },

    /// A representation name was looked up but never registered.
    UnknownRepresentation { name: String },

    /// A serialization context name was registered twice.
    DuplicateContext { name: String },

    /// A serialization context name was looked up but never registered.
    UnknownContext { name: String },

    /// The meta-object offers no `find_method` capability.
    MethodResolution { message: String },

    /// The meta-object offers no `type_check` capability.
    TypeCheck { message: String },

    /// The meta-object resolved a lookup to "no such method".
    NoSuchMethod { name: String },

    /// A resolved value that is not invocable was called.
    NotInvocable { type_name: &'static str },

    /// A native method was invoked with malformed arguments.
    Argument { message: String },

    /// A step of the one-time bootstrap failed; the runtime cannot start.
    Bootstrap { message: String },
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateRepresentation { name } => {
                write!(f, "representation '{}' is already registered", name)
            }
            Self::UnknownRepresentation { name } => {
                write!(f, "no representation registered under '{}'", name)
            }
            Self::DuplicateContext { name } => {
                write!(f, "serialization context '{}' is already registered", name)
            }
            Self::UnknownContext { name } => {
                write!(f, "no serialization context registered under '{}'", name)
            }
            Self::MethodResolution { message } => {
                write!(f, "method resolution failed: {}", message)
            }
            Self::TypeCheck { message } => write!(f, "type check failed: {}", message),
            Self::NoSuchMethod { name } => write!(f, "no such method '{}'", name),
            Self::NotInvocable { type_name } => {
                write!(f, "'{}' value is not invocable", type_name)
            }
            Self::Argument { message } => write!(f, "argument error: {}", message),
            Self::Bootstrap { message } => write!(f, "bootstrap failed: {}", message),
        }
    }
}

impl std::error::Error for ModelError {}

/// Result type for kernel operations.
pub type ModelResult<T> = Result<T, ModelError>;
