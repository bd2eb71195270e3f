//! Meta-object protocol kernel for the veld runtime.
//!
//! This crate provides:
//! - Object handles binding opaque, representation-owned bodies to their
//!   per-type shared table
//! - The shared table descriptor (representation + meta-object + dispatch
//!   caches + overridable dispatch strategies)
//! - The default method dispatch and type check engines
//! - The KnowHow bootstrap that closes the meta-object fixed point
//! - Process-wide representation and serialization context registries,
//!   owned by the top-level `Runtime` context
//!
//! Every method call and every type compatibility query in the runtime
//! flows through the two dispatch engines defined here.

#![deny(unsafe_op_in_unsafe_fn)]

pub mod config;
pub mod object;
pub mod runtime;
pub mod sc;
pub mod value;

// Re-export commonly used items
pub use config::RuntimeConfig;
pub use object::dispatch::{NO_HINT, default_find_method, default_type_check};
pub use object::knowhow::{
    KnowHowAttributeBody, KnowHowAttributeRepr, KnowHowBody, KnowHowRepr, PlainAttrsBody,
    PlainAttrsRepr,
};
pub use object::repr::{ReprBody, ReprRegistry, Representation};
pub use object::stable::{
    FindMethodFn, MethodCache, MethodDispatch, SharedTable, StableFlags, TypeCheckDispatch,
    TypeCheckFn,
};
pub use object::{HandleTag, ObjectHandle};
pub use runtime::{Runtime, WellKnownNames};
pub use sc::{CORE_CONTEXT_NAME, ScRegistry, SerializationContext};
pub use value::{NativeMethod, Value};

// Re-export the error taxonomy and interning from veld_core for convenience
pub use veld_core::{InternedString, ModelError, ModelResult};

// Re-export the Trace/Tracer seam from veld_gc for convenience
pub use veld_gc::{Trace, Tracer};
