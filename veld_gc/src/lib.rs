//! Garbage-collection seam for the veld object model.
//!
//! The kernel does not define a collector. It defines the two contracts a
//! host collector plugs into:
//! - `Trace`/`Tracer`: how an object reports the references it owns
//! - `RootSet`: the registry of wrapped handles the collector starts from
//!
//! Object bodies are opaque to the collector; tracing always goes through
//! the representation bound to the object's shared table.

pub mod roots;
pub mod trace;

pub use roots::RootSet;
pub use trace::{CountingTracer, NullTracer, Trace, Tracer};
