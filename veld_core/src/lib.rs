//! Core support types for the veld object model.
//!
//! This crate provides:
//! - The error taxonomy shared by every layer of the kernel (`ModelError`)
//! - String interning (`Interner`, `InternedString`)
//!
//! It is a leaf crate: everything else in the workspace depends on it.

pub mod error;
pub mod intern;

pub use error::{ModelError, ModelResult};
pub use intern::{InternedString, Interner};
