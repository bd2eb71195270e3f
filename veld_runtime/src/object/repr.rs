//! Representations and the representation registry.
//!
//! A representation decides how instances of a type are laid out and
//! managed in memory. It owns no type information itself — it is selected
//! by name and bound per-type through a shared table. The kernel only
//! requires the fixed capability set below; concrete layouts live with
//! their implementors.

use crate::object::ObjectHandle;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::any::Any;
use std::sync::Arc;
use veld_core::{ModelError, ModelResult};
use veld_gc::Tracer;

/// Opaque, representation-owned instance memory.
pub type ReprBody = Box<dyn Any + Send + Sync>;

// =============================================================================
// Representation Capability Set
// =============================================================================

/// The fixed capability set every representation implements.
///
/// Representations are peers selected by name, not subclasses; a single
/// representation instance is created once and shared by every type that
/// selects it.
pub trait Representation: Send + Sync {
    /// The name this representation registers under.
    fn name(&self) -> &'static str;

    /// Allocate an uninitialized body.
    fn allocate(&self) -> ReprBody;

    /// Allocate and initialize a body, given the type's meta-object.
    fn instantiate(&self, how: &ObjectHandle) -> ModelResult<ReprBody>;

    /// Representation-level composition hook, run when a type is composed.
    ///
    /// Most representations need nothing here.
    fn compose(&self, _how: &ObjectHandle) -> ModelResult<()> {
        Ok(())
    }

    /// Report representation-owned references to the collector.
    fn trace(&self, body: &ReprBody, tracer: &mut dyn Tracer);

    /// Release resources owned by the body.
    fn release(&self, body: &mut ReprBody);
}

impl std::fmt::Debug for dyn Representation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Representation")
            .field("name", &self.name())
            .finish()
    }
}

// =============================================================================
// Representation Registry
// =============================================================================

struct ReprEntry {
    repr: Arc<dyn Representation>,
    /// The single wrapper handle carrying this representation's identity.
    handle: ObjectHandle,
}

/// Name-keyed registry of representation implementations.
///
/// Owned by the runtime's top-level context and populated during the
/// one-time initialization phase, before concurrent access begins.
pub struct ReprRegistry {
    entries: RwLock<FxHashMap<String, ReprEntry>>,
}

impl ReprRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(FxHashMap::default()),
        }
    }

    /// Register a representation under `name`, together with its wrapper
    /// handle.
    pub fn register(
        &self,
        name: &str,
        repr: Arc<dyn Representation>,
        handle: ObjectHandle,
    ) -> ModelResult<()> {
        let mut entries = self.entries.write();
        if entries.contains_key(name) {
            return Err(ModelError::DuplicateRepresentation {
                name: name.to_owned(),
            });
        }
        entries.insert(name.to_owned(), ReprEntry { repr, handle });
        Ok(())
    }

    /// Look up a representation by name.
    pub fn lookup(&self, name: &str) -> ModelResult<Arc<dyn Representation>> {
        self.entries
            .read()
            .get(name)
            .map(|entry| entry.repr.clone())
            .ok_or_else(|| ModelError::UnknownRepresentation {
                name: name.to_owned(),
            })
    }

    /// Look up a representation's wrapper handle by name.
    pub fn lookup_handle(&self, name: &str) -> ModelResult<ObjectHandle> {
        self.entries
            .read()
            .get(name)
            .map(|entry| entry.handle.clone())
            .ok_or_else(|| ModelError::UnknownRepresentation {
                name: name.to_owned(),
            })
    }

    /// Check if a name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    /// Number of registered representations.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ReprRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::knowhow::PlainAttrsRepr;

    fn entry() -> (Arc<dyn Representation>, ObjectHandle) {
        let repr: Arc<dyn Representation> = Arc::new(PlainAttrsRepr);
        let handle = ObjectHandle::new_repr(repr.clone());
        (repr, handle)
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = ReprRegistry::new();
        assert!(registry.is_empty());

        let (repr, handle) = entry();
        registry.register("plain_attrs", repr, handle).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("plain_attrs"));

        let found = registry.lookup("plain_attrs").unwrap();
        assert_eq!(found.name(), "plain_attrs");
        assert!(registry.lookup_handle("plain_attrs").is_ok());
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let registry = ReprRegistry::new();
        let (repr, handle) = entry();
        registry.register("p", repr.clone(), handle.clone()).unwrap();

        let err = registry.register("p", repr, handle).unwrap_err();
        assert_eq!(err, ModelError::DuplicateRepresentation { name: "p".into() });
    }

    #[test]
    fn test_unknown_lookup_fails() {
        let registry = ReprRegistry::new();
        let err = registry.lookup("ghost").unwrap_err();
        assert_eq!(err, ModelError::UnknownRepresentation { name: "ghost".into() });
    }
}
