//! Serialization contexts: named identity scopes.
//!
//! A context owns the shared tables and objects created under it, giving
//! them a stable home for later cross-module reference resolution. The
//! registry is process-wide and append-mostly; the reserved core context
//! is created once at bootstrap and lives for the process lifetime.
//! Persisted context contents are out of scope — only the
//! name-registration contract lives here.

use crate::object::ObjectHandle;
use crate::object::stable::SharedTable;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use veld_core::{ModelError, ModelResult};

/// Reserved name of the context holding the bootstrap meta-objects.
pub const CORE_CONTEXT_NAME: &str = "__VELD_CORE__";

/// A named container of shared tables and objects.
pub struct SerializationContext {
    name: String,
    stables: RwLock<Vec<Arc<SharedTable>>>,
    objects: RwLock<Vec<ObjectHandle>>,
}

impl std::fmt::Debug for SerializationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerializationContext")
            .field("name", &self.name)
            .finish()
    }
}

impl SerializationContext {
    fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_owned(),
            stables: RwLock::new(Vec::new()),
            objects: RwLock::new(Vec::new()),
        })
    }

    /// The context's registered name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record a shared table's identity in this context.
    pub fn add_stable(&self, stable: Arc<SharedTable>) {
        self.stables.write().push(stable);
    }

    /// Record an object's identity in this context.
    pub fn add_object(&self, object: ObjectHandle) {
        self.objects.write().push(object);
    }

    /// Snapshot of the owned shared tables.
    pub fn stables(&self) -> Vec<Arc<SharedTable>> {
        self.stables.read().clone()
    }

    /// Snapshot of the owned objects.
    pub fn objects(&self) -> Vec<ObjectHandle> {
        self.objects.read().clone()
    }

    /// Number of owned shared tables.
    pub fn stable_count(&self) -> usize {
        self.stables.read().len()
    }

    /// Number of owned objects.
    pub fn object_count(&self) -> usize {
        self.objects.read().len()
    }
}

/// Process-wide name → context table.
pub struct ScRegistry {
    contexts: DashMap<String, Arc<SerializationContext>>,
}

impl ScRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            contexts: DashMap::new(),
        }
    }

    /// Register a fresh context under `name`.
    pub fn register(&self, name: &str) -> ModelResult<Arc<SerializationContext>> {
        use dashmap::mapref::entry::Entry;
        match self.contexts.entry(name.to_owned()) {
            Entry::Occupied(_) => Err(ModelError::DuplicateContext {
                name: name.to_owned(),
            }),
            Entry::Vacant(slot) => {
                let context = SerializationContext::new(name);
                slot.insert(context.clone());
                Ok(context)
            }
        }
    }

    /// Look up a context by name.
    pub fn lookup(&self, name: &str) -> ModelResult<Arc<SerializationContext>> {
        self.contexts
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ModelError::UnknownContext {
                name: name.to_owned(),
            })
    }

    /// Check if a name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.contexts.contains_key(name)
    }

    /// Number of registered contexts.
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

impl Default for ScRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let registry = ScRegistry::new();
        let context = registry.register("unit").unwrap();
        assert_eq!(context.name(), "unit");
        assert!(registry.contains("unit"));

        let found = registry.lookup("unit").unwrap();
        assert!(Arc::ptr_eq(&context, &found));
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let registry = ScRegistry::new();
        registry.register("unit").unwrap();
        let err = registry.register("unit").unwrap_err();
        assert_eq!(err, ModelError::DuplicateContext { name: "unit".into() });
    }

    #[test]
    fn test_unknown_lookup_fails() {
        let registry = ScRegistry::new();
        let err = registry.lookup("ghost").unwrap_err();
        assert_eq!(err, ModelError::UnknownContext { name: "ghost".into() });
    }
}
