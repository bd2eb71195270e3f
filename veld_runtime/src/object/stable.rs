//! Shared tables: the per-type descriptor.
//!
//! A shared table binds a representation to a meta-object and carries the
//! dispatch caches. One table exists per type; the type object and every
//! instance of the type reference the same table.
//!
//! # Caches
//!
//! All cache fields are optional. When absent, dispatch falls back to the
//! meta-object unconditionally. A cache is published wholesale — readers
//! observe either no cache or a complete one, never a partially built one —
//! and is invalidated or rebuilt only by explicit action of the owning
//! meta-object.
//!
//! # Dispatch strategies
//!
//! `find_method` and `type_check` are overridable per table. The default
//! algorithms cover the common case; substituting a custom algorithm is
//! explicit and rare.

use crate::object::ObjectHandle;
use crate::object::dispatch::{default_find_method, default_type_check};
use crate::object::repr::Representation;
use crate::runtime::Runtime;
use crate::value::Value;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use veld_core::{InternedString, ModelResult};

/// By-name method cache, published by the meta-object.
pub type MethodCache = FxHashMap<InternedString, Value>;

/// Signature of a custom method dispatch function.
pub type FindMethodFn = fn(&Runtime, &ObjectHandle, &InternedString, u32) -> ModelResult<Value>;

/// Signature of a custom type check function.
pub type TypeCheckFn = fn(&Runtime, &ObjectHandle, &ObjectHandle) -> ModelResult<bool>;

// =============================================================================
// Flags
// =============================================================================

bitflags::bitflags! {
    /// State bits for a shared table.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StableFlags: u32 {
        /// The owning meta-object has composed this type.
        const COMPOSED = 1 << 0;
        /// A method cache miss is final; no meta-object fallback.
        const METHOD_CACHE_AUTHORITATIVE = 1 << 1;
    }
}

impl Default for StableFlags {
    fn default() -> Self {
        Self::empty()
    }
}

// =============================================================================
// Dispatch Strategies
// =============================================================================

/// Method dispatch strategy stored per shared table.
#[derive(Debug, Clone, Copy)]
pub enum MethodDispatch {
    /// The three-tier engine in `dispatch::default_find_method`.
    Default,
    /// A substituted algorithm.
    Custom(FindMethodFn),
}

/// Type check strategy stored per shared table.
#[derive(Debug, Clone, Copy)]
pub enum TypeCheckDispatch {
    /// The cache-or-fallback engine in `dispatch::default_type_check`.
    Default,
    /// A substituted algorithm.
    Custom(TypeCheckFn),
}

// =============================================================================
// Shared Table
// =============================================================================

/// Per-type descriptor binding a representation, a meta-object, and the
/// dispatch caches.
pub struct SharedTable {
    /// The bound representation. Shared: many types may select the same
    /// representation instance.
    repr: Arc<dyn Representation>,
    /// The meta-object ("HOW"). Unset only while the bootstrap patches the
    /// fixed point; non-null after construction completes.
    how: RwLock<Option<ObjectHandle>>,
    /// Optional namespace companion object ("WHO").
    who: RwLock<Option<ObjectHandle>>,
    /// Optional by-name method cache.
    method_cache: RwLock<Option<Arc<MethodCache>>>,
    /// Optional list of types this type is known compatible with.
    /// Authoritative and exhaustive when present.
    type_check_cache: RwLock<Option<Arc<[ObjectHandle]>>>,
    /// Optional hint-indexed method table, the fastest dispatch path.
    vtable: RwLock<Option<Arc<[Value]>>>,
    /// Method dispatch strategy.
    find_method: RwLock<MethodDispatch>,
    /// Type check strategy.
    type_check: RwLock<TypeCheckDispatch>,
    /// State bits.
    flags: RwLock<StableFlags>,
}

impl SharedTable {
    /// Create a descriptor bound to `repr` and described by `how`.
    ///
    /// `who`, caches, and vtable start unset; the default dispatch
    /// strategies are installed. No validation of the meta-object's shape
    /// is performed — validity is the meta-object's own contract.
    pub fn new(repr: Arc<dyn Representation>, how: ObjectHandle) -> Arc<Self> {
        let st = Self::deferred(repr);
        st.bind_how(how);
        st
    }

    /// Create a descriptor whose meta-object is patched in later.
    ///
    /// Only the bootstrap needs this: the meta-object fixed point cannot be
    /// expressed in a single construction step.
    pub(crate) fn deferred(repr: Arc<dyn Representation>) -> Arc<Self> {
        Arc::new(Self {
            repr,
            how: RwLock::new(None),
            who: RwLock::new(None),
            method_cache: RwLock::new(None),
            type_check_cache: RwLock::new(None),
            vtable: RwLock::new(None),
            find_method: RwLock::new(MethodDispatch::Default),
            type_check: RwLock::new(TypeCheckDispatch::Default),
            flags: RwLock::new(StableFlags::empty()),
        })
    }

    /// Patch the meta-object reference. The first bind wins.
    pub(crate) fn bind_how(&self, how: ObjectHandle) {
        let mut slot = self.how.write();
        if slot.is_none() {
            *slot = Some(how);
        }
    }

    /// The bound representation.
    #[inline]
    pub fn repr(&self) -> &Arc<dyn Representation> {
        &self.repr
    }

    /// The meta-object, if already bound.
    pub fn how(&self) -> Option<ObjectHandle> {
        self.how.read().clone()
    }

    /// The namespace companion object.
    pub fn who(&self) -> Option<ObjectHandle> {
        self.who.read().clone()
    }

    /// Install the namespace companion object.
    pub fn set_who(&self, who: ObjectHandle) {
        *self.who.write() = Some(who);
    }

    // =========================================================================
    // Cache Publication
    // =========================================================================

    /// Snapshot of the method cache.
    pub fn method_cache(&self) -> Option<Arc<MethodCache>> {
        self.method_cache.read().clone()
    }

    /// Publish a complete method cache, replacing any previous one.
    pub fn publish_method_cache(&self, cache: MethodCache) {
        log::trace!("publishing method cache with {} entries", cache.len());
        *self.method_cache.write() = Some(Arc::new(cache));
    }

    /// Drop the method cache; dispatch falls back to the meta-object.
    pub fn clear_method_cache(&self) {
        *self.method_cache.write() = None;
    }

    /// Snapshot of the type check cache.
    pub fn type_check_cache(&self) -> Option<Arc<[ObjectHandle]>> {
        self.type_check_cache.read().clone()
    }

    /// Publish a complete type check cache, replacing any previous one.
    ///
    /// A published cache is authoritative: a miss means "not compatible",
    /// never "ask the meta-object". A type whose compatibility set changes
    /// must republish.
    pub fn publish_type_check_cache(&self, types: Vec<ObjectHandle>) {
        log::trace!("publishing type check cache with {} entries", types.len());
        *self.type_check_cache.write() = Some(types.into());
    }

    /// Drop the type check cache.
    pub fn clear_type_check_cache(&self) {
        *self.type_check_cache.write() = None;
    }

    /// Snapshot of the hint-indexed method table.
    pub fn vtable(&self) -> Option<Arc<[Value]>> {
        self.vtable.read().clone()
    }

    /// Publish a hint-indexed method table.
    pub fn publish_vtable(&self, methods: Vec<Value>) {
        *self.vtable.write() = Some(methods.into());
    }

    /// Number of vtable entries (0 when no vtable is published).
    pub fn vtable_length(&self) -> usize {
        self.vtable.read().as_ref().map_or(0, |vt| vt.len())
    }

    // =========================================================================
    // Flags
    // =========================================================================

    /// Current state bits.
    pub fn flags(&self) -> StableFlags {
        *self.flags.read()
    }

    /// Set state bits.
    pub fn insert_flags(&self, flags: StableFlags) {
        self.flags.write().insert(flags);
    }

    /// Clear state bits.
    pub fn remove_flags(&self, flags: StableFlags) {
        self.flags.write().remove(flags);
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Substitute the method dispatch strategy.
    pub fn set_find_method(&self, strategy: MethodDispatch) {
        *self.find_method.write() = strategy;
    }

    /// Substitute the type check strategy.
    pub fn set_type_check(&self, strategy: TypeCheckDispatch) {
        *self.type_check.write() = strategy;
    }

    /// Resolve a method on `obj` through this table's strategy.
    pub fn find_method(
        &self,
        rt: &Runtime,
        obj: &ObjectHandle,
        name: &InternedString,
        hint: u32,
    ) -> ModelResult<Value> {
        let strategy = *self.find_method.read();
        match strategy {
            MethodDispatch::Default => default_find_method(rt, obj, name, hint),
            MethodDispatch::Custom(f) => f(rt, obj, name, hint),
        }
    }

    /// Check `obj` against `candidate` through this table's strategy.
    pub fn type_check(
        &self,
        rt: &Runtime,
        obj: &ObjectHandle,
        candidate: &ObjectHandle,
    ) -> ModelResult<bool> {
        let strategy = *self.type_check.read();
        match strategy {
            TypeCheckDispatch::Default => default_type_check(rt, obj, candidate),
            TypeCheckDispatch::Custom(f) => f(rt, obj, candidate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::knowhow::KnowHowRepr;

    fn repr() -> Arc<dyn Representation> {
        Arc::new(KnowHowRepr)
    }

    fn dummy_handle(repr: &Arc<dyn Representation>) -> ObjectHandle {
        let stable = SharedTable::deferred(repr.clone());
        ObjectHandle::new_object(stable, repr.allocate())
    }

    #[test]
    fn test_new_binds_how() {
        let repr = repr();
        let how = dummy_handle(&repr);
        let st = SharedTable::new(repr, how.clone());
        assert!(st.how().unwrap().ptr_eq(&how));
        assert!(st.who().is_none());
        assert!(st.method_cache().is_none());
        assert!(st.type_check_cache().is_none());
        assert_eq!(st.vtable_length(), 0);
    }

    #[test]
    fn test_first_how_bind_wins() {
        let repr = repr();
        let first = dummy_handle(&repr);
        let second = dummy_handle(&repr);
        let st = SharedTable::deferred(repr);
        st.bind_how(first.clone());
        st.bind_how(second);
        assert!(st.how().unwrap().ptr_eq(&first));
    }

    #[test]
    fn test_cache_publication_replaces_wholesale() {
        let repr = repr();
        let st = SharedTable::new(repr.clone(), dummy_handle(&repr));

        let mut cache = MethodCache::default();
        let interner = veld_core::Interner::new();
        cache.insert(interner.intern("m"), Value::Int(1));
        st.publish_method_cache(cache);
        assert_eq!(st.method_cache().unwrap().len(), 1);

        st.publish_method_cache(MethodCache::default());
        assert_eq!(st.method_cache().unwrap().len(), 0);

        st.clear_method_cache();
        assert!(st.method_cache().is_none());
    }

    #[test]
    fn test_who_is_optional() {
        let repr = repr();
        let st = SharedTable::new(repr.clone(), dummy_handle(&repr));
        assert!(st.who().is_none());
        let who = dummy_handle(&repr);
        st.set_who(who.clone());
        assert!(st.who().unwrap().ptr_eq(&who));
    }

    #[test]
    fn test_type_check_cache_clear() {
        let repr = repr();
        let st = SharedTable::new(repr.clone(), dummy_handle(&repr));
        st.publish_type_check_cache(vec![dummy_handle(&repr)]);
        assert_eq!(st.type_check_cache().unwrap().len(), 1);
        st.clear_type_check_cache();
        assert!(st.type_check_cache().is_none());
    }

    #[test]
    fn test_vtable_length() {
        let repr = repr();
        let st = SharedTable::new(repr.clone(), dummy_handle(&repr));
        st.publish_vtable(vec![Value::Int(10), Value::Int(20)]);
        assert_eq!(st.vtable_length(), 2);
    }

    #[test]
    fn test_flags() {
        let repr = repr();
        let st = SharedTable::new(repr.clone(), dummy_handle(&repr));
        assert!(st.flags().is_empty());
        st.insert_flags(StableFlags::COMPOSED);
        assert!(st.flags().contains(StableFlags::COMPOSED));
        st.remove_flags(StableFlags::COMPOSED);
        assert!(st.flags().is_empty());
    }
}
