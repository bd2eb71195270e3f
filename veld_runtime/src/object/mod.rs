//! Object handles.
//!
//! A handle is the uniform wrapper the rest of the runtime sees: one
//! opaque, representation-owned body coupled to exactly one shared table.
//! The same wrapping mechanism also wraps representation implementations
//! themselves; the two cases are distinguished by an interpreter-level
//! handle tag. The runtime never inspects representation-private memory
//! directly — tracing and destruction always route through the bound
//! representation.

pub mod bootstrap;
pub mod dispatch;
pub mod knowhow;
pub mod repr;
pub mod stable;

use crate::object::repr::{ReprBody, Representation};
use crate::object::stable::SharedTable;
use parking_lot::{
    MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLock, RwLockReadGuard, RwLockWriteGuard,
};
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};
use veld_gc::{Trace, Tracer};

// =============================================================================
// Handle Tag
// =============================================================================

/// Interpreter-level tag telling what a handle wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleTag {
    /// A regular object: opaque body + shared table.
    Object,
    /// A wrapped representation implementation.
    Repr,
}

// =============================================================================
// Object Handle
// =============================================================================

enum ObjectCell {
    Object {
        stable: Arc<SharedTable>,
        body: RwLock<ReprBody>,
    },
    Repr {
        repr: Arc<dyn Representation>,
    },
}

impl Drop for ObjectCell {
    fn drop(&mut self) {
        // Destruction routes through the bound representation.
        if let ObjectCell::Object { stable, body } = self {
            stable.repr().release(body.get_mut());
        }
    }
}

impl Trace for ObjectCell {
    fn trace(&self, tracer: &mut dyn Tracer) {
        match self {
            ObjectCell::Object { stable, body } => stable.repr().trace(&body.read(), tracer),
            ObjectCell::Repr { .. } => {}
        }
    }
}

/// Uniform wrapper binding opaque instance memory to its shared table.
///
/// Handles are cheap to clone; `ptr_eq` is the reference identity used by
/// type-check caches and the bootstrap fixed point.
#[derive(Clone)]
pub struct ObjectHandle(Arc<ObjectCell>);

impl ObjectHandle {
    pub(crate) fn new_object(stable: Arc<SharedTable>, body: ReprBody) -> Self {
        Self(Arc::new(ObjectCell::Object {
            stable,
            body: RwLock::new(body),
        }))
    }

    pub(crate) fn new_repr(repr: Arc<dyn Representation>) -> Self {
        Self(Arc::new(ObjectCell::Repr { repr }))
    }

    /// The handle's interpreter-level tag.
    pub fn tag(&self) -> HandleTag {
        match &*self.0 {
            ObjectCell::Object { .. } => HandleTag::Object,
            ObjectCell::Repr { .. } => HandleTag::Repr,
        }
    }

    /// The shared table, for object handles.
    pub fn stable(&self) -> Option<Arc<SharedTable>> {
        match &*self.0 {
            ObjectCell::Object { stable, .. } => Some(stable.clone()),
            ObjectCell::Repr { .. } => None,
        }
    }

    /// The meta-object describing this object's type.
    pub fn how(&self) -> Option<ObjectHandle> {
        self.stable().and_then(|st| st.how())
    }

    /// The wrapped representation, for repr handles.
    pub fn as_repr(&self) -> Option<Arc<dyn Representation>> {
        match &*self.0 {
            ObjectCell::Repr { repr } => Some(repr.clone()),
            ObjectCell::Object { .. } => None,
        }
    }

    /// Reference identity.
    #[inline]
    pub fn ptr_eq(&self, other: &ObjectHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Raw pointer identity, for tracers.
    #[inline]
    pub fn as_ptr(&self) -> *const () {
        Arc::as_ptr(&self.0) as *const ()
    }

    /// Borrow the body downcast to its concrete representation type.
    ///
    /// Returns `None` for repr handles and for bodies of a different type.
    pub fn body<T: Any>(&self) -> Option<MappedRwLockReadGuard<'_, T>> {
        match &*self.0 {
            ObjectCell::Object { body, .. } => {
                RwLockReadGuard::try_map(body.read(), |b| (**b).downcast_ref::<T>()).ok()
            }
            ObjectCell::Repr { .. } => None,
        }
    }

    /// Mutably borrow the body downcast to its concrete representation type.
    pub fn body_mut<T: Any>(&self) -> Option<MappedRwLockWriteGuard<'_, T>> {
        match &*self.0 {
            ObjectCell::Object { body, .. } => {
                RwLockWriteGuard::try_map(body.write(), |b| (**b).downcast_mut::<T>()).ok()
            }
            ObjectCell::Repr { .. } => None,
        }
    }

    /// Weak trace entry for the collector's handle set.
    pub(crate) fn trace_root(&self) -> Weak<dyn Trace + Send + Sync> {
        let strong: Arc<dyn Trace + Send + Sync> = self.0.clone();
        let weak: Weak<dyn Trace + Send + Sync> = Arc::downgrade(&strong);
        weak
    }
}

impl fmt::Debug for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectHandle")
            .field("tag", &self.tag())
            .field("ptr", &self.as_ptr())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::knowhow::{KnowHowBody, KnowHowRepr};

    fn knowhow_repr() -> Arc<dyn Representation> {
        Arc::new(KnowHowRepr)
    }

    #[test]
    fn test_repr_handle_tag() {
        let handle = ObjectHandle::new_repr(knowhow_repr());
        assert_eq!(handle.tag(), HandleTag::Repr);
        assert!(handle.stable().is_none());
        assert!(handle.as_repr().is_some());
        assert!(handle.body::<KnowHowBody>().is_none());
    }

    #[test]
    fn test_object_handle_body_downcast() {
        let repr = knowhow_repr();
        let stable = SharedTable::deferred(repr.clone());
        let handle = ObjectHandle::new_object(stable, repr.allocate());
        assert_eq!(handle.tag(), HandleTag::Object);
        assert!(handle.body::<KnowHowBody>().is_some());
        assert!(handle.body::<u32>().is_none());
    }

    #[test]
    fn test_ptr_eq_is_identity() {
        let repr = knowhow_repr();
        let stable = SharedTable::deferred(repr.clone());
        let a = ObjectHandle::new_object(stable.clone(), repr.allocate());
        let b = ObjectHandle::new_object(stable, repr.allocate());
        assert!(a.ptr_eq(&a.clone()));
        assert!(!a.ptr_eq(&b));
    }
}
