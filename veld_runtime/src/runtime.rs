//! The runtime's top-level context object.
//!
//! All process-wide state — the representation registry, the serialization
//! context registry, the string interner, the handle root set — is owned
//! here and passed down explicitly. Nothing in the kernel is an ambient
//! global: two `Runtime` values are fully independent.
//!
//! `initialize` is the documented one-time initialization phase; it runs
//! the KnowHow bootstrap and is idempotent afterwards.

use crate::config::RuntimeConfig;
use crate::object::bootstrap;
use crate::object::repr::{ReprBody, ReprRegistry, Representation};
use crate::object::stable::SharedTable;
use crate::object::ObjectHandle;
use crate::sc::{ScRegistry, SerializationContext};
use crate::value::Value;
use std::sync::{Arc, OnceLock};
use veld_core::{InternedString, Interner, ModelError, ModelResult};
use veld_gc::{RootSet, Tracer};

/// Interned names the dispatch engines resolve on every fallback.
pub struct WellKnownNames {
    /// `"find_method"`.
    pub find_method: InternedString,
    /// `"type_check"`.
    pub type_check: InternedString,
}

impl WellKnownNames {
    fn new(interner: &Interner) -> Self {
        Self {
            find_method: interner.intern("find_method"),
            type_check: interner.intern("type_check"),
        }
    }
}

/// Top-level runtime context.
pub struct Runtime {
    config: RuntimeConfig,
    interner: Interner,
    names: WellKnownNames,
    reprs: ReprRegistry,
    contexts: ScRegistry,
    roots: RootSet,
    boot: OnceLock<(ObjectHandle, ObjectHandle)>,
}

impl Runtime {
    /// Create a runtime with default configuration.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Create a runtime with the given configuration.
    pub fn with_config(config: RuntimeConfig) -> Self {
        let interner = Interner::with_capacity(config.interner_capacity);
        let names = WellKnownNames::new(&interner);
        let roots = RootSet::with_capacity(config.initial_root_capacity);
        Self {
            config,
            interner,
            names,
            reprs: ReprRegistry::new(),
            contexts: ScRegistry::new(),
            roots,
            boot: OnceLock::new(),
        }
    }

    /// The runtime's configuration.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Interned dispatch capability names.
    #[inline]
    pub fn names(&self) -> &WellKnownNames {
        &self.names
    }

    /// Intern a string in this runtime's table.
    pub fn intern(&self, s: &str) -> InternedString {
        self.interner.intern(s)
    }

    // =========================================================================
    // Bootstrap
    // =========================================================================

    /// One-time bootstrap entry point.
    ///
    /// Runs the KnowHow bootstrap and returns the root meta-object and the
    /// root attribute meta-object. Idempotent: later calls return the same
    /// pair. A failure here is fatal for the runtime — there is no
    /// meta-object system without a closed loop.
    pub fn initialize(&self) -> ModelResult<(ObjectHandle, ObjectHandle)> {
        if let Some((knowhow, knowhow_attribute)) = self.boot.get() {
            return Ok((knowhow.clone(), knowhow_attribute.clone()));
        }
        let pair = bootstrap::bootstrap(self)?;
        let pair = self.boot.get_or_init(|| pair);
        Ok((pair.0.clone(), pair.1.clone()))
    }

    /// The root meta-object, once bootstrapped.
    pub fn knowhow(&self) -> Option<ObjectHandle> {
        self.boot.get().map(|(knowhow, _)| knowhow.clone())
    }

    /// The root attribute meta-object, once bootstrapped.
    pub fn knowhow_attribute(&self) -> Option<ObjectHandle> {
        self.boot.get().map(|(_, attr)| attr.clone())
    }

    // =========================================================================
    // Shared Tables and Wrapping
    // =========================================================================

    /// Create a per-type descriptor bound to `repr` and described by `how`.
    pub fn create_shared_table(
        &self,
        repr: &Arc<dyn Representation>,
        how: &ObjectHandle,
    ) -> Arc<SharedTable> {
        SharedTable::new(repr.clone(), how.clone())
    }

    /// Wrap an opaque body and its shared table in an object handle.
    ///
    /// The handle is registered for garbage-collection tracing.
    pub fn wrap_object(&self, stable: &Arc<SharedTable>, body: ReprBody) -> ObjectHandle {
        let handle = ObjectHandle::new_object(stable.clone(), body);
        self.roots.register(handle.trace_root());
        handle
    }

    /// Wrap a representation implementation in a repr-tagged handle.
    pub fn wrap_representation(&self, repr: Arc<dyn Representation>) -> ObjectHandle {
        let handle = ObjectHandle::new_repr(repr);
        self.roots.register(handle.trace_root());
        handle
    }

    /// Allocate and initialize an instance of `type_obj`'s type through its
    /// bound representation.
    pub fn instantiate(&self, type_obj: &ObjectHandle) -> ModelResult<ObjectHandle> {
        let stable = type_obj.stable().ok_or_else(|| ModelError::Argument {
            message: "cannot instantiate a representation handle".into(),
        })?;
        let how = stable.how().ok_or_else(|| ModelError::MethodResolution {
            message: "shared table has no meta-object".into(),
        })?;
        let body = stable.repr().instantiate(&how)?;
        Ok(self.wrap_object(&stable, body))
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Resolve a method on `obj` through its shared table's strategy.
    pub fn find_method(
        &self,
        obj: &ObjectHandle,
        name: &InternedString,
        hint: u32,
    ) -> ModelResult<Value> {
        let stable = obj.stable().ok_or_else(|| ModelError::MethodResolution {
            message: "cannot dispatch on a representation handle".into(),
        })?;
        stable.find_method(self, obj, name, hint)
    }

    /// Check `obj` against `candidate` through its shared table's strategy.
    pub fn type_check(
        &self,
        obj: &ObjectHandle,
        candidate: &ObjectHandle,
    ) -> ModelResult<bool> {
        let stable = obj.stable().ok_or_else(|| ModelError::TypeCheck {
            message: "cannot type check a representation handle".into(),
        })?;
        stable.type_check(self, obj, candidate)
    }

    /// Invoke a resolved method with positional arguments.
    pub fn invoke(&self, callee: &Value, args: &[Value]) -> ModelResult<Value> {
        match callee {
            Value::Native(method) => method.invoke(self, args),
            other => Err(ModelError::NotInvocable {
                type_name: other.type_name(),
            }),
        }
    }

    // =========================================================================
    // Registries
    // =========================================================================

    /// Register a representation under `name`, wrapping it in its single
    /// repr-tagged identity handle.
    pub fn register_representation(
        &self,
        name: &str,
        repr: Arc<dyn Representation>,
    ) -> ModelResult<ObjectHandle> {
        let handle = self.wrap_representation(repr.clone());
        self.reprs.register(name, repr, handle.clone())?;
        log::debug!("registered representation '{}'", name);
        Ok(handle)
    }

    /// Look up a representation by name.
    pub fn representation(&self, name: &str) -> ModelResult<Arc<dyn Representation>> {
        self.reprs.lookup(name)
    }

    /// Look up a representation's identity handle by name.
    pub fn representation_handle(&self, name: &str) -> ModelResult<ObjectHandle> {
        self.reprs.lookup_handle(name)
    }

    /// Register a serialization context under `name`.
    pub fn register_context(&self, name: &str) -> ModelResult<Arc<SerializationContext>> {
        let context = self.contexts.register(name)?;
        log::debug!("registered serialization context '{}'", name);
        Ok(context)
    }

    /// Look up a serialization context by name.
    pub fn context(&self, name: &str) -> ModelResult<Arc<SerializationContext>> {
        self.contexts.lookup(name)
    }

    // =========================================================================
    // Garbage Collection
    // =========================================================================

    /// Trace every live wrapped handle, pruning dead registry entries.
    ///
    /// Returns the number of live handles visited.
    pub fn trace_roots(&self, tracer: &mut dyn Tracer) -> usize {
        self.roots.trace_all(tracer)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::HandleTag;
    use veld_gc::CountingTracer;

    #[test]
    fn test_initialize_is_idempotent() {
        let rt = Runtime::new();
        let (first, _) = rt.initialize().unwrap();
        let (second, _) = rt.initialize().unwrap();
        assert!(first.ptr_eq(&second));
        assert!(rt.knowhow().unwrap().ptr_eq(&first));
    }

    #[test]
    fn test_wrap_registers_for_tracing() {
        let rt = Runtime::new();
        rt.initialize().unwrap();
        let mut tracer = CountingTracer::new();
        // At least the two bootstrap objects and three repr wrappers.
        assert!(rt.trace_roots(&mut tracer) >= 5);
    }

    #[test]
    fn test_invoke_rejects_non_invocable() {
        let rt = Runtime::new();
        let err = rt.invoke(&Value::Int(3), &[]).unwrap_err();
        assert_eq!(err, ModelError::NotInvocable { type_name: "int" });
    }

    #[test]
    fn test_instantiate_minted_type() {
        let rt = Runtime::new();
        let (knowhow, _) = rt.initialize().unwrap();
        let repr = rt.representation("plain_attrs").unwrap();
        let st = rt.create_shared_table(&repr, &knowhow);
        let type_obj = rt.wrap_object(&st, repr.allocate());

        let instance = rt.instantiate(&type_obj).unwrap();
        assert_eq!(instance.tag(), HandleTag::Object);
        assert!(instance.stable().unwrap().how().unwrap().ptr_eq(&knowhow));
    }
}
