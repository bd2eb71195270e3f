//! KnowHow: the bootstrap meta-objects and their representations.
//!
//! KnowHow is the meta-object whose own type is described by itself; it is
//! the root every other meta-object chain terminates in. Its body holds a
//! name, a method table, and an attribute list. KnowHow-Attribute is the
//! minimal meta-object describing simple named attributes, so that KnowHow
//! itself can have attributes described by a meta-object rather than by ad
//! hoc logic.
//!
//! Three builtin representations live here:
//! - `KnowHowRepr` — backs KnowHow meta-object instances
//! - `KnowHowAttributeRepr` — backs attribute instances
//! - `PlainAttrsRepr` — plain by-name attribute storage, the default for
//!   freshly minted types
//!
//! The native method suite gives the bootstrap meta-objects their actual
//! behavior: `new_type`, `add_method`, `add_attribute`, `methods`,
//! `attributes`, `name`, `compose`, plus the `find_method`/`type_check`
//! capabilities the dispatch engines resolve through.

use crate::object::ObjectHandle;
use crate::object::repr::{ReprBody, Representation};
use crate::object::stable::{MethodCache, StableFlags};
use crate::runtime::Runtime;
use crate::value::{Value, expect_obj, expect_str};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use veld_core::{InternedString, ModelError, ModelResult};
use veld_gc::{Trace, Tracer};

// =============================================================================
// KnowHow Body
// =============================================================================

/// Body of a KnowHow meta-object instance.
pub struct KnowHowBody {
    name: RwLock<Option<InternedString>>,
    methods: RwLock<FxHashMap<InternedString, Value>>,
    attributes: RwLock<SmallVec<[ObjectHandle; 4]>>,
}

impl KnowHowBody {
    /// Create an unnamed body.
    pub fn anonymous() -> Self {
        Self {
            name: RwLock::new(None),
            methods: RwLock::new(FxHashMap::default()),
            attributes: RwLock::new(SmallVec::new()),
        }
    }

    /// Create a named body.
    pub fn named(name: InternedString) -> Self {
        let body = Self::anonymous();
        *body.name.write() = Some(name);
        body
    }

    /// The type name, if any.
    pub fn name(&self) -> Option<InternedString> {
        self.name.read().clone()
    }

    /// Set the type name.
    pub fn set_name(&self, name: InternedString) {
        *self.name.write() = Some(name);
    }

    /// Record a method.
    pub fn add_method(&self, name: InternedString, method: Value) {
        self.methods.write().insert(name, method);
    }

    /// Look up a recorded method.
    pub fn method(&self, name: &InternedString) -> Option<Value> {
        self.methods.read().get(name).cloned()
    }

    /// Recorded method names.
    pub fn method_names(&self) -> Vec<InternedString> {
        self.methods.read().keys().cloned().collect()
    }

    /// Clone the whole method table (for cache publication).
    pub fn methods_snapshot(&self) -> MethodCache {
        self.methods.read().clone()
    }

    /// Record an attribute.
    pub fn add_attribute(&self, attr: ObjectHandle) {
        self.attributes.write().push(attr);
    }

    /// Recorded attributes.
    pub fn attributes_snapshot(&self) -> Vec<ObjectHandle> {
        self.attributes.read().iter().cloned().collect()
    }

    fn clear(&self) {
        self.methods.write().clear();
        self.attributes.write().clear();
    }
}

/// Representation backing KnowHow meta-object instances.
pub struct KnowHowRepr;

impl Representation for KnowHowRepr {
    fn name(&self) -> &'static str {
        "knowhow"
    }

    fn allocate(&self) -> ReprBody {
        Box::new(KnowHowBody::anonymous())
    }

    fn instantiate(&self, _how: &ObjectHandle) -> ModelResult<ReprBody> {
        Ok(self.allocate())
    }

    fn trace(&self, body: &ReprBody, tracer: &mut dyn Tracer) {
        if let Some(body) = body.downcast_ref::<KnowHowBody>() {
            for method in body.methods.read().values() {
                method.trace(tracer);
            }
            for attr in body.attributes.read().iter() {
                tracer.trace_ptr(attr.as_ptr());
            }
        }
    }

    fn release(&self, body: &mut ReprBody) {
        if let Some(body) = body.downcast_mut::<KnowHowBody>() {
            body.clear();
        }
    }
}

// =============================================================================
// KnowHow-Attribute Body
// =============================================================================

/// Body of a KnowHow-Attribute instance: a simple named attribute.
pub struct KnowHowAttributeBody {
    name: RwLock<Option<InternedString>>,
}

impl KnowHowAttributeBody {
    /// Create an unnamed attribute.
    pub fn anonymous() -> Self {
        Self {
            name: RwLock::new(None),
        }
    }

    /// Create a named attribute.
    pub fn named(name: InternedString) -> Self {
        Self {
            name: RwLock::new(Some(name)),
        }
    }

    /// The attribute name, if set.
    pub fn name(&self) -> Option<InternedString> {
        self.name.read().clone()
    }
}

/// Representation backing KnowHow-Attribute instances.
pub struct KnowHowAttributeRepr;

impl Representation for KnowHowAttributeRepr {
    fn name(&self) -> &'static str {
        "knowhow_attribute"
    }

    fn allocate(&self) -> ReprBody {
        Box::new(KnowHowAttributeBody::anonymous())
    }

    fn instantiate(&self, _how: &ObjectHandle) -> ModelResult<ReprBody> {
        Ok(self.allocate())
    }

    fn trace(&self, _body: &ReprBody, _tracer: &mut dyn Tracer) {}

    fn release(&self, _body: &mut ReprBody) {}
}

// =============================================================================
// Plain Attribute Storage
// =============================================================================

/// Body of an object using plain by-name attribute storage.
pub struct PlainAttrsBody {
    attrs: RwLock<FxHashMap<InternedString, Value>>,
}

impl PlainAttrsBody {
    /// Create an empty body.
    pub fn new() -> Self {
        Self {
            attrs: RwLock::new(FxHashMap::default()),
        }
    }

    /// Get an attribute value.
    pub fn get(&self, name: &InternedString) -> Option<Value> {
        self.attrs.read().get(name).cloned()
    }

    /// Set an attribute value.
    pub fn set(&self, name: InternedString, value: Value) {
        self.attrs.write().insert(name, value);
    }

    /// Number of stored attributes.
    pub fn len(&self) -> usize {
        self.attrs.read().len()
    }

    /// Check if no attributes are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PlainAttrsBody {
    fn default() -> Self {
        Self::new()
    }
}

/// Plain by-name attribute storage, the default representation for types
/// minted through `new_type`.
pub struct PlainAttrsRepr;

impl Representation for PlainAttrsRepr {
    fn name(&self) -> &'static str {
        "plain_attrs"
    }

    fn allocate(&self) -> ReprBody {
        Box::new(PlainAttrsBody::new())
    }

    fn instantiate(&self, _how: &ObjectHandle) -> ModelResult<ReprBody> {
        Ok(self.allocate())
    }

    fn trace(&self, body: &ReprBody, tracer: &mut dyn Tracer) {
        if let Some(body) = body.downcast_ref::<PlainAttrsBody>() {
            for value in body.attrs.read().values() {
                value.trace(tracer);
            }
        }
    }

    fn release(&self, body: &mut ReprBody) {
        if let Some(body) = body.downcast_mut::<PlainAttrsBody>() {
            body.attrs.write().clear();
        }
    }
}

// =============================================================================
// KnowHow Native Methods
// =============================================================================

fn knowhow_body<'a>(
    how: &'a ObjectHandle,
    on_missing: fn(String) -> ModelError,
) -> ModelResult<parking_lot::MappedRwLockReadGuard<'a, KnowHowBody>> {
    how.body::<KnowHowBody>()
        .ok_or_else(|| on_missing("meta-object body is not a KnowHow body".into()))
}

/// `find_method(how, obj, name)`: the capability the dispatch engine
/// resolves on fallback. Looks `name` up in the meta-object's method
/// table; a miss is a `NoSuchMethod` outcome, not a kernel error.
fn meta_find_method(_rt: &Runtime, args: &[Value]) -> ModelResult<Value> {
    let how = expect_obj(args, 0, "meta-object")?;
    let name = expect_str(args, 2, "method name")?;
    let body = knowhow_body(how, |message| ModelError::MethodResolution { message })?;
    body.method(name).ok_or_else(|| ModelError::NoSuchMethod {
        name: name.as_str().to_owned(),
    })
}

/// `type_check(how, obj, candidate)`: reference identity.
fn meta_type_check(_rt: &Runtime, args: &[Value]) -> ModelResult<Value> {
    let obj = expect_obj(args, 1, "object")?;
    let candidate = expect_obj(args, 2, "candidate type")?;
    Ok(Value::Bool(obj.ptr_eq(candidate)))
}

/// `new_type(how, name, repr_name)`: mint a fresh meta-object instance
/// (sharing the receiver's shared table), a shared table bound to the
/// named representation, and a type object allocated through it.
fn meta_new_type(rt: &Runtime, args: &[Value]) -> ModelResult<Value> {
    let how = expect_obj(args, 0, "meta-object")?;
    let name = expect_str(args, 1, "type name")?;
    let repr_name = expect_str(args, 2, "representation name")?;

    let meta_stable = how.stable().ok_or_else(|| ModelError::Argument {
        message: "meta-object has no shared table".into(),
    })?;
    let meta = rt.wrap_object(&meta_stable, Box::new(KnowHowBody::named(name.clone())));

    let repr = rt.representation(repr_name.as_str())?;
    let stable = rt.create_shared_table(&repr, &meta);
    let type_obj = rt.wrap_object(&stable, repr.allocate());
    Ok(Value::Obj(type_obj))
}

/// `add_method(how, type, name, code)`.
fn meta_add_method(_rt: &Runtime, args: &[Value]) -> ModelResult<Value> {
    let how = expect_obj(args, 0, "meta-object")?;
    let name = expect_str(args, 2, "method name")?;
    let code = args.get(3).cloned().ok_or_else(|| ModelError::Argument {
        message: "expected method body as argument 3".into(),
    })?;
    let body = knowhow_body(how, |message| ModelError::Argument { message })?;
    body.add_method(name.clone(), code);
    Ok(Value::Null)
}

/// `add_attribute(how, type, attr)`.
fn meta_add_attribute(_rt: &Runtime, args: &[Value]) -> ModelResult<Value> {
    let how = expect_obj(args, 0, "meta-object")?;
    let attr = expect_obj(args, 2, "attribute")?;
    let body = knowhow_body(how, |message| ModelError::Argument { message })?;
    body.add_attribute(attr.clone());
    Ok(Value::Null)
}

/// `methods(how, type)`: sorted method names.
fn meta_methods(_rt: &Runtime, args: &[Value]) -> ModelResult<Value> {
    let how = expect_obj(args, 0, "meta-object")?;
    let body = knowhow_body(how, |message| ModelError::Argument { message })?;
    let mut names = body.method_names();
    names.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    Ok(Value::list(names.into_iter().map(Value::Str).collect()))
}

/// `attributes(how, type)`.
fn meta_attributes(_rt: &Runtime, args: &[Value]) -> ModelResult<Value> {
    let how = expect_obj(args, 0, "meta-object")?;
    let body = knowhow_body(how, |message| ModelError::Argument { message })?;
    Ok(Value::list(
        body.attributes_snapshot().into_iter().map(Value::Obj).collect(),
    ))
}

/// `name(how, type)`.
fn meta_name(_rt: &Runtime, args: &[Value]) -> ModelResult<Value> {
    let how = expect_obj(args, 0, "meta-object")?;
    let body = knowhow_body(how, |message| ModelError::Argument { message })?;
    Ok(body.name().map(Value::Str).unwrap_or(Value::Null))
}

/// `compose(how, type)`: publish the type's dispatch caches from the
/// meta-object's body. This is the only cache rebuild path — republishing
/// after a change is the meta-object's explicit responsibility.
fn meta_compose(_rt: &Runtime, args: &[Value]) -> ModelResult<Value> {
    let how = expect_obj(args, 0, "meta-object")?;
    let type_obj = expect_obj(args, 1, "type object")?;
    let stable = type_obj.stable().ok_or_else(|| ModelError::Argument {
        message: "type object has no shared table".into(),
    })?;

    let methods = {
        let body = knowhow_body(how, |message| ModelError::Argument { message })?;
        body.methods_snapshot()
    };

    stable.repr().compose(how)?;
    stable.publish_method_cache(methods);
    stable.publish_type_check_cache(vec![type_obj.clone()]);
    stable.insert_flags(StableFlags::COMPOSED);
    log::debug!("composed type with {} cached methods", stable.method_cache().map_or(0, |c| c.len()));
    Ok(Value::Obj(type_obj.clone()))
}

/// The KnowHow method table, recorded into the bootstrap meta-object's
/// body and published as its shared table's method cache.
pub(crate) fn knowhow_method_table(rt: &Runtime) -> MethodCache {
    let mut table = MethodCache::default();
    let mut put = |name: &str, f: fn(&Runtime, &[Value]) -> ModelResult<Value>| {
        let name = rt.intern(name);
        table.insert(name.clone(), Value::native(name, f));
    };
    put("find_method", meta_find_method);
    put("type_check", meta_type_check);
    put("new_type", meta_new_type);
    put("add_method", meta_add_method);
    put("add_attribute", meta_add_attribute);
    put("methods", meta_methods);
    put("attributes", meta_attributes);
    put("name", meta_name);
    put("compose", meta_compose);
    table
}

// =============================================================================
// KnowHow-Attribute Native Methods
// =============================================================================

/// `new(attr_type, name)`: create a named attribute instance sharing the
/// attribute type's shared table.
fn attr_new(rt: &Runtime, args: &[Value]) -> ModelResult<Value> {
    let receiver = expect_obj(args, 0, "attribute type")?;
    let name = expect_str(args, 1, "attribute name")?;
    let stable = receiver.stable().ok_or_else(|| ModelError::Argument {
        message: "attribute type has no shared table".into(),
    })?;
    let attr = rt.wrap_object(&stable, Box::new(KnowHowAttributeBody::named(name.clone())));
    Ok(Value::Obj(attr))
}

/// `name(attr)`.
fn attr_name(_rt: &Runtime, args: &[Value]) -> ModelResult<Value> {
    let receiver = expect_obj(args, 0, "attribute")?;
    let body = receiver
        .body::<KnowHowAttributeBody>()
        .ok_or_else(|| ModelError::Argument {
            message: "receiver body is not a KnowHow-Attribute body".into(),
        })?;
    Ok(body.name().map(Value::Str).unwrap_or(Value::Null))
}

/// The KnowHow-Attribute method table.
pub(crate) fn knowhow_attribute_method_table(rt: &Runtime) -> MethodCache {
    let mut table = MethodCache::default();
    let mut put = |name: &str, f: fn(&Runtime, &[Value]) -> ModelResult<Value>| {
        let name = rt.intern(name);
        table.insert(name.clone(), Value::native(name, f));
    };
    put("new", attr_new);
    put("name", attr_name);
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::dispatch::NO_HINT;

    fn booted() -> (Runtime, ObjectHandle, ObjectHandle) {
        let rt = Runtime::new();
        let (knowhow, knowhow_attribute) = rt.initialize().unwrap();
        (rt, knowhow, knowhow_attribute)
    }

    fn call(rt: &Runtime, recv: &ObjectHandle, name: &str, args: &[Value]) -> ModelResult<Value> {
        let method = rt.find_method(recv, &rt.intern(name), NO_HINT)?;
        rt.invoke(&method, args)
    }

    #[test]
    fn test_new_type_yields_described_type() {
        let (rt, knowhow, _) = booted();
        let minted = call(
            &rt,
            &knowhow,
            "new_type",
            &[
                Value::Obj(knowhow.clone()),
                Value::Str(rt.intern("Point")),
                Value::Str(rt.intern("plain_attrs")),
            ],
        )
        .unwrap();
        let type_obj = minted.as_obj().unwrap();

        let how = type_obj.how().unwrap();
        let got = call(&rt, &how, "name", &[Value::Obj(how.clone())]).unwrap();
        assert_eq!(got, Value::Str(rt.intern("Point")));
        // The minted meta-object shares KnowHow's shared table.
        assert!(how.stable().unwrap().how().unwrap().ptr_eq(&knowhow));
    }

    #[test]
    fn test_compose_publishes_caches() {
        let (rt, knowhow, _) = booted();
        let minted = call(
            &rt,
            &knowhow,
            "new_type",
            &[
                Value::Obj(knowhow.clone()),
                Value::Str(rt.intern("Box")),
                Value::Str(rt.intern("plain_attrs")),
            ],
        )
        .unwrap();
        let type_obj = minted.as_obj().unwrap().clone();
        let how = type_obj.how().unwrap();

        call(
            &rt,
            &how,
            "add_method",
            &[
                Value::Obj(how.clone()),
                Value::Obj(type_obj.clone()),
                Value::Str(rt.intern("area")),
                Value::Int(99),
            ],
        )
        .unwrap();

        let st = type_obj.stable().unwrap();
        assert!(st.method_cache().is_none());

        call(
            &rt,
            &how,
            "compose",
            &[Value::Obj(how.clone()), Value::Obj(type_obj.clone())],
        )
        .unwrap();

        assert!(st.flags().contains(StableFlags::COMPOSED));
        assert_eq!(st.method_cache().unwrap().len(), 1);
        // Composed types answer type checks from the cache.
        assert!(rt.type_check(&type_obj, &type_obj).unwrap());
    }

    #[test]
    fn test_attribute_new_and_name_round_trip() {
        let (rt, _, knowhow_attribute) = booted();
        let attr = call(
            &rt,
            &knowhow_attribute,
            "new",
            &[
                Value::Obj(knowhow_attribute.clone()),
                Value::Str(rt.intern("x")),
            ],
        )
        .unwrap();
        let attr = attr.as_obj().unwrap();

        let got = call(&rt, attr, "name", &[Value::Obj(attr.clone())]).unwrap();
        assert_eq!(got, Value::Str(rt.intern("x")));
    }

    #[test]
    fn test_plain_attrs_body_storage() {
        let rt = Runtime::new();
        let body = PlainAttrsBody::new();
        assert!(body.is_empty());
        body.set(rt.intern("x"), Value::Int(3));
        assert_eq!(body.get(&rt.intern("x")), Some(Value::Int(3)));
        assert_eq!(body.get(&rt.intern("y")), None);
    }
}
