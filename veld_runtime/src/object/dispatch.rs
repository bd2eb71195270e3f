//! Default method dispatch and type check engines.
//!
//! Both engines are installed on every shared table at construction and
//! may be overridden per type. Tier ordering trades cache-population cost
//! for dispatch speed: the hint tier avoids all hashing, the cache tier
//! avoids a meta-object round trip, and the fallback tier guarantees
//! correctness. Tier order is a performance optimization, never a retry
//! strategy — no tier swallows a fallback error to try another tier.
//!
//! Termination of the fallback tier relies on a populated method cache at
//! the root of the meta-object chain; the bootstrap guarantees one.

use crate::object::ObjectHandle;
use crate::object::stable::{SharedTable, StableFlags};
use crate::runtime::Runtime;
use crate::value::Value;
use std::sync::Arc;
use veld_core::{InternedString, ModelError, ModelResult};

/// Hint value meaning "no vtable hint available".
pub const NO_HINT: u32 = u32::MAX;

fn stable_of(obj: &ObjectHandle, what: &str) -> ModelResult<Arc<SharedTable>> {
    obj.stable().ok_or_else(|| ModelError::MethodResolution {
        message: format!("{} is a bare representation handle", what),
    })
}

/// Resolve the meta-object's own capability method (its `find_method` or
/// `type_check`), going through the meta-object's shared table.
fn meta_capability(
    rt: &Runtime,
    how: &ObjectHandle,
    name: &InternedString,
) -> ModelResult<Value> {
    let how_stable = how.stable().ok_or_else(|| ModelError::MethodResolution {
        message: "meta-object is a bare representation handle".into(),
    })?;
    how_stable.find_method(rt, how, name, NO_HINT)
}

// =============================================================================
// Method Dispatch
// =============================================================================

/// Default method dispatch: vtable hint, then method cache, then
/// meta-object fallback.
///
/// The fallback invokes `meta.find_method(meta, obj, name)` and may run
/// arbitrary meta-object-level code; the engine imposes no timeout. A
/// `NoSuchMethod` outcome produced by the meta-object for `name` is
/// propagated unchanged.
pub fn default_find_method(
    rt: &Runtime,
    obj: &ObjectHandle,
    name: &InternedString,
    hint: u32,
) -> ModelResult<Value> {
    let stable = stable_of(obj, "dispatch receiver")?;

    // Hint tier: no name comparison at all.
    if hint != NO_HINT {
        if let Some(vtable) = stable.vtable() {
            if (hint as usize) < vtable.len() {
                return Ok(vtable[hint as usize].clone());
            }
        }
    }

    // Cache tier.
    if let Some(cache) = stable.method_cache() {
        if let Some(found) = cache.get(name) {
            return Ok(found.clone());
        }
        if stable.flags().contains(StableFlags::METHOD_CACHE_AUTHORITATIVE) {
            return Err(ModelError::NoSuchMethod {
                name: name.as_str().to_owned(),
            });
        }
    }

    // Fallback tier: delegate to the meta-object.
    let how = stable.how().ok_or_else(|| ModelError::MethodResolution {
        message: "shared table has no meta-object".into(),
    })?;
    let finder = meta_capability(rt, &how, &rt.names().find_method).map_err(|err| match err {
        ModelError::NoSuchMethod { .. } => ModelError::MethodResolution {
            message: "no method cache and no find_method method in meta-object".into(),
        },
        other => other,
    })?;
    rt.invoke(
        &finder,
        &[
            Value::Obj(how.clone()),
            Value::Obj(obj.clone()),
            Value::Str(name.clone()),
        ],
    )
}

// =============================================================================
// Type Check
// =============================================================================

/// Default type check: cache scan, or meta-object fallback.
///
/// A present cache is authoritative and exhaustive — a miss answers
/// `false` without consulting the meta-object. Only when no cache exists
/// does the engine invoke `meta.type_check(meta, obj, candidate)` and
/// coerce the result to boolean.
pub fn default_type_check(
    rt: &Runtime,
    obj: &ObjectHandle,
    candidate: &ObjectHandle,
) -> ModelResult<bool> {
    let stable = obj.stable().ok_or_else(|| ModelError::TypeCheck {
        message: "type check receiver is a bare representation handle".into(),
    })?;

    if let Some(cache) = stable.type_check_cache() {
        return Ok(cache.iter().any(|t| t.ptr_eq(candidate)));
    }

    let how = stable.how().ok_or_else(|| ModelError::TypeCheck {
        message: "shared table has no meta-object".into(),
    })?;
    let checker = meta_capability(rt, &how, &rt.names().type_check).map_err(|err| match err {
        ModelError::NoSuchMethod { .. } => ModelError::TypeCheck {
            message: "no type check cache and no type_check method in meta-object".into(),
        },
        ModelError::MethodResolution { message } => ModelError::TypeCheck { message },
        other => other,
    })?;
    let verdict = rt.invoke(
        &checker,
        &[
            Value::Obj(how.clone()),
            Value::Obj(obj.clone()),
            Value::Obj(candidate.clone()),
        ],
    )?;
    Ok(verdict.truthy())
}
