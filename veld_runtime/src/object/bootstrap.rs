//! The KnowHow bootstrap.
//!
//! Before any user-level type can exist, the meta-object system must be
//! able to describe itself: the meta-object of the meta-object is itself.
//! That fixed point cannot be expressed in a single construction step, so
//! the bootstrap allocates KnowHow's shared table with a deferred
//! meta-object reference and patches it once the backing object exists.
//!
//! The steps run strictly in order; each depends on the previous one.
//! Any failure is fatal — the runtime cannot proceed without a closed
//! meta-object loop.

use crate::object::ObjectHandle;
use crate::object::knowhow::{
    self, KnowHowAttributeRepr, KnowHowBody, KnowHowRepr, PlainAttrsRepr,
};
use crate::object::stable::SharedTable;
use crate::runtime::Runtime;
use crate::sc::CORE_CONTEXT_NAME;
use std::sync::Arc;
use veld_core::{ModelError, ModelResult};

fn fatal(step: &str, err: ModelError) -> ModelError {
    ModelError::Bootstrap {
        message: format!("{}: {}", step, err),
    }
}

pub(crate) fn bootstrap(rt: &Runtime) -> ModelResult<(ObjectHandle, ObjectHandle)> {
    // 1. Reserved core serialization context.
    let core = rt
        .register_context(CORE_CONTEXT_NAME)
        .map_err(|e| fatal("core context", e))?;

    // 2. Builtin representations.
    rt.register_representation("knowhow", Arc::new(KnowHowRepr))
        .map_err(|e| fatal("representation registry", e))?;
    rt.register_representation("knowhow_attribute", Arc::new(KnowHowAttributeRepr))
        .map_err(|e| fatal("representation registry", e))?;
    rt.register_representation("plain_attrs", Arc::new(PlainAttrsRepr))
        .map_err(|e| fatal("representation registry", e))?;

    let knowhow_repr = rt
        .representation("knowhow")
        .map_err(|e| fatal("representation lookup", e))?;
    let attribute_repr = rt
        .representation("knowhow_attribute")
        .map_err(|e| fatal("representation lookup", e))?;

    // 3. KnowHow's shared table and backing object, meta-object deferred.
    let st_know = SharedTable::deferred(knowhow_repr);
    let knowhow = rt.wrap_object(
        &st_know,
        Box::new(KnowHowBody::named(rt.intern("KnowHow"))),
    );

    // 4. Close the fixed point: KnowHow's type is described by a KnowHow
    // instance — this one.
    st_know.bind_how(knowhow.clone());

    // Record the method suite in the body, then publish it as the shared
    // table's cache so fallback resolution terminates at the root.
    let method_table = knowhow::knowhow_method_table(rt);
    {
        let body = knowhow
            .body::<KnowHowBody>()
            .ok_or_else(|| fatal(
                "knowhow body",
                ModelError::Argument {
                    message: "allocated body is not a KnowHow body".into(),
                },
            ))?;
        for (name, method) in method_table.iter() {
            body.add_method(name.clone(), method.clone());
        }
    }
    st_know.publish_method_cache(method_table);

    // 5. KnowHow-Attribute, described by KnowHow.
    let st_attr = rt.create_shared_table(&attribute_repr, &knowhow);
    let knowhow_attribute = rt.wrap_object(&st_attr, attribute_repr.allocate());
    st_attr.publish_method_cache(knowhow::knowhow_attribute_method_table(rt));

    // Identity registration: everything minted here lives in the core
    // context for later cross-module reference resolution.
    core.add_stable(st_know);
    core.add_stable(st_attr);
    core.add_object(knowhow.clone());
    core.add_object(knowhow_attribute.clone());

    log::debug!("bootstrapped meta-object core (knowhow + knowhow_attribute)");
    Ok((knowhow, knowhow_attribute))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_point_holds() {
        let rt = Runtime::new();
        let (knowhow, _) = rt.initialize().unwrap();
        let how_of_how = knowhow.stable().unwrap().how().unwrap();
        assert!(how_of_how.ptr_eq(&knowhow));
    }

    #[test]
    fn test_attribute_described_by_knowhow() {
        let rt = Runtime::new();
        let (knowhow, knowhow_attribute) = rt.initialize().unwrap();
        let how = knowhow_attribute.stable().unwrap().how().unwrap();
        assert!(how.ptr_eq(&knowhow));
    }

    #[test]
    fn test_core_context_owns_bootstrap_artifacts() {
        let rt = Runtime::new();
        rt.initialize().unwrap();
        let core = rt.context(CORE_CONTEXT_NAME).unwrap();
        assert_eq!(core.stable_count(), 2);
        assert_eq!(core.object_count(), 2);
    }
}
