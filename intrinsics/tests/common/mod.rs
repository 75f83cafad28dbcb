//! Shared test helpers for intrinsic integration tests.

#![allow(dead_code)]

use std::collections::HashMap;

use keystone_intrinsics::{instantiate_module, IntrinsicError, IntrinsicModule};
use keystone_primitives::Value;
use keystone_runtime::{Compartment, CompartmentConfig, ModuleRef, Object, RuntimeError};

/// Install `env_logger` once so `RUST_LOG=debug` shows instantiation and
/// trap logs.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn compartment() -> Compartment {
    init_logging();
    Compartment::new(CompartmentConfig::default())
}

pub fn instantiate(
    compartment: &mut Compartment,
    module: &IntrinsicModule,
    debug_name: &str,
) -> Result<ModuleRef, IntrinsicError> {
    instantiate_module(compartment, module, debug_name, &HashMap::new())
}

pub fn instantiate_with(
    compartment: &mut Compartment,
    module: &IntrinsicModule,
    debug_name: &str,
    extra_exports: &[(&str, Object)],
) -> Result<ModuleRef, IntrinsicError> {
    let extra: HashMap<String, Object> = extra_exports
        .iter()
        .map(|(name, object)| (name.to_string(), *object))
        .collect();
    instantiate_module(compartment, module, debug_name, &extra)
}

/// Invoke the function export `name` of `instance` on a fresh context.
pub fn call(
    compartment: &mut Compartment,
    instance: ModuleRef,
    name: &str,
    args: &[Value],
) -> Result<Option<Value>, RuntimeError> {
    let function = compartment
        .module(instance)?
        .function(name)
        .unwrap_or_else(|| panic!("no function export `{}`", name));
    let mut context = compartment.create_context();
    compartment.invoke(&mut context, function, args)
}
