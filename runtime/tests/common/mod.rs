//! Shared test helpers for runtime integration tests.
//!
//! The runtime crate has no signature inference of its own, so these helpers
//! bind hand-written untyped entry points directly.

#![allow(dead_code)]

use keystone_primitives::{FunctionType, UntaggedValue, Value, ValueType};
use keystone_runtime::{
    Caller, Compartment, CompartmentConfig, FunctionInstance, FunctionRef, MemoryRef,
    NativeFunction, TableRef, Trap,
};

/// Install `env_logger` once so `RUST_LOG=debug` shows runtime logs.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn compartment() -> Compartment {
    init_logging();
    Compartment::new(CompartmentConfig::default())
}

/// Bind a plain host function with an explicit signature.
pub fn bind_plain<F>(
    compartment: &mut Compartment,
    name: &str,
    signature: FunctionType,
    entry: F,
) -> FunctionRef
where
    F: Fn(&mut Caller<'_>, &[UntaggedValue]) -> Result<Option<Value>, Trap> + Send + Sync + 'static,
{
    compartment.create_function(FunctionInstance::new(
        name,
        signature,
        NativeFunction::plain(entry),
        None,
        None,
    ))
}

/// Bind a memory-and-table host function whose defaults are `memory` and
/// `table`.
pub fn bind_with_defaults<F>(
    compartment: &mut Compartment,
    name: &str,
    signature: FunctionType,
    memory: Option<MemoryRef>,
    table: Option<TableRef>,
    entry: F,
) -> FunctionRef
where
    F: Fn(
            &mut Caller<'_>,
            keystone_runtime::MemoryIdArg,
            keystone_runtime::TableIdArg,
            &[UntaggedValue],
        ) -> Result<Option<Value>, Trap>
        + Send
        + Sync
        + 'static,
{
    compartment.create_function(FunctionInstance::new(
        name,
        signature,
        NativeFunction::with_memory_and_table(entry),
        memory,
        table,
    ))
}

/// `(i32, i32) -> (i32)` wrapping addition.
pub fn bind_add(compartment: &mut Compartment) -> FunctionRef {
    bind_plain(
        compartment,
        "add",
        FunctionType::new([ValueType::I32], [ValueType::I32, ValueType::I32]),
        |_, args| {
            let a = args[0].0 as i32;
            let b = args[1].0 as i32;
            Ok(Some(Value::I32(a.wrapping_add(b))))
        },
    )
}
