//! The engine's own intrinsic module.
//!
//! Compiled guest code calls these for the float operations whose NaN and
//! signed-zero behaviour native operators do not guarantee, and for the
//! shared trap sites: the generated code detects the faulting condition and
//! calls the matching trap function, which never returns.

use std::collections::HashMap;

use keystone_primitives::floats::{
    float_ceil, float_floor, float_max, float_min, float_nearest, float_trunc,
};
use keystone_runtime::{Caller, Compartment, ModuleRef, Trap, TrapKind};

use crate::error::IntrinsicError;
use crate::instantiate::instantiate_module;
use crate::module::IntrinsicModule;

/// Debug name of the built-in module and of its instances.
pub const DEBUG_NAME: &str = "builtinIntrinsics";

macro_rules! float_binary {
    ($($name:ident => $op:ident($ty:ty);)*) => {$(
        fn $name(_: &mut Caller<'_>, left: $ty, right: $ty) -> $ty {
            $op(left, right)
        }
    )*};
}

macro_rules! float_unary {
    ($($name:ident => $op:ident($ty:ty);)*) => {$(
        fn $name(_: &mut Caller<'_>, value: $ty) -> $ty {
            $op(value)
        }
    )*};
}

float_binary! {
    f32_min => float_min(f32);
    f64_min => float_min(f64);
    f32_max => float_max(f32);
    f64_max => float_max(f64);
}

float_unary! {
    f32_ceil => float_ceil(f32);
    f64_ceil => float_ceil(f64);
    f32_floor => float_floor(f32);
    f64_floor => float_floor(f64);
    f32_trunc => float_trunc(f32);
    f64_trunc => float_trunc(f64);
    f32_nearest => float_nearest(f32);
    f64_nearest => float_nearest(f64);
}

fn divide_by_zero_or_integer_overflow_trap(_: &mut Caller<'_>) -> Result<(), Trap> {
    Err(TrapKind::IntegerDivideByZeroOrOverflow.into())
}

fn unreachable_trap(_: &mut Caller<'_>) -> Result<(), Trap> {
    Err(TrapKind::ReachedUnreachableCode.into())
}

fn access_violation_trap(_: &mut Caller<'_>) -> Result<(), Trap> {
    Err(TrapKind::MemoryAddressOutOfBounds.into())
}

fn invalid_float_operation_trap(_: &mut Caller<'_>) -> Result<(), Trap> {
    Err(TrapKind::InvalidFloatOperation.into())
}

/// Not a trap: logs a marker and returns.
fn debug_break(_: &mut Caller<'_>) {
    log::debug!("================== {}.debugBreak", DEBUG_NAME);
}

/// Build the built-in intrinsic registry.
pub fn module() -> Result<IntrinsicModule, IntrinsicError> {
    let mut module = IntrinsicModule::new(DEBUG_NAME);
    module
        .function("f32.min", f32_min)?
        .function("f64.min", f64_min)?
        .function("f32.max", f32_max)?
        .function("f64.max", f64_max)?
        .function("f32.ceil", f32_ceil)?
        .function("f64.ceil", f64_ceil)?
        .function("f32.floor", f32_floor)?
        .function("f64.floor", f64_floor)?
        .function("f32.trunc", f32_trunc)?
        .function("f64.trunc", f64_trunc)?
        .function("f32.nearest", f32_nearest)?
        .function("f64.nearest", f64_nearest)?
        .function(
            "divideByZeroOrIntegerOverflowTrap",
            divide_by_zero_or_integer_overflow_trap,
        )?
        .function("unreachableTrap", unreachable_trap)?
        .function("accessViolationTrap", access_violation_trap)?
        .function("invalidFloatOperationTrap", invalid_float_operation_trap)?
        .function("debugBreak", debug_break)?;
    Ok(module)
}

/// Instantiate the built-in registry into `compartment` with no extra
/// exports.
pub fn instantiate(
    compartment: &mut Compartment,
    module: &IntrinsicModule,
) -> Result<ModuleRef, IntrinsicError> {
    instantiate_module(compartment, module, DEBUG_NAME, &HashMap::new())
}
