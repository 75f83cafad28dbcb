//! `keystone-runtime` — compartments and the guest-call boundary.
//!
//! This crate owns the object model host intrinsics are bound into:
//!
//! - **Compartments:** arena-owned isolation domains; handles never cross them
//! - **Instances:** functions, globals, bounds-checked memories, tables, and
//!   module instances with named exports
//! - **Calling conventions:** plain, implicit default memory/table, and
//!   result handoff through the per-context runtime data
//! - **Traps:** propagated as `Err(Trap)` through every frame and converted to
//!   [`RuntimeError`] at [`Compartment::invoke`] or [`catch_traps`]
//!
//! The primary entry point is [`Compartment::invoke`].

pub mod error;
pub mod config;
pub mod trap;
pub mod instance;
pub mod memory;
pub mod table;
pub mod global;
pub mod function;
pub mod context;
pub mod compartment;

pub use error::RuntimeError;
pub use config::{CompartmentConfig, DEFAULT_MAX_TABLE_ELEMS};
pub use trap::{catch_traps, Trap, TrapKind};
pub use instance::{
    FunctionRef, GlobalRef, MemoryRef, ModuleInstance, ModuleRef, Object, ObjectKind, TableRef,
};
pub use memory::MemoryInstance;
pub use table::TableInstance;
pub use global::GlobalInstance;
pub use function::{FunctionInstance, NativeFunction};
pub use context::{
    result_in_context_runtime_data, Caller, Context, ContextRuntimeData, MemoryIdArg,
    ResultInContextRuntimeData, TableIdArg, CONTEXT_RUNTIME_DATA_SIZE,
};
pub use compartment::{Checkpoint, Compartment, CompartmentId};
