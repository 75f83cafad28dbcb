//! `keystone-intrinsics` — host-implemented modules for Keystone guests.
//!
//! This crate exposes host functions, globals, memories, and tables to
//! guest code as if they were exports of an ordinary module. It provides:
//!
//! - `PlainCallable`, `MemoryTableCallable`, `ContextSwitchCallable` —
//!   guest signatures inferred from native Rust signatures at compile time
//! - `IntrinsicModule` — an explicitly built, read-only-after-registration
//!   registry of intrinsic descriptors
//! - `instantiate_module` — all-or-nothing binding of a registry into a
//!   compartment as a module instance
//! - `builtin` — the engine's float intrinsics and shared trap sites
//! - `IntrinsicError` — registration and instantiation failures
//!
//! Runtime objects, calling-convention dispatch and traps live in
//! `keystone-runtime`.

pub mod error;
pub mod callable;
pub mod module;
pub mod instantiate;
pub mod builtin;

// Re-export commonly used types at the crate root.
pub use error::IntrinsicError;
pub use callable::{
    ContextSwitchCallable, ContextSwitchResult, IntrinsicResult, MemoryTableCallable,
    PlainCallable,
};
pub use module::{IntrinsicFunction, IntrinsicGlobal, IntrinsicMemory, IntrinsicModule, IntrinsicTable};
pub use instantiate::instantiate_module;
