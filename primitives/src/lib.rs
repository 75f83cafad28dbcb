//! `keystone-primitives` — foundational types for the Keystone engine.
//!
//! This crate provides the guest-visible type system (value kinds, function
//! signatures, memory/table/global types and the calling-convention tag),
//! typed values with bit-exact float storage, type validation against a
//! feature set, and the float semantics the instruction set requires.
//!
//! It has no knowledge of compartments or instances; `keystone-runtime`
//! builds the object model on top of it.

pub mod types;
pub mod value;
pub mod error;
pub mod validation;
pub mod floats;

// Re-export commonly used types at the crate root for convenience.
pub use types::{
    CallingConvention, FunctionType, GlobalType, MemoryType, ReferenceType, SizeConstraints,
    TableType, TypeTuple, ValueType, MAX_MEMORY_PAGES, MAX_TABLE_ELEMS, PAGE_SIZE,
};
pub use value::{NativeValue, UntaggedValue, Value, V128};
pub use error::ValidationError;
pub use validation::FeatureSpec;
