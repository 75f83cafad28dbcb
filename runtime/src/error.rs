//! Runtime error types.

use keystone_primitives::{FunctionType, ValidationError, ValueType};

use crate::instance::ObjectKind;
use crate::trap::Trap;

/// Top-level error type for the runtime crate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeError {
    /// Guest execution trapped; the trap unwound to the invocation boundary.
    #[error("guest trapped: {0}")]
    Trap(#[from] Trap),

    /// A handle was used with a compartment other than the one that owns it.
    #[error("{0} belongs to a different compartment")]
    ForeignObject(ObjectKind),

    /// A handle refers to an object removed by a compartment rollback.
    #[error("{0} handle no longer refers to a live object")]
    StaleHandle(ObjectKind),

    /// Arguments passed to an invocation do not match the signature.
    #[error("signature mismatch: expected {expected}, got arguments {got:?}")]
    SignatureMismatch {
        expected: FunctionType,
        got: Vec<ValueType>,
    },

    /// A value of the wrong kind was stored into a global.
    #[error("type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: ValueType, got: ValueType },

    /// Attempt to set an immutable global.
    #[error("attempting to mutate immutable global")]
    ImmutableGlobal,

    /// A value kind that cannot be held by a global.
    #[error("globals of type {0} are not supported")]
    UnsupportedGlobalType(ValueType),

    /// A memory or table type rejected by the compartment's feature set.
    #[error("invalid type: {0}")]
    InvalidType(#[from] ValidationError),

    /// A memory or table larger than the compartment allows.
    #[error("{what} of {requested} exceeds the compartment limit of {limit}")]
    ResourceLimit {
        what: &'static str,
        requested: u64,
        limit: u64,
    },

    /// The host could not allocate the initial storage of a memory or table.
    #[error("failed to allocate {bytes} bytes for {what}")]
    OutOfMemory { what: &'static str, bytes: u64 },

    /// Table access outside the table's current size.
    #[error("table index {index} out of bounds (size {size})")]
    TableIndexOutOfBounds { index: u64, size: u64 },
}
