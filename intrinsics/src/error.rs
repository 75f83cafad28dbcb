//! Registration and instantiation errors.
//!
//! These are build-time failures surfaced to the embedder. Traps raised by
//! intrinsics while guest code runs are not represented here; they travel as
//! [`keystone_runtime::Trap`] and surface as [`RuntimeError::Trap`].

use keystone_primitives::ValidationError;
use keystone_runtime::{ObjectKind, RuntimeError};

/// Error returned when registering into or instantiating an intrinsic module.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IntrinsicError {
    #[error("intrinsic function `{0}` is already registered")]
    DuplicateFunction(String),

    #[error("intrinsic global `{0}` is already registered")]
    DuplicateGlobal(String),

    #[error("intrinsic memory `{0}` is already registered")]
    DuplicateMemory(String),

    #[error("intrinsic table `{0}` is already registered")]
    DuplicateTable(String),

    /// Two exports of one module instance share a name.
    #[error("duplicate export `{name}` ({existing} and {added})")]
    DuplicateExport {
        name: String,
        existing: ObjectKind,
        added: ObjectKind,
    },

    /// A registered memory or table type is malformed.
    #[error("invalid type for intrinsic `{name}`: {source}")]
    InvalidType {
        name: String,
        source: ValidationError,
    },

    /// An extra export lives in a different compartment than the target.
    #[error("extra export `{0}` belongs to a different compartment")]
    ForeignExport(String),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}
