//! Traps and the trap boundary.
//!
//! A trap is a fatal condition raised while guest code runs. It is carried as
//! the `Err` side of every guest-call result and propagated with `?` through
//! each frame until it reaches a boundary ([`catch_traps`] or
//! [`Compartment::invoke`](crate::Compartment::invoke)), where it becomes a
//! [`RuntimeError::Trap`]. Nothing after the trapping call in any of the
//! unwound frames runs, and values owned by those frames are dropped on the
//! way out.

use std::fmt;
use std::sync::Arc;

use crate::error::RuntimeError;

/// The fatal conditions an embedder can catch and report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrapKind {
    IntegerDivideByZeroOrOverflow,
    ReachedUnreachableCode,
    MemoryAddressOutOfBounds,
    InvalidFloatOperation,
    /// A call through a table reached a function of the wrong type.
    IndirectCallSignatureMismatch,
    /// A call through a table reached an empty or out-of-range element.
    UndefinedTableElement,
}

impl TrapKind {
    /// Stable identifier, part of the embedder-facing surface.
    pub fn name(self) -> &'static str {
        match self {
            Self::IntegerDivideByZeroOrOverflow => "integerDivideByZeroOrOverflow",
            Self::ReachedUnreachableCode => "reachedUnreachableCode",
            Self::MemoryAddressOutOfBounds => "memoryAddressOutOfBounds",
            Self::InvalidFloatOperation => "invalidFloatOperation",
            Self::IndirectCallSignatureMismatch => "indirectCallSignatureMismatch",
            Self::UndefinedTableElement => "undefinedTableElement",
        }
    }
}

impl fmt::Display for TrapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let description = match self {
            Self::IntegerDivideByZeroOrOverflow => "integer divide by zero or signed overflow",
            Self::ReachedUnreachableCode => "reached unreachable code",
            Self::MemoryAddressOutOfBounds => "memory address out of bounds",
            Self::InvalidFloatOperation => "invalid float operation",
            Self::IndirectCallSignatureMismatch => "indirect call signature mismatch",
            Self::UndefinedTableElement => "undefined table element",
        };
        f.write_str(description)
    }
}

/// A trap in flight, with the frames it has unwound through so far.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}")]
pub struct Trap {
    kind: TrapKind,
    frames: Vec<Arc<str>>,
}

impl Trap {
    pub fn new(kind: TrapKind) -> Self {
        Self {
            kind,
            frames: Vec::new(),
        }
    }

    pub fn kind(&self) -> TrapKind {
        self.kind
    }

    /// Debug names of the unwound function frames, innermost first.
    pub fn frames(&self) -> &[Arc<str>] {
        &self.frames
    }

    /// Record that the trap unwound through the frame named `name`.
    pub fn with_frame(mut self, name: Arc<str>) -> Self {
        self.frames.push(name);
        self
    }
}

impl From<TrapKind> for Trap {
    fn from(kind: TrapKind) -> Self {
        Self::new(kind)
    }
}

/// Run `guarded` as a top-level guest invocation, converting a trap that
/// unwinds out of it into a [`RuntimeError`].
pub fn catch_traps<T>(guarded: impl FnOnce() -> Result<T, Trap>) -> Result<T, RuntimeError> {
    guarded().map_err(|trap| {
        log::debug!(
            "trap {} reached boundary after unwinding {} frame(s)",
            trap.kind().name(),
            trap.frames().len()
        );
        RuntimeError::Trap(trap)
    })
}
