//! Error types for type validation.

use crate::types::ValueType;

/// A type that cannot be used under the active feature set or limits.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// `min` is larger than `max`.
    #[error("disjoint size bounds: min {min} > max {max}")]
    DisjointBounds { min: u64, max: u64 },

    /// The declared (or implied) maximum exceeds what the engine supports.
    #[error("maximum size {max} exceeds limit {limit}")]
    MaximumTooLarge { max: u64, limit: u64 },

    /// A value kind gated behind a disabled feature.
    #[error("invalid value type {0}: feature not enabled")]
    UnsupportedValueType(ValueType),

    /// A construct that needs a feature the configuration does not enable.
    #[error("{context} requires the {feature} feature")]
    FeatureRequired {
        context: &'static str,
        feature: &'static str,
    },

    /// Shared memories and tables must declare a maximum size.
    #[error("shared {0} must have a maximum size")]
    SharedWithoutMaximum(&'static str),
}
