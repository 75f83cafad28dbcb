//! Validation of value, memory, and table types against a feature set.
//!
//! Intrinsic memories and tables are checked twice: their size bounds when
//! they are registered, and their feature requirements when they are
//! instantiated into a compartment whose configuration decides which
//! features are on.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::{MemoryType, ReferenceType, SizeConstraints, TableType, ValueType};
use crate::types::{MAX_MEMORY_PAGES, MAX_TABLE_ELEMS};

/// Which optional parts of the instruction set are enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureSpec {
    pub mvp: bool,
    pub simd: bool,
    pub reference_types: bool,
    /// Shared memories.
    pub atomics: bool,
    pub shared_tables: bool,
}

impl Default for FeatureSpec {
    fn default() -> Self {
        Self {
            mvp: true,
            simd: false,
            reference_types: true,
            atomics: false,
            shared_tables: false,
        }
    }
}

impl FeatureSpec {
    /// Every feature enabled.
    pub fn all() -> Self {
        Self {
            mvp: true,
            simd: true,
            reference_types: true,
            atomics: true,
            shared_tables: true,
        }
    }
}

pub fn validate_value_type(features: &FeatureSpec, ty: ValueType) -> Result<(), ValidationError> {
    let enabled = match ty {
        ValueType::I32 | ValueType::I64 | ValueType::F32 | ValueType::F64 => features.mvp,
        ValueType::V128 => features.simd,
        ValueType::AnyRef => features.reference_types,
        ValueType::FuncRef => features.mvp,
    };
    if enabled {
        Ok(())
    } else {
        Err(ValidationError::UnsupportedValueType(ty))
    }
}

/// Check `min <= max <= limit`, treating an absent maximum as `limit`.
pub fn validate_size(size: SizeConstraints, limit: u64) -> Result<(), ValidationError> {
    let max = size.effective_max(limit);
    if size.min > max {
        return Err(ValidationError::DisjointBounds { min: size.min, max });
    }
    if max > limit {
        return Err(ValidationError::MaximumTooLarge { max, limit });
    }
    Ok(())
}

pub fn validate_memory_type(
    features: &FeatureSpec,
    ty: &MemoryType,
) -> Result<(), ValidationError> {
    validate_size(ty.size, MAX_MEMORY_PAGES)?;
    if ty.shared {
        if !features.atomics {
            return Err(ValidationError::FeatureRequired {
                context: "shared memory",
                feature: "atomics",
            });
        }
        if ty.size.max.is_none() {
            return Err(ValidationError::SharedWithoutMaximum("memories"));
        }
    }
    Ok(())
}

pub fn validate_table_type(features: &FeatureSpec, ty: &TableType) -> Result<(), ValidationError> {
    if ty.element == ReferenceType::AnyRef && !features.reference_types {
        return Err(ValidationError::UnsupportedValueType(ValueType::AnyRef));
    }
    validate_size(ty.size, MAX_TABLE_ELEMS)?;
    if ty.shared {
        if !features.shared_tables {
            return Err(ValidationError::FeatureRequired {
                context: "shared table",
                feature: "shared tables",
            });
        }
        if ty.size.max.is_none() {
            return Err(ValidationError::SharedWithoutMaximum("tables"));
        }
    }
    Ok(())
}
