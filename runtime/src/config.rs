//! Compartment configuration.

use keystone_primitives::{FeatureSpec, MAX_MEMORY_PAGES};
use serde::{Deserialize, Serialize};

/// Default cap on table elements. Tables are allocated eagerly, so this
/// stays well below the `u32::MAX` the type system allows.
pub const DEFAULT_MAX_TABLE_ELEMS: u64 = 10_000_000;

/// Configuration for a compartment.
///
/// Controls which instruction-set features the compartment's memories and
/// tables may use, and how large they may get.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompartmentConfig {
    /// Enabled instruction-set features.
    pub features: FeatureSpec,

    /// Maximum linear memory pages (1 page = 64 KiB) for any memory.
    /// Default: 65536 pages = 4 GiB.
    pub max_memory_pages: u64,

    /// Maximum number of elements for any table.
    /// Default: [`DEFAULT_MAX_TABLE_ELEMS`].
    pub max_table_elems: u64,
}

impl Default for CompartmentConfig {
    fn default() -> Self {
        Self {
            features: FeatureSpec::default(),
            max_memory_pages: MAX_MEMORY_PAGES,
            max_table_elems: DEFAULT_MAX_TABLE_ELEMS,
        }
    }
}
