//! Guest-visible types: value kinds, function signatures, and the shapes of
//! memories, tables, and globals.
//!
//! These types describe *what* a guest sees. They carry no storage; the
//! runtime allocates memories and tables from them at instantiation time.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Size of one linear-memory page in bytes (64 KiB).
pub const PAGE_SIZE: usize = 65_536;

/// Largest number of pages a 32-bit linear memory may declare.
pub const MAX_MEMORY_PAGES: u64 = 65_536;

/// Largest number of elements a table may declare.
pub const MAX_TABLE_ELEMS: u64 = u32::MAX as u64;

/// The kind of a single guest value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    I32,
    I64,
    F32,
    F64,
    V128,
    AnyRef,
    FuncRef,
}

impl ValueType {
    /// Stable single-byte tag, used when hashing signatures.
    pub fn tag(self) -> u8 {
        match self {
            Self::I32 => 0x7f,
            Self::I64 => 0x7e,
            Self::F32 => 0x7d,
            Self::F64 => 0x7c,
            Self::V128 => 0x7b,
            Self::FuncRef => 0x70,
            Self::AnyRef => 0x6f,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::V128 => "v128",
            Self::AnyRef => "anyref",
            Self::FuncRef => "funcref",
        };
        f.write_str(name)
    }
}

/// Element kind of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceType {
    FuncRef,
    AnyRef,
}

impl From<ReferenceType> for ValueType {
    fn from(ty: ReferenceType) -> Self {
        match ty {
            ReferenceType::FuncRef => ValueType::FuncRef,
            ReferenceType::AnyRef => ValueType::AnyRef,
        }
    }
}

/// An ordered list of value kinds (a parameter list or a result list).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeTuple(Vec<ValueType>);

impl TypeTuple {
    pub fn new(types: Vec<ValueType>) -> Self {
        Self(types)
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn as_slice(&self) -> &[ValueType] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, ValueType> {
        self.0.iter()
    }
}

impl From<Vec<ValueType>> for TypeTuple {
    fn from(types: Vec<ValueType>) -> Self {
        Self(types)
    }
}

impl<const N: usize> From<[ValueType; N]> for TypeTuple {
    fn from(types: [ValueType; N]) -> Self {
        Self(types.to_vec())
    }
}

impl fmt::Display for TypeTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, ty) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", ty)?;
        }
        f.write_str(")")
    }
}

/// A guest function signature: ordered results and ordered parameters.
///
/// The default value is the empty signature `() -> ()`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionType {
    results: TypeTuple,
    params: TypeTuple,
}

impl FunctionType {
    /// Create a signature. Argument order follows the IR convention:
    /// results first, then parameters.
    pub fn new(results: impl Into<TypeTuple>, params: impl Into<TypeTuple>) -> Self {
        Self {
            results: results.into(),
            params: params.into(),
        }
    }

    pub fn results(&self) -> &TypeTuple {
        &self.results
    }

    pub fn params(&self) -> &TypeTuple {
        &self.params
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.params, self.results)
    }
}

/// How a host function receives its arguments and hands back its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CallingConvention {
    /// `(context, args...) -> result`
    Plain,
    /// `(context, default memory, default table, args...) -> result`; the
    /// memory and table arguments are not part of the guest signature.
    WithMemoryAndTable,
    /// `(context, args...) -> marker`; the result travels through the
    /// context's runtime data buffer.
    WithContextSwitch,
}

impl CallingConvention {
    pub fn tag(self) -> u8 {
        match self {
            Self::Plain => 0,
            Self::WithMemoryAndTable => 1,
            Self::WithContextSwitch => 2,
        }
    }
}

impl fmt::Display for CallingConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Plain => "plain",
            Self::WithMemoryAndTable => "withMemoryAndTable",
            Self::WithContextSwitch => "withContextSwitch",
        };
        f.write_str(name)
    }
}

/// Minimum and optional maximum size, in pages (memories) or elements (tables).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SizeConstraints {
    pub min: u64,
    pub max: Option<u64>,
}

impl SizeConstraints {
    pub fn new(min: u64, max: Option<u64>) -> Self {
        Self { min, max }
    }

    /// `max` with an unbounded maximum replaced by `limit`.
    pub fn effective_max(&self, limit: u64) -> u64 {
        self.max.unwrap_or(limit)
    }
}

/// Shape and limits of a linear memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryType {
    pub size: SizeConstraints,
    #[serde(default)]
    pub shared: bool,
}

impl MemoryType {
    pub fn new(min_pages: u64, max_pages: Option<u64>) -> Self {
        Self {
            size: SizeConstraints::new(min_pages, max_pages),
            shared: false,
        }
    }
}

/// Shape and limits of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableType {
    pub element: ReferenceType,
    pub size: SizeConstraints,
    #[serde(default)]
    pub shared: bool,
}

impl TableType {
    pub fn new(element: ReferenceType, min: u64, max: Option<u64>) -> Self {
        Self {
            element,
            size: SizeConstraints::new(min, max),
            shared: false,
        }
    }
}

/// Value kind and mutability of a global.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GlobalType {
    pub value: ValueType,
    pub mutable: bool,
}

impl GlobalType {
    pub fn immutable(value: ValueType) -> Self {
        Self {
            value,
            mutable: false,
        }
    }

    pub fn mutable(value: ValueType) -> Self {
        Self {
            value,
            mutable: true,
        }
    }
}
