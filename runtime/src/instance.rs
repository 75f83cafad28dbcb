//! Object handles and module instances.
//!
//! Every runtime object lives in the arena of exactly one [`Compartment`];
//! handles are `(compartment, index, generation)` triples and are only
//! honoured by the compartment that issued them, and only while the slot
//! they name still holds the object they were issued for.
//!
//! [`Compartment`]: crate::Compartment

use std::collections::HashMap;
use std::fmt;

use crate::compartment::CompartmentId;

/// The kind of a runtime object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Function,
    Global,
    Memory,
    Table,
    Module,
    Context,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Function => "function",
            Self::Global => "global",
            Self::Memory => "memory",
            Self::Table => "table",
            Self::Module => "module instance",
            Self::Context => "execution context",
        };
        f.write_str(name)
    }
}

macro_rules! object_handle {
    ($(#[$meta:meta])* $name:ident => $kind:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name {
            compartment: CompartmentId,
            index: usize,
            generation: u64,
        }

        impl $name {
            pub(crate) fn new(
                compartment: CompartmentId,
                index: usize,
                generation: u64,
            ) -> Self {
                Self {
                    compartment,
                    index,
                    generation,
                }
            }

            /// The compartment that owns the object.
            pub fn compartment(&self) -> CompartmentId {
                self.compartment
            }

            pub(crate) fn index(&self) -> usize {
                self.index
            }

            pub(crate) fn generation(&self) -> u64 {
                self.generation
            }

            pub const KIND: ObjectKind = ObjectKind::$kind;
        }
    };
}

object_handle!(
    /// Handle to a function instance.
    FunctionRef => Function
);
object_handle!(
    /// Handle to a global instance.
    GlobalRef => Global
);
object_handle!(
    /// Handle to a memory instance.
    MemoryRef => Memory
);
object_handle!(
    /// Handle to a table instance.
    TableRef => Table
);
object_handle!(
    /// Handle to a module instance.
    ModuleRef => Module
);

/// Any exportable runtime object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Object {
    Function(FunctionRef),
    Global(GlobalRef),
    Memory(MemoryRef),
    Table(TableRef),
}

impl Object {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Function(_) => ObjectKind::Function,
            Self::Global(_) => ObjectKind::Global,
            Self::Memory(_) => ObjectKind::Memory,
            Self::Table(_) => ObjectKind::Table,
        }
    }

    pub fn compartment(&self) -> CompartmentId {
        match self {
            Self::Function(f) => f.compartment(),
            Self::Global(g) => g.compartment(),
            Self::Memory(m) => m.compartment(),
            Self::Table(t) => t.compartment(),
        }
    }

    pub fn as_function(&self) -> Option<FunctionRef> {
        match *self {
            Self::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_global(&self) -> Option<GlobalRef> {
        match *self {
            Self::Global(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_memory(&self) -> Option<MemoryRef> {
        match *self {
            Self::Memory(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<TableRef> {
        match *self {
            Self::Table(t) => Some(t),
            _ => None,
        }
    }
}

impl From<FunctionRef> for Object {
    fn from(f: FunctionRef) -> Self {
        Self::Function(f)
    }
}

impl From<GlobalRef> for Object {
    fn from(g: GlobalRef) -> Self {
        Self::Global(g)
    }
}

impl From<MemoryRef> for Object {
    fn from(m: MemoryRef) -> Self {
        Self::Memory(m)
    }
}

impl From<TableRef> for Object {
    fn from(t: TableRef) -> Self {
        Self::Table(t)
    }
}

/// An instantiated module: a named set of exports plus the memory and table
/// its functions treat as their defaults.
#[derive(Debug, Clone)]
pub struct ModuleInstance {
    debug_name: String,
    exports: HashMap<String, Object>,
    default_memory: Option<MemoryRef>,
    default_table: Option<TableRef>,
}

impl ModuleInstance {
    pub fn new(
        debug_name: impl Into<String>,
        exports: HashMap<String, Object>,
        default_memory: Option<MemoryRef>,
        default_table: Option<TableRef>,
    ) -> Self {
        Self {
            debug_name: debug_name.into(),
            exports,
            default_memory,
            default_table,
        }
    }

    pub fn debug_name(&self) -> &str {
        &self.debug_name
    }

    pub fn get_export(&self, name: &str) -> Option<Object> {
        self.exports.get(name).copied()
    }

    pub fn function(&self, name: &str) -> Option<FunctionRef> {
        self.get_export(name)?.as_function()
    }

    pub fn global(&self, name: &str) -> Option<GlobalRef> {
        self.get_export(name)?.as_global()
    }

    pub fn memory(&self, name: &str) -> Option<MemoryRef> {
        self.get_export(name)?.as_memory()
    }

    pub fn table(&self, name: &str) -> Option<TableRef> {
        self.get_export(name)?.as_table()
    }

    /// All exports, in no particular order.
    pub fn exports(&self) -> impl Iterator<Item = (&str, Object)> + '_ {
        self.exports.iter().map(|(name, object)| (name.as_str(), *object))
    }

    pub fn export_count(&self) -> usize {
        self.exports.len()
    }

    pub fn default_memory(&self) -> Option<MemoryRef> {
        self.default_memory
    }

    pub fn default_table(&self) -> Option<TableRef> {
        self.default_table
    }
}
