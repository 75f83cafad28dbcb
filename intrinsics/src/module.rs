//! The intrinsic registry.
//!
//! An [`IntrinsicModule`] is built once, by an explicit registration routine,
//! before any compartment is instantiated from it. Entries are appended and
//! never removed or updated. After registration it is only read, and can be
//! shared (`&IntrinsicModule` or `Arc<IntrinsicModule>`) by threads
//! instantiating it into different compartments.
//!
//! Names are unique per kind: functions, globals, memories and tables each
//! have their own namespace in the registry.

use std::collections::HashMap;

use keystone_primitives::validation::validate_size;
use keystone_primitives::{
    CallingConvention, FunctionType, GlobalType, MemoryType, NativeValue, TableType, Value,
    ValueType, MAX_MEMORY_PAGES, MAX_TABLE_ELEMS,
};
use keystone_runtime::{
    Compartment, GlobalRef, MemoryRef, ModuleRef, NativeFunction, TableRef,
};

use crate::callable::{
    context_switch_signature, memory_table_signature, plain_signature, ContextSwitchCallable,
    MemoryTableCallable, PlainCallable,
};
use crate::error::IntrinsicError;

/// A host function descriptor. Signature and entry point are derived from
/// the same native function and never change independently.
#[derive(Debug, Clone)]
pub struct IntrinsicFunction {
    name: String,
    signature: FunctionType,
    native: NativeFunction,
}

impl IntrinsicFunction {
    /// Describe a plain host function.
    pub fn plain<P, R>(name: impl Into<String>, function: impl PlainCallable<P, R>) -> Self {
        Self::from_parts(name, plain_signature(&function), function.into_native())
    }

    /// Describe a host function taking the default memory and table.
    pub fn with_memory_and_table<P, R>(
        name: impl Into<String>,
        function: impl MemoryTableCallable<P, R>,
    ) -> Self {
        Self::from_parts(name, memory_table_signature(&function), function.into_native())
    }

    /// Describe a host function returning through the context runtime data.
    pub fn with_context_switch<P, R>(
        name: impl Into<String>,
        function: impl ContextSwitchCallable<P, R>,
    ) -> Self {
        Self::from_parts(name, context_switch_signature(&function), function.into_native())
    }

    fn from_parts(name: impl Into<String>, signature: FunctionType, native: NativeFunction) -> Self {
        Self {
            name: name.into(),
            signature,
            native,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &FunctionType {
        &self.signature
    }

    pub fn calling_convention(&self) -> CallingConvention {
        self.native.calling_convention()
    }

    pub(crate) fn native(&self) -> &NativeFunction {
        &self.native
    }
}

/// An immutable host global.
#[derive(Debug, Clone, PartialEq)]
pub struct IntrinsicGlobal {
    name: String,
    value: Value,
}

impl IntrinsicGlobal {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> GlobalType {
        GlobalType::immutable(self.value.ty())
    }

    pub fn value(&self) -> Value {
        self.value
    }
}

/// A host memory. Only the shape is registered; storage is allocated per
/// instantiation.
#[derive(Debug, Clone, PartialEq)]
pub struct IntrinsicMemory {
    name: String,
    ty: MemoryType,
}

impl IntrinsicMemory {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &MemoryType {
        &self.ty
    }
}

/// A host table. Only the shape is registered; storage is allocated per
/// instantiation.
#[derive(Debug, Clone, PartialEq)]
pub struct IntrinsicTable {
    name: String,
    ty: TableType,
}

impl IntrinsicTable {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &TableType {
        &self.ty
    }
}

/// Kind and per-kind index of one registered entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Entry {
    Function(usize),
    Global(usize),
    Memory(usize),
    Table(usize),
}

/// A named registry of intrinsic functions, globals, memories and tables.
#[derive(Debug, Clone, Default)]
pub struct IntrinsicModule {
    name: String,
    functions: Vec<IntrinsicFunction>,
    globals: Vec<IntrinsicGlobal>,
    memories: Vec<IntrinsicMemory>,
    tables: Vec<IntrinsicTable>,
    function_names: HashMap<String, usize>,
    global_names: HashMap<String, usize>,
    memory_names: HashMap<String, usize>,
    table_names: HashMap<String, usize>,
    /// Registration order across kinds.
    entries: Vec<Entry>,
}

impl IntrinsicModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // ── Registration ──

    /// Append a function descriptor.
    pub fn register(&mut self, function: IntrinsicFunction) -> Result<&mut Self, IntrinsicError> {
        if self.function_names.contains_key(function.name()) {
            return Err(IntrinsicError::DuplicateFunction(function.name));
        }
        let index = self.functions.len();
        self.function_names.insert(function.name.clone(), index);
        self.functions.push(function);
        self.entries.push(Entry::Function(index));
        Ok(self)
    }

    /// Register a plain host function.
    pub fn function<P, R>(
        &mut self,
        name: &str,
        function: impl PlainCallable<P, R>,
    ) -> Result<&mut Self, IntrinsicError> {
        self.register(IntrinsicFunction::plain(name, function))
    }

    /// Register a host function that receives the default memory and table.
    pub fn function_with_memory_and_table<P, R>(
        &mut self,
        name: &str,
        function: impl MemoryTableCallable<P, R>,
    ) -> Result<&mut Self, IntrinsicError> {
        self.register(IntrinsicFunction::with_memory_and_table(name, function))
    }

    /// Register a host function that returns through the context runtime
    /// data.
    pub fn function_with_context_switch<P, R>(
        &mut self,
        name: &str,
        function: impl ContextSwitchCallable<P, R>,
    ) -> Result<&mut Self, IntrinsicError> {
        self.register(IntrinsicFunction::with_context_switch(name, function))
    }

    /// Register an immutable global whose kind is inferred from `T`.
    pub fn global<T: NativeValue>(&mut self, name: &str, value: T) -> Result<&mut Self, IntrinsicError> {
        if self.global_names.contains_key(name) {
            return Err(IntrinsicError::DuplicateGlobal(name.to_owned()));
        }
        let index = self.globals.len();
        self.global_names.insert(name.to_owned(), index);
        self.globals.push(IntrinsicGlobal {
            name: name.to_owned(),
            value: value.into_value(),
        });
        self.entries.push(Entry::Global(index));
        Ok(self)
    }

    /// Register a memory. Size bounds are checked now; feature requirements
    /// are checked against each compartment at instantiation.
    pub fn memory(&mut self, name: &str, ty: MemoryType) -> Result<&mut Self, IntrinsicError> {
        if self.memory_names.contains_key(name) {
            return Err(IntrinsicError::DuplicateMemory(name.to_owned()));
        }
        validate_size(ty.size, MAX_MEMORY_PAGES).map_err(|source| IntrinsicError::InvalidType {
            name: name.to_owned(),
            source,
        })?;
        let index = self.memories.len();
        self.memory_names.insert(name.to_owned(), index);
        self.memories.push(IntrinsicMemory {
            name: name.to_owned(),
            ty,
        });
        self.entries.push(Entry::Memory(index));
        Ok(self)
    }

    /// Register a table. Size bounds are checked now; feature requirements
    /// are checked against each compartment at instantiation.
    pub fn table(&mut self, name: &str, ty: TableType) -> Result<&mut Self, IntrinsicError> {
        if self.table_names.contains_key(name) {
            return Err(IntrinsicError::DuplicateTable(name.to_owned()));
        }
        validate_size(ty.size, MAX_TABLE_ELEMS).map_err(|source| IntrinsicError::InvalidType {
            name: name.to_owned(),
            source,
        })?;
        let index = self.tables.len();
        self.table_names.insert(name.to_owned(), index);
        self.tables.push(IntrinsicTable {
            name: name.to_owned(),
            ty,
        });
        self.entries.push(Entry::Table(index));
        Ok(self)
    }

    // ── Lookup ──

    pub fn get_function(&self, name: &str) -> Option<&IntrinsicFunction> {
        self.function_names.get(name).map(|&i| &self.functions[i])
    }

    pub fn get_global(&self, name: &str) -> Option<&IntrinsicGlobal> {
        self.global_names.get(name).map(|&i| &self.globals[i])
    }

    pub fn get_memory(&self, name: &str) -> Option<&IntrinsicMemory> {
        self.memory_names.get(name).map(|&i| &self.memories[i])
    }

    pub fn get_table(&self, name: &str) -> Option<&IntrinsicTable> {
        self.table_names.get(name).map(|&i| &self.tables[i])
    }

    pub fn functions(&self) -> &[IntrinsicFunction] {
        &self.functions
    }

    pub fn globals(&self) -> &[IntrinsicGlobal] {
        &self.globals
    }

    pub fn memories(&self) -> &[IntrinsicMemory] {
        &self.memories
    }

    pub fn tables(&self) -> &[IntrinsicTable] {
        &self.tables
    }

    pub(crate) fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Total number of registered entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The live memory an instantiation of this module created for the
    /// registered memory `name`.
    pub fn memory_instance(
        &self,
        compartment: &Compartment,
        instance: ModuleRef,
        name: &str,
    ) -> Result<Option<MemoryRef>, IntrinsicError> {
        if self.get_memory(name).is_none() {
            return Ok(None);
        }
        Ok(compartment.module(instance)?.memory(name))
    }

    /// The live table an instantiation of this module created for the
    /// registered table `name`.
    pub fn table_instance(
        &self,
        compartment: &Compartment,
        instance: ModuleRef,
        name: &str,
    ) -> Result<Option<TableRef>, IntrinsicError> {
        if self.get_table(name).is_none() {
            return Ok(None);
        }
        Ok(compartment.module(instance)?.table(name))
    }

    /// The live global an instantiation of this module created for the
    /// registered global `name`.
    pub fn global_instance(
        &self,
        compartment: &Compartment,
        instance: ModuleRef,
        name: &str,
    ) -> Result<Option<GlobalRef>, IntrinsicError> {
        if self.get_global(name).is_none() {
            return Ok(None);
        }
        Ok(compartment.module(instance)?.global(name))
    }

    // ── Versioning ──

    /// BLAKE3 digest of every entry's kind, name and type, in registration
    /// order. Two registries with equal fingerprints present the same ABI.
    pub fn fingerprint(&self) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        for entry in &self.entries {
            match *entry {
                Entry::Function(i) => {
                    let f = &self.functions[i];
                    hasher.update(&[0]);
                    hash_name(&mut hasher, &f.name);
                    hasher.update(&[f.calling_convention().tag()]);
                    for types in [f.signature.results(), f.signature.params()] {
                        hasher.update(&(types.len() as u32).to_le_bytes());
                        for ty in types.iter() {
                            hasher.update(&[ty.tag()]);
                        }
                    }
                }
                Entry::Global(i) => {
                    let g = &self.globals[i];
                    hasher.update(&[1]);
                    hash_name(&mut hasher, &g.name);
                    hasher.update(&[g.ty().value.tag(), g.ty().mutable as u8]);
                }
                Entry::Memory(i) => {
                    let m = &self.memories[i];
                    hasher.update(&[2]);
                    hash_name(&mut hasher, &m.name);
                    hash_size(&mut hasher, m.ty.size.min, m.ty.size.max, m.ty.shared);
                }
                Entry::Table(i) => {
                    let t = &self.tables[i];
                    hasher.update(&[3]);
                    hash_name(&mut hasher, &t.name);
                    hasher.update(&[ValueType::from(t.ty.element).tag()]);
                    hash_size(&mut hasher, t.ty.size.min, t.ty.size.max, t.ty.shared);
                }
            }
        }
        hasher.finalize()
    }
}

fn hash_name(hasher: &mut blake3::Hasher, name: &str) {
    hasher.update(&(name.len() as u32).to_le_bytes());
    hasher.update(name.as_bytes());
}

fn hash_size(hasher: &mut blake3::Hasher, min: u64, max: Option<u64>, shared: bool) {
    hasher.update(&min.to_le_bytes());
    match max {
        Some(max) => {
            hasher.update(&[1]);
            hasher.update(&max.to_le_bytes());
        }
        None => {
            hasher.update(&[0]);
        }
    }
    hasher.update(&[shared as u8]);
}
