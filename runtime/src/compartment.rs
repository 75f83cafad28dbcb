//! Compartments: isolation domains owning every runtime object.
//!
//! A compartment is an arena. Instances live in per-kind vectors and are
//! addressed by handles that record the compartment that issued them, so a
//! handle can never reach into another compartment. Objects live exactly as
//! long as their compartment; the only way to drop objects early is
//! [`Compartment::rollback`], which the instantiator uses to undo a
//! half-finished instantiation.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use keystone_primitives::validation;
use keystone_primitives::{GlobalType, MemoryType, TableType, Value, ValueType};

use crate::config::CompartmentConfig;
use crate::context::Context;
use crate::error::RuntimeError;
use crate::function::{call_function, FunctionInstance};
use crate::global::GlobalInstance;
use crate::instance::{
    FunctionRef, GlobalRef, MemoryRef, ModuleInstance, ModuleRef, Object, ObjectKind, TableRef,
};
use crate::memory::MemoryInstance;
use crate::table::TableInstance;
use crate::trap::catch_traps;

static NEXT_COMPARTMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique compartment identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompartmentId(u64);

impl CompartmentId {
    pub(crate) fn next() -> Self {
        Self(NEXT_COMPARTMENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for CompartmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "compartment#{}", self.0)
    }
}

/// Arena sizes at a point in time. See [`Compartment::checkpoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    functions: usize,
    globals: usize,
    memories: usize,
    tables: usize,
    modules: usize,
}

/// One arena slot: an object and the generation it was created in.
#[derive(Debug)]
struct Slot<T> {
    generation: u64,
    value: T,
}

/// Per-kind object storage. Indices are reused after a rollback, so every
/// lookup also matches the handle's generation against the slot's.
#[derive(Debug)]
struct Arena<T> {
    slots: Vec<Slot<T>>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<T> Arena<T> {
    fn push(&mut self, generation: u64, value: T) -> usize {
        self.slots.push(Slot { generation, value });
        self.slots.len() - 1
    }

    fn get(&self, index: usize, generation: u64) -> Option<&T> {
        self.slots
            .get(index)
            .filter(|slot| slot.generation == generation)
            .map(|slot| &slot.value)
    }

    fn get_mut(&mut self, index: usize, generation: u64) -> Option<&mut T> {
        self.slots
            .get_mut(index)
            .filter(|slot| slot.generation == generation)
            .map(|slot| &mut slot.value)
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    fn truncate(&mut self, len: usize) {
        self.slots.truncate(len);
    }
}

/// An isolation domain and allocation scope for runtime objects.
#[derive(Debug)]
pub struct Compartment {
    id: CompartmentId,
    config: CompartmentConfig,
    /// Bumped by every rollback.
    generation: u64,
    functions: Arena<FunctionInstance>,
    globals: Arena<GlobalInstance>,
    memories: Arena<MemoryInstance>,
    tables: Arena<TableInstance>,
    modules: Arena<ModuleInstance>,
}

/// Resolve `$handle` in `$arena`, rejecting foreign and stale handles.
macro_rules! lookup {
    ($self:ident, $arena:ident, $handle:expr, $get:ident, $kind:expr) => {{
        let handle = $handle;
        if handle.compartment() != $self.id {
            return Err(RuntimeError::ForeignObject($kind));
        }
        $self
            .$arena
            .$get(handle.index(), handle.generation())
            .ok_or_else(|| RuntimeError::StaleHandle($kind))
    }};
}

impl Default for Compartment {
    fn default() -> Self {
        Self::new(CompartmentConfig::default())
    }
}

impl Compartment {
    pub fn new(config: CompartmentConfig) -> Self {
        Self {
            id: CompartmentId::next(),
            config,
            generation: 0,
            functions: Arena::default(),
            globals: Arena::default(),
            memories: Arena::default(),
            tables: Arena::default(),
            modules: Arena::default(),
        }
    }

    pub fn id(&self) -> CompartmentId {
        self.id
    }

    pub fn config(&self) -> &CompartmentConfig {
        &self.config
    }

    // ── Object creation ──

    pub fn create_function(&mut self, function: FunctionInstance) -> FunctionRef {
        let index = self.functions.push(self.generation, function);
        FunctionRef::new(self.id, index, self.generation)
    }

    pub fn create_global(&mut self, ty: GlobalType, value: Value) -> Result<GlobalRef, RuntimeError> {
        if matches!(ty.value, ValueType::AnyRef | ValueType::FuncRef) {
            return Err(RuntimeError::UnsupportedGlobalType(ty.value));
        }
        validation::validate_value_type(&self.config.features, ty.value)?;
        let global = GlobalInstance::new(ty, value)?;
        let index = self.globals.push(self.generation, global);
        Ok(GlobalRef::new(self.id, index, self.generation))
    }

    pub fn create_memory(&mut self, ty: MemoryType) -> Result<MemoryRef, RuntimeError> {
        self.validate_memory_type(&ty)?;
        let memory = MemoryInstance::new(ty, self.config.max_memory_pages)?;
        let index = self.memories.push(self.generation, memory);
        Ok(MemoryRef::new(self.id, index, self.generation))
    }

    pub fn create_table(&mut self, ty: TableType) -> Result<TableRef, RuntimeError> {
        self.validate_table_type(&ty)?;
        let table = TableInstance::new(ty, self.id, self.config.max_table_elems)?;
        let index = self.tables.push(self.generation, table);
        Ok(TableRef::new(self.id, index, self.generation))
    }

    pub fn add_module_instance(&mut self, module: ModuleInstance) -> ModuleRef {
        let index = self.modules.push(self.generation, module);
        ModuleRef::new(self.id, index, self.generation)
    }

    /// Check a memory type against this compartment's features and limits.
    pub fn validate_memory_type(&self, ty: &MemoryType) -> Result<(), RuntimeError> {
        validation::validate_memory_type(&self.config.features, ty)?;
        if ty.size.min > self.config.max_memory_pages {
            return Err(RuntimeError::ResourceLimit {
                what: "memory minimum pages",
                requested: ty.size.min,
                limit: self.config.max_memory_pages,
            });
        }
        Ok(())
    }

    /// Check a table type against this compartment's features and limits.
    pub fn validate_table_type(&self, ty: &TableType) -> Result<(), RuntimeError> {
        validation::validate_table_type(&self.config.features, ty)?;
        if ty.size.min > self.config.max_table_elems {
            return Err(RuntimeError::ResourceLimit {
                what: "table minimum elements",
                requested: ty.size.min,
                limit: self.config.max_table_elems,
            });
        }
        Ok(())
    }

    // ── Lookup ──

    pub fn function(&self, function: FunctionRef) -> Result<&FunctionInstance, RuntimeError> {
        lookup!(self, functions, function, get, FunctionRef::KIND)
    }

    pub fn global(&self, global: GlobalRef) -> Result<&GlobalInstance, RuntimeError> {
        lookup!(self, globals, global, get, GlobalRef::KIND)
    }

    pub fn global_mut(&mut self, global: GlobalRef) -> Result<&mut GlobalInstance, RuntimeError> {
        lookup!(self, globals, global, get_mut, GlobalRef::KIND)
    }

    pub fn memory(&self, memory: MemoryRef) -> Result<&MemoryInstance, RuntimeError> {
        lookup!(self, memories, memory, get, MemoryRef::KIND)
    }

    pub fn memory_mut(&mut self, memory: MemoryRef) -> Result<&mut MemoryInstance, RuntimeError> {
        lookup!(self, memories, memory, get_mut, MemoryRef::KIND)
    }

    pub fn table(&self, table: TableRef) -> Result<&TableInstance, RuntimeError> {
        lookup!(self, tables, table, get, TableRef::KIND)
    }

    pub fn table_mut(&mut self, table: TableRef) -> Result<&mut TableInstance, RuntimeError> {
        lookup!(self, tables, table, get_mut, TableRef::KIND)
    }

    pub fn module(&self, module: ModuleRef) -> Result<&ModuleInstance, RuntimeError> {
        lookup!(self, modules, module, get, ModuleRef::KIND)
    }

    /// Most recently added module instance with the given debug name.
    pub fn module_by_name(&self, debug_name: &str) -> Option<ModuleRef> {
        self.modules
            .slots
            .iter()
            .enumerate()
            .rev()
            .find(|(_, slot)| slot.value.debug_name() == debug_name)
            .map(|(index, slot)| ModuleRef::new(self.id, index, slot.generation))
    }

    /// Whether `object` is a live object of this compartment.
    pub fn contains(&self, object: Object) -> bool {
        match object {
            Object::Function(f) => self.function(f).is_ok(),
            Object::Global(g) => self.global(g).is_ok(),
            Object::Memory(m) => self.memory(m).is_ok(),
            Object::Table(t) => self.table(t).is_ok(),
        }
    }

    // ── Checkpoints ──

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            functions: self.functions.len(),
            globals: self.globals.len(),
            memories: self.memories.len(),
            tables: self.tables.len(),
            modules: self.modules.len(),
        }
    }

    /// Drop every object created since `checkpoint` was taken. Handles to
    /// the dropped objects become stale, even once their slots are reused.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        self.generation += 1;
        self.functions.truncate(checkpoint.functions);
        self.globals.truncate(checkpoint.globals);
        self.memories.truncate(checkpoint.memories);
        self.tables.truncate(checkpoint.tables);
        self.modules.truncate(checkpoint.modules);
    }

    // ── Execution ──

    /// Create an execution context bound to this compartment.
    pub fn create_context(&self) -> Context {
        Context::new(self.id)
    }

    /// Invoke `function` as a top-level guest call.
    ///
    /// This is a trap boundary: a trap raised anywhere below it unwinds to
    /// here and is returned as [`RuntimeError::Trap`].
    pub fn invoke(
        &mut self,
        context: &mut Context,
        function: FunctionRef,
        args: &[Value],
    ) -> Result<Option<Value>, RuntimeError> {
        if context.compartment() != self.id {
            return Err(RuntimeError::ForeignObject(ObjectKind::Context));
        }
        let signature = self.function(function)?.signature();
        let got: Vec<ValueType> = args.iter().map(Value::ty).collect();
        if signature.params().as_slice() != got {
            return Err(RuntimeError::SignatureMismatch {
                expected: signature.clone(),
                got,
            });
        }
        let raw: Vec<_> = args.iter().map(Value::untagged).collect();
        catch_traps(|| call_function(self, context.runtime_data_mut(), function, &raw))
    }
}
