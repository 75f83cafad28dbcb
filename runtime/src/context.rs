//! Execution contexts and the view a host function gets of its caller.
//!
//! A [`Context`] is one thread of guest execution inside a compartment. It
//! owns a fixed-size [`ContextRuntimeData`] buffer; intrinsics using the
//! context-switch convention write their result to the start of that buffer
//! instead of returning it, and the call wrapper copies it out afterwards.

use std::marker::PhantomData;

use keystone_primitives::{FunctionType, NativeValue, Value, ValueType};

use crate::compartment::{Compartment, CompartmentId};
use crate::function::call_function;
use crate::instance::{MemoryRef, TableRef};
use crate::memory::MemoryInstance;
use crate::table::TableInstance;
use crate::trap::{Trap, TrapKind};

/// Size in bytes of the per-context scratch buffer.
pub const CONTEXT_RUNTIME_DATA_SIZE: usize = 4096;

/// Per-context scratch buffer. Its first bytes alias the result of the
/// in-flight context-switch intrinsic call.
#[repr(C, align(16))]
pub struct ContextRuntimeData {
    bytes: [u8; CONTEXT_RUNTIME_DATA_SIZE],
}

impl ContextRuntimeData {
    fn new() -> Box<Self> {
        Box::new(Self {
            bytes: [0; CONTEXT_RUNTIME_DATA_SIZE],
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Store `value` at the result slot.
    pub fn write_result<R: NativeValue>(&mut self, value: R) {
        // The buffer is far wider than the largest value kind.
        let stored = value.into_value().store_le(&mut self.bytes);
        debug_assert!(stored, "result does not fit the runtime data buffer");
    }

    /// Read a value of kind `ty` from the result slot.
    pub fn read_result(&self, ty: ValueType) -> Option<Value> {
        Value::load_le(ty, &self.bytes)
    }
}

/// One execution context inside a compartment.
pub struct Context {
    compartment: CompartmentId,
    runtime_data: Box<ContextRuntimeData>,
}

impl Context {
    pub(crate) fn new(compartment: CompartmentId) -> Self {
        Self {
            compartment,
            runtime_data: ContextRuntimeData::new(),
        }
    }

    pub fn compartment(&self) -> CompartmentId {
        self.compartment
    }

    pub fn runtime_data(&self) -> &ContextRuntimeData {
        &self.runtime_data
    }

    pub(crate) fn runtime_data_mut(&mut self) -> &mut ContextRuntimeData {
        &mut self.runtime_data
    }
}

/// The default memory of the calling instance, passed implicitly to
/// intrinsics using the memory-and-table convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryIdArg(pub Option<MemoryRef>);

/// The default table of the calling instance, passed implicitly to
/// intrinsics using the memory-and-table convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableIdArg(pub Option<TableRef>);

/// Marker returned by context-switch intrinsics. It can only be produced by
/// [`result_in_context_runtime_data`], so holding one proves the result of
/// type `R` was written to the runtime data buffer.
#[derive(Debug)]
pub struct ResultInContextRuntimeData<R: NativeValue> {
    _result: PhantomData<fn() -> R>,
}

/// Write `result` into the caller's runtime data and return the marker a
/// context-switch intrinsic hands back instead of the value.
pub fn result_in_context_runtime_data<R: NativeValue>(
    caller: &mut Caller<'_>,
    result: R,
) -> ResultInContextRuntimeData<R> {
    caller.runtime_data.write_result(result);
    ResultInContextRuntimeData {
        _result: PhantomData,
    }
}

/// What a host function sees of the guest frame that called it.
pub struct Caller<'a> {
    compartment: &'a mut Compartment,
    runtime_data: &'a mut ContextRuntimeData,
}

impl<'a> Caller<'a> {
    pub(crate) fn new(
        compartment: &'a mut Compartment,
        runtime_data: &'a mut ContextRuntimeData,
    ) -> Self {
        Self {
            compartment,
            runtime_data,
        }
    }

    pub fn compartment(&self) -> &Compartment {
        &*self.compartment
    }

    pub fn compartment_mut(&mut self) -> &mut Compartment {
        &mut *self.compartment
    }

    pub fn runtime_data(&self) -> &ContextRuntimeData {
        &*self.runtime_data
    }

    /// Resolve an implicit memory argument. A missing or unusable memory
    /// traps as an out-of-bounds access.
    pub fn memory(&mut self, memory: MemoryIdArg) -> Result<&mut MemoryInstance, Trap> {
        let memory = memory
            .0
            .ok_or_else(|| Trap::new(TrapKind::MemoryAddressOutOfBounds))?;
        self.compartment
            .memory_mut(memory)
            .map_err(|_| Trap::new(TrapKind::MemoryAddressOutOfBounds))
    }

    /// Resolve an implicit table argument.
    pub fn table(&mut self, table: TableIdArg) -> Result<&mut TableInstance, Trap> {
        let table = table
            .0
            .ok_or_else(|| Trap::new(TrapKind::UndefinedTableElement))?;
        self.compartment
            .table_mut(table)
            .map_err(|_| Trap::new(TrapKind::UndefinedTableElement))
    }

    /// Call the function at `index` of `table` as a guest `call_indirect`
    /// would: the element must be present and have exactly `expected` type.
    pub fn call_indirect(
        &mut self,
        table: TableRef,
        index: u64,
        expected: &FunctionType,
        args: &[Value],
    ) -> Result<Option<Value>, Trap> {
        let function = self
            .compartment
            .table(table)
            .ok()
            .and_then(|table| table.get(index).ok().flatten())
            .ok_or_else(|| Trap::new(TrapKind::UndefinedTableElement))?;
        let instance = self
            .compartment
            .function(function)
            .map_err(|_| Trap::new(TrapKind::UndefinedTableElement))?;
        let arg_types: Vec<ValueType> = args.iter().map(Value::ty).collect();
        if instance.signature() != expected || expected.params().as_slice() != arg_types {
            return Err(Trap::new(TrapKind::IndirectCallSignatureMismatch));
        }
        let raw: Vec<_> = args.iter().map(Value::untagged).collect();
        call_function(self.compartment, self.runtime_data, function, &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keystone_primitives::V128;

    #[test]
    fn test_result_slot_holds_widest_value() {
        let mut data = ContextRuntimeData::new();
        let wide = V128(u128::MAX - 6);
        data.write_result(wide);
        assert_eq!(data.read_result(ValueType::V128), Some(Value::V128(wide)));

        data.write_result(-1i32);
        assert_eq!(data.read_result(ValueType::I32), Some(Value::I32(-1)));
    }
}
