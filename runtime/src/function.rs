//! Function instances and calling-convention dispatch.
//!
//! A host function is stored as a closed [`NativeFunction`] variant, one per
//! calling convention, each holding a strongly typed entry point. The typed
//! wrappers in `keystone-intrinsics` build these entry points; here they are
//! only dispatched.

use std::fmt;
use std::sync::Arc;

use keystone_primitives::{CallingConvention, FunctionType, UntaggedValue, Value};

use crate::compartment::Compartment;
use crate::context::{Caller, ContextRuntimeData, MemoryIdArg, TableIdArg};
use crate::instance::{FunctionRef, MemoryRef, TableRef};
use crate::trap::{Trap, TrapKind};

/// Entry point of a plain host function. Arguments have already been
/// checked against the function's signature.
pub type PlainEntry =
    dyn Fn(&mut Caller<'_>, &[UntaggedValue]) -> Result<Option<Value>, Trap> + Send + Sync;

/// Entry point of a host function that receives the calling instance's
/// default memory and table.
pub type MemoryAndTableEntry = dyn Fn(&mut Caller<'_>, MemoryIdArg, TableIdArg, &[UntaggedValue]) -> Result<Option<Value>, Trap>
    + Send
    + Sync;

/// Entry point of a host function that returns its result through the
/// context runtime data.
pub type ContextSwitchEntry =
    dyn Fn(&mut Caller<'_>, &[UntaggedValue]) -> Result<(), Trap> + Send + Sync;

/// A host entry point tagged with its calling convention.
#[derive(Clone)]
pub enum NativeFunction {
    Plain(Arc<PlainEntry>),
    WithMemoryAndTable(Arc<MemoryAndTableEntry>),
    WithContextSwitch(Arc<ContextSwitchEntry>),
}

impl NativeFunction {
    pub fn plain<F>(entry: F) -> Self
    where
        F: Fn(&mut Caller<'_>, &[UntaggedValue]) -> Result<Option<Value>, Trap> + Send + Sync + 'static,
    {
        Self::Plain(Arc::new(entry))
    }

    pub fn with_memory_and_table<F>(entry: F) -> Self
    where
        F: Fn(&mut Caller<'_>, MemoryIdArg, TableIdArg, &[UntaggedValue]) -> Result<Option<Value>, Trap>
            + Send
            + Sync
            + 'static,
    {
        Self::WithMemoryAndTable(Arc::new(entry))
    }

    pub fn with_context_switch<F>(entry: F) -> Self
    where
        F: Fn(&mut Caller<'_>, &[UntaggedValue]) -> Result<(), Trap> + Send + Sync + 'static,
    {
        Self::WithContextSwitch(Arc::new(entry))
    }

    pub fn calling_convention(&self) -> CallingConvention {
        match self {
            Self::Plain(_) => CallingConvention::Plain,
            Self::WithMemoryAndTable(_) => CallingConvention::WithMemoryAndTable,
            Self::WithContextSwitch(_) => CallingConvention::WithContextSwitch,
        }
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFunction({})", self.calling_convention())
    }
}

/// A callable function bound inside a compartment.
#[derive(Debug, Clone)]
pub struct FunctionInstance {
    debug_name: Arc<str>,
    signature: FunctionType,
    native: NativeFunction,
    default_memory: Option<MemoryRef>,
    default_table: Option<TableRef>,
}

impl FunctionInstance {
    pub fn new(
        debug_name: impl Into<Arc<str>>,
        signature: FunctionType,
        native: NativeFunction,
        default_memory: Option<MemoryRef>,
        default_table: Option<TableRef>,
    ) -> Self {
        Self {
            debug_name: debug_name.into(),
            signature,
            native,
            default_memory,
            default_table,
        }
    }

    pub fn debug_name(&self) -> &str {
        &self.debug_name
    }

    pub fn signature(&self) -> &FunctionType {
        &self.signature
    }

    pub fn calling_convention(&self) -> CallingConvention {
        self.native.calling_convention()
    }

    pub fn default_memory(&self) -> Option<MemoryRef> {
        self.default_memory
    }

    pub fn default_table(&self) -> Option<TableRef> {
        self.default_table
    }
}

/// Dispatch one call to `function` through its calling convention.
///
/// Arguments must already match the signature. A trap raised by the callee
/// comes back with this function's debug name appended to its frames.
pub(crate) fn call_function(
    compartment: &mut Compartment,
    runtime_data: &mut ContextRuntimeData,
    function: FunctionRef,
    args: &[UntaggedValue],
) -> Result<Option<Value>, Trap> {
    let instance = compartment
        .function(function)
        .map_err(|_| Trap::new(TrapKind::UndefinedTableElement))?;
    let name = instance.debug_name.clone();
    let native = instance.native.clone();
    let result_type = instance.signature.results().iter().next().copied();
    let memory = MemoryIdArg(instance.default_memory);
    let table = TableIdArg(instance.default_table);

    log::trace!("calling {} ({})", name, native.calling_convention());

    let mut caller = Caller::new(compartment, runtime_data);
    let result = match &native {
        NativeFunction::Plain(entry) => entry(&mut caller, args),
        NativeFunction::WithMemoryAndTable(entry) => entry(&mut caller, memory, table, args),
        NativeFunction::WithContextSwitch(entry) => entry(&mut caller, args)
            .map(|()| result_type.and_then(|ty| caller.runtime_data().read_result(ty))),
    };
    result.map_err(|trap| trap.with_frame(name))
}
