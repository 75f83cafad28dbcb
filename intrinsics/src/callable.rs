//! Signature inference for host functions.
//!
//! Each calling convention has a trait implemented for every `Fn` whose
//! native parameter and result types map to guest value kinds through
//! [`NativeValue`]. The trait yields the guest-visible [`FunctionType`] and
//! wraps the function into a [`NativeFunction`] entry point that decodes the
//! already type-checked argument slots. A native type without a
//! `NativeValue` impl simply has no matching impl, so registering such a
//! function does not compile.
//!
//! | convention | native shape | guest signature |
//! |---|---|---|
//! | plain | `Fn(&mut Caller, A..) -> R` | `(A..) -> (R)` |
//! | memory and table | `Fn(&mut Caller, MemoryIdArg, TableIdArg, A..) -> R` | `(A..) -> (R)` |
//! | context switch | `Fn(&mut Caller, A..) -> ResultInContextRuntimeData<T>` | `(A..) -> (T)` |

use keystone_primitives::{FunctionType, NativeValue, ValueType, Value, V128};
use keystone_runtime::{
    Caller, MemoryIdArg, NativeFunction, ResultInContextRuntimeData, TableIdArg, Trap,
};

/// A native result type of a plain or memory-and-table host function.
///
/// Implemented for `()`, every [`NativeValue`] type, and `Result` of those
/// with [`Trap`], so a host function can trap by returning `Err`.
pub trait IntrinsicResult: 'static {
    /// Guest result kind, or `None` for no result.
    fn result_type() -> Option<ValueType>;

    fn into_result(self) -> Result<Option<Value>, Trap>;
}

impl IntrinsicResult for () {
    fn result_type() -> Option<ValueType> {
        None
    }

    fn into_result(self) -> Result<Option<Value>, Trap> {
        Ok(None)
    }
}

impl IntrinsicResult for Result<(), Trap> {
    fn result_type() -> Option<ValueType> {
        None
    }

    fn into_result(self) -> Result<Option<Value>, Trap> {
        self.map(|()| None)
    }
}

macro_rules! intrinsic_result {
    ($($ty:ty),*) => {$(
        impl IntrinsicResult for $ty {
            fn result_type() -> Option<ValueType> {
                Some(<$ty as NativeValue>::VALUE_TYPE)
            }

            fn into_result(self) -> Result<Option<Value>, Trap> {
                Ok(Some(self.into_value()))
            }
        }

        impl IntrinsicResult for Result<$ty, Trap> {
            fn result_type() -> Option<ValueType> {
                Some(<$ty as NativeValue>::VALUE_TYPE)
            }

            fn into_result(self) -> Result<Option<Value>, Trap> {
                self.map(|value| Some(value.into_value()))
            }
        }
    )*};
}

intrinsic_result!(i32, u32, i64, u64, f32, f64, V128);

/// The native result type of a context-switch host function: proof that the
/// real result was written to the context runtime data, optionally wrapped
/// in a `Result` to allow trapping.
pub trait ContextSwitchResult: 'static {
    fn result_type() -> ValueType;

    fn into_result(self) -> Result<(), Trap>;
}

impl<R: NativeValue> ContextSwitchResult for ResultInContextRuntimeData<R> {
    fn result_type() -> ValueType {
        R::VALUE_TYPE
    }

    fn into_result(self) -> Result<(), Trap> {
        Ok(())
    }
}

impl<R: NativeValue> ContextSwitchResult for Result<ResultInContextRuntimeData<R>, Trap> {
    fn result_type() -> ValueType {
        R::VALUE_TYPE
    }

    fn into_result(self) -> Result<(), Trap> {
        self.map(|_| ())
    }
}

/// A host function callable with the plain convention.
pub trait PlainCallable<Params, Results> {
    fn signature() -> FunctionType;

    fn into_native(self) -> NativeFunction;
}

/// A host function that receives the calling instance's default memory and
/// table ahead of its guest-visible arguments.
pub trait MemoryTableCallable<Params, Results> {
    fn signature() -> FunctionType;

    fn into_native(self) -> NativeFunction;
}

/// A host function that hands its result back through the context runtime
/// data.
pub trait ContextSwitchCallable<Params, Results> {
    fn signature() -> FunctionType;

    fn into_native(self) -> NativeFunction;
}

fn results_of(result: Option<ValueType>) -> Vec<ValueType> {
    result.into_iter().collect()
}

macro_rules! impl_callables {
    ($(
        ($($args:ident)*)
    )*) => ($(
        #[allow(non_snake_case)]
        impl<F, $($args,)* R> PlainCallable<($($args,)*), R> for F
        where
            F: Fn(&mut Caller<'_>, $($args),*) -> R + Send + Sync + 'static,
            $($args: NativeValue,)*
            R: IntrinsicResult,
        {
            fn signature() -> FunctionType {
                FunctionType::new(results_of(R::result_type()), vec![$($args::VALUE_TYPE),*])
            }

            fn into_native(self) -> NativeFunction {
                NativeFunction::plain(move |caller, args| {
                    #[allow(unused_mut, unused_variables)]
                    let mut slots = args.iter().copied();
                    $(let $args = $args::from_untagged(slots.next().unwrap_or_default());)*
                    self(caller, $($args),*).into_result()
                })
            }
        }

        #[allow(non_snake_case)]
        impl<F, $($args,)* R> MemoryTableCallable<($($args,)*), R> for F
        where
            F: Fn(&mut Caller<'_>, MemoryIdArg, TableIdArg, $($args),*) -> R + Send + Sync + 'static,
            $($args: NativeValue,)*
            R: IntrinsicResult,
        {
            fn signature() -> FunctionType {
                FunctionType::new(results_of(R::result_type()), vec![$($args::VALUE_TYPE),*])
            }

            fn into_native(self) -> NativeFunction {
                NativeFunction::with_memory_and_table(move |caller, memory, table, args| {
                    #[allow(unused_mut, unused_variables)]
                    let mut slots = args.iter().copied();
                    $(let $args = $args::from_untagged(slots.next().unwrap_or_default());)*
                    self(caller, memory, table, $($args),*).into_result()
                })
            }
        }

        #[allow(non_snake_case)]
        impl<F, $($args,)* R> ContextSwitchCallable<($($args,)*), R> for F
        where
            F: Fn(&mut Caller<'_>, $($args),*) -> R + Send + Sync + 'static,
            $($args: NativeValue,)*
            R: ContextSwitchResult,
        {
            fn signature() -> FunctionType {
                FunctionType::new([R::result_type()], vec![$($args::VALUE_TYPE),*])
            }

            fn into_native(self) -> NativeFunction {
                NativeFunction::with_context_switch(move |caller, args| {
                    #[allow(unused_mut, unused_variables)]
                    let mut slots = args.iter().copied();
                    $(let $args = $args::from_untagged(slots.next().unwrap_or_default());)*
                    self(caller, $($args),*).into_result()
                })
            }
        }
    )*)
}

impl_callables! {
    ()
    (A1)
    (A1 A2)
    (A1 A2 A3)
    (A1 A2 A3 A4)
    (A1 A2 A3 A4 A5)
    (A1 A2 A3 A4 A5 A6)
    (A1 A2 A3 A4 A5 A6 A7)
    (A1 A2 A3 A4 A5 A6 A7 A8)
}

/// Guest signature of a plain host function.
pub fn plain_signature<P, R, F: PlainCallable<P, R>>(_: &F) -> FunctionType {
    F::signature()
}

/// Guest signature of a memory-and-table host function.
pub fn memory_table_signature<P, R, F: MemoryTableCallable<P, R>>(_: &F) -> FunctionType {
    F::signature()
}

/// Guest signature of a context-switch host function.
pub fn context_switch_signature<P, R, F: ContextSwitchCallable<P, R>>(_: &F) -> FunctionType {
    F::signature()
}

#[cfg(test)]
mod tests {
    use super::*;
    use keystone_runtime::{result_in_context_runtime_data, TrapKind};

    #[test]
    fn test_plain_signature() {
        let add = |_: &mut Caller<'_>, a: i32, b: i32| a.wrapping_add(b);
        assert_eq!(
            plain_signature(&add),
            FunctionType::new([ValueType::I32], [ValueType::I32, ValueType::I32])
        );

        let mixed = |_: &mut Caller<'_>, _: u64, _: f32, _: f64| -> Result<u32, Trap> { Ok(0) };
        assert_eq!(
            plain_signature(&mixed),
            FunctionType::new([ValueType::I32], [ValueType::I64, ValueType::F32, ValueType::F64])
        );
    }

    #[test]
    fn test_no_params_no_result() {
        let trap = |_: &mut Caller<'_>| -> Result<(), Trap> {
            Err(TrapKind::ReachedUnreachableCode.into())
        };
        assert_eq!(plain_signature(&trap), FunctionType::default());

        let nop = |_: &mut Caller<'_>| {};
        assert_eq!(plain_signature(&nop).to_string(), "() -> ()");
    }

    #[test]
    fn test_memory_and_table_arguments_are_implicit() {
        let load = |_: &mut Caller<'_>, _: MemoryIdArg, _: TableIdArg, address: i32| address;
        assert_eq!(
            memory_table_signature(&load),
            FunctionType::new([ValueType::I32], [ValueType::I32])
        );
    }

    #[test]
    fn test_context_switch_result_comes_from_marker() {
        let computed = |caller: &mut Caller<'_>, _: i32| result_in_context_runtime_data(caller, 42i64);
        assert_eq!(
            context_switch_signature(&computed),
            FunctionType::new([ValueType::I64], [ValueType::I32])
        );
    }

    #[test]
    fn test_convention_of_wrapped_function() {
        let add = |_: &mut Caller<'_>, a: i32, b: i32| a.wrapping_add(b);
        assert_eq!(
            PlainCallable::into_native(add).calling_convention(),
            keystone_primitives::CallingConvention::Plain
        );
    }
}
