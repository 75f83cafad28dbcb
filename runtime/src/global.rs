//! Global instances.

use keystone_primitives::{GlobalType, NativeValue, Value};

use crate::error::RuntimeError;

/// A single typed value owned by one compartment.
#[derive(Debug, Clone)]
pub struct GlobalInstance {
    ty: GlobalType,
    value: Value,
}

impl GlobalInstance {
    pub(crate) fn new(ty: GlobalType, value: Value) -> Result<Self, RuntimeError> {
        if value.ty() != ty.value {
            return Err(RuntimeError::TypeMismatch {
                expected: ty.value,
                got: value.ty(),
            });
        }
        Ok(Self { ty, value })
    }

    pub fn ty(&self) -> &GlobalType {
        &self.ty
    }

    pub fn get(&self) -> Value {
        self.value
    }

    /// Read the value as native type `T`, if the kinds agree.
    pub fn get_typed<T: NativeValue>(&self) -> Option<T> {
        T::from_value(self.value)
    }

    pub fn set(&mut self, value: Value) -> Result<(), RuntimeError> {
        if !self.ty.mutable {
            return Err(RuntimeError::ImmutableGlobal);
        }
        if value.ty() != self.ty.value {
            return Err(RuntimeError::TypeMismatch {
                expected: self.ty.value,
                got: value.ty(),
            });
        }
        self.value = value;
        Ok(())
    }
}
