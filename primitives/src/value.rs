//! Guest values and the native-type mapping used for signature inference.
//!
//! Floats are kept as raw bit patterns so that NaN payloads survive every
//! copy between host and guest. `UntaggedValue` is the raw 128-bit slot used
//! once a call's argument types have already been checked.

use core::fmt;

use crate::types::ValueType;

/// A 128-bit SIMD value, stored little-endian.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct V128(pub u128);

/// A typed guest value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Value {
    I32(i32),
    I64(i64),
    /// Raw bits of an `f32`.
    F32(u32),
    /// Raw bits of an `f64`.
    F64(u64),
    V128(V128),
}

impl Value {
    pub fn f32(value: f32) -> Self {
        Self::F32(value.to_bits())
    }

    pub fn f64(value: f64) -> Self {
        Self::F64(value.to_bits())
    }

    /// The value kind of this value.
    pub fn ty(&self) -> ValueType {
        match self {
            Self::I32(_) => ValueType::I32,
            Self::I64(_) => ValueType::I64,
            Self::F32(_) => ValueType::F32,
            Self::F64(_) => ValueType::F64,
            Self::V128(_) => ValueType::V128,
        }
    }

    /// The all-zero value of `ty`, or `None` for reference kinds.
    pub fn default_for(ty: ValueType) -> Option<Self> {
        match ty {
            ValueType::I32 => Some(Self::I32(0)),
            ValueType::I64 => Some(Self::I64(0)),
            ValueType::F32 => Some(Self::F32(0)),
            ValueType::F64 => Some(Self::F64(0)),
            ValueType::V128 => Some(Self::V128(V128(0))),
            ValueType::AnyRef | ValueType::FuncRef => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match *self {
            Self::I32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::I64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match *self {
            Self::F32(bits) => Some(f32::from_bits(bits)),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::F64(bits) => Some(f64::from_bits(bits)),
            _ => None,
        }
    }

    /// Number of bytes this value occupies when stored little-endian.
    pub fn byte_width(ty: ValueType) -> Option<usize> {
        match ty {
            ValueType::I32 | ValueType::F32 => Some(4),
            ValueType::I64 | ValueType::F64 => Some(8),
            ValueType::V128 => Some(16),
            ValueType::AnyRef | ValueType::FuncRef => None,
        }
    }

    /// Write this value little-endian at the start of `buf`.
    ///
    /// Returns `false` (leaving `buf` untouched) if `buf` is too short.
    pub fn store_le(&self, buf: &mut [u8]) -> bool {
        let bytes = self.untagged().0.to_le_bytes();
        let width = match Self::byte_width(self.ty()) {
            Some(width) => width,
            None => return false,
        };
        match buf.get_mut(..width) {
            Some(dst) => {
                dst.copy_from_slice(&bytes[..width]);
                true
            }
            None => false,
        }
    }

    /// Read a value of kind `ty` stored little-endian at the start of `buf`.
    pub fn load_le(ty: ValueType, buf: &[u8]) -> Option<Self> {
        let width = Self::byte_width(ty)?;
        let src = buf.get(..width)?;
        let mut raw = [0u8; 16];
        raw[..width].copy_from_slice(src);
        let wide = u128::from_le_bytes(raw);
        Some(match ty {
            ValueType::I32 => Self::I32(wide as u32 as i32),
            ValueType::I64 => Self::I64(wide as u64 as i64),
            ValueType::F32 => Self::F32(wide as u32),
            ValueType::F64 => Self::F64(wide as u64),
            ValueType::V128 => Self::V128(V128(wide)),
            ValueType::AnyRef | ValueType::FuncRef => return None,
        })
    }

    /// Drop the kind tag.
    pub fn untagged(&self) -> UntaggedValue {
        match *self {
            Self::I32(v) => UntaggedValue(v as u32 as u128),
            Self::I64(v) => UntaggedValue(v as u64 as u128),
            Self::F32(bits) => UntaggedValue(bits as u128),
            Self::F64(bits) => UntaggedValue(bits as u128),
            Self::V128(v) => UntaggedValue(v.0),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::I32(v) => write!(f, "i32.const {}", v),
            Self::I64(v) => write!(f, "i64.const {}", v),
            Self::F32(bits) => write!(f, "f32.const {} (0x{:08x})", f32::from_bits(bits), bits),
            Self::F64(bits) => write!(f, "f64.const {} (0x{:016x})", f64::from_bits(bits), bits),
            Self::V128(v) => write!(f, "v128.const 0x{:032x}", v.0),
        }
    }
}

/// A value with its kind tag removed.
///
/// Only meaningful together with a `ValueType` that was checked elsewhere.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct UntaggedValue(pub u128);

/// A native Rust type with a guest value kind.
///
/// Implemented for `i32`, `u32`, `i64`, `u64`, `f32`, `f64` and [`V128`].
/// A host function whose signature uses any other type does not implement
/// the calling-convention traits and is rejected at compile time.
pub trait NativeValue: Copy + Send + Sync + 'static {
    /// The guest kind this type maps to.
    const VALUE_TYPE: ValueType;

    fn into_value(self) -> Value;

    /// `None` if `value` is of a different kind.
    fn from_value(value: Value) -> Option<Self>;

    fn from_untagged(raw: UntaggedValue) -> Self;
}

macro_rules! native_value {
    ($($native:ty => $kind:ident, $variant:ident($raw:ty), |$v:ident| $to:expr, |$r:ident| $from:expr;)*) => {$(
        impl NativeValue for $native {
            const VALUE_TYPE: ValueType = ValueType::$kind;

            #[inline]
            fn into_value(self) -> Value {
                let $v = self;
                Value::$variant($to)
            }

            #[inline]
            fn from_value(value: Value) -> Option<Self> {
                match value {
                    Value::$variant($r) => Some($from),
                    _ => None,
                }
            }

            #[inline]
            fn from_untagged(raw: UntaggedValue) -> Self {
                let $r = raw.0 as $raw;
                $from
            }
        }
    )*};
}

native_value! {
    i32 => I32, I32(i32), |v| v, |r| r;
    u32 => I32, I32(i32), |v| v as i32, |r| r as u32;
    i64 => I64, I64(i64), |v| v, |r| r;
    u64 => I64, I64(i64), |v| v as i64, |r| r as u64;
    f32 => F32, F32(u32), |v| v.to_bits(), |r| f32::from_bits(r);
    f64 => F64, F64(u64), |v| v.to_bits(), |r| f64::from_bits(r);
}

impl NativeValue for V128 {
    const VALUE_TYPE: ValueType = ValueType::V128;

    fn into_value(self) -> Value {
        Value::V128(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::V128(v) => Some(v),
            _ => None,
        }
    }

    fn from_untagged(raw: UntaggedValue) -> Self {
        V128(raw.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_kinds() {
        assert_eq!(Value::I32(1).ty(), ValueType::I32);
        assert_eq!(Value::f32(1.5).ty(), ValueType::F32);
        assert_eq!(Value::f64(-2.0).ty(), ValueType::F64);
        assert_eq!(Value::V128(V128(7)).ty(), ValueType::V128);
    }

    #[test]
    fn test_nan_payload_survives_value() {
        let bits = 0x7fa0_0001u32;
        let v = Value::f32(f32::from_bits(bits));
        assert_eq!(v, Value::F32(bits));
        assert_eq!(v.as_f32().map(f32::to_bits), Some(bits));
    }

    #[test]
    fn test_store_and_load_le() {
        let mut buf = [0u8; 16];
        assert!(Value::I64(-3).store_le(&mut buf));
        assert_eq!(&buf[..8], &(-3i64).to_le_bytes());
        assert_eq!(Value::load_le(ValueType::I64, &buf), Some(Value::I64(-3)));
    }

    #[test]
    fn test_store_into_short_buffer_fails() {
        let mut buf = [0xAAu8; 2];
        assert!(!Value::I32(5).store_le(&mut buf));
        assert_eq!(buf, [0xAA, 0xAA]);
        assert_eq!(Value::load_le(ValueType::I32, &buf), None);
    }

    #[test]
    fn test_reference_kinds_have_no_value() {
        assert_eq!(Value::default_for(ValueType::FuncRef), None);
        assert_eq!(Value::byte_width(ValueType::AnyRef), None);
        assert_eq!(Value::default_for(ValueType::F64), Some(Value::F64(0)));
    }

    #[test]
    fn test_untagged_conversion() {
        let raw = Value::I32(-1).untagged();
        assert_eq!(raw, UntaggedValue(0xffff_ffff));
        assert_eq!(i32::from_untagged(raw), -1);
        assert_eq!(u32::from_untagged(raw), u32::MAX);

        let raw = Value::f64(2.5).untagged();
        assert_eq!(f64::from_untagged(raw), 2.5);
    }

    #[test]
    fn test_native_value_mapping() {
        assert_eq!(<u32 as NativeValue>::VALUE_TYPE, ValueType::I32);
        assert_eq!(<u64 as NativeValue>::VALUE_TYPE, ValueType::I64);
        assert_eq!(u32::MAX.into_value(), Value::I32(-1));
        assert_eq!(i64::from_value(Value::I32(1)), None);
        assert_eq!(f32::from_value(Value::f32(0.25)), Some(0.25));
    }
}
