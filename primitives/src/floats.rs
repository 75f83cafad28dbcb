//! Float semantics required by the guest instruction set.
//!
//! Native `min`/`max` and rounding disagree with the instruction set on NaN
//! payloads and signed zeros. Every guest-visible float instruction goes
//! through these functions instead:
//!
//! - a NaN operand is returned quieted, keeping its own sign and payload
//!   (only the most significant significand bit is forced on);
//! - `min`/`max` of equal operands compare raw bits, so `min(+0, -0)` is `-0`
//!   and `max(+0, -0)` is `+0` regardless of argument order;
//! - rounding uses the IEEE rule, with `nearest` rounding ties to even.

/// Bit-level access to an IEEE-754 binary float.
pub trait Float: Copy + PartialOrd {
    type Bits: Copy + Ord;

    /// Mask of the most significant significand bit (the "quiet" bit).
    const QUIET_BIT: Self::Bits;

    fn to_bits(self) -> Self::Bits;
    fn from_bits(bits: Self::Bits) -> Self;
    fn is_nan(self) -> bool;
    fn or_bits(bits: Self::Bits, mask: Self::Bits) -> Self::Bits;

    fn ceil(self) -> Self;
    fn floor(self) -> Self;
    fn trunc(self) -> Self;
    fn round_ties_even(self) -> Self;
}

macro_rules! impl_float {
    ($float:ty, $bits:ty, $quiet:expr) => {
        impl Float for $float {
            type Bits = $bits;

            const QUIET_BIT: $bits = $quiet;

            #[inline]
            fn to_bits(self) -> $bits {
                <$float>::to_bits(self)
            }

            #[inline]
            fn from_bits(bits: $bits) -> Self {
                <$float>::from_bits(bits)
            }

            #[inline]
            fn is_nan(self) -> bool {
                <$float>::is_nan(self)
            }

            #[inline]
            fn or_bits(bits: $bits, mask: $bits) -> $bits {
                bits | mask
            }

            #[inline]
            fn ceil(self) -> Self {
                <$float>::ceil(self)
            }

            #[inline]
            fn floor(self) -> Self {
                <$float>::floor(self)
            }

            #[inline]
            fn trunc(self) -> Self {
                <$float>::trunc(self)
            }

            #[inline]
            fn round_ties_even(self) -> Self {
                <$float>::round_ties_even(self)
            }
        }
    };
}

impl_float!(f32, u32, 1 << 22);
impl_float!(f64, u64, 1 << 51);

/// Set the quiet bit of `value`, keeping sign and the rest of the payload.
///
/// Applied to a non-NaN this would change the value; callers only pass NaNs.
#[inline]
pub fn quiet_nan<F: Float>(value: F) -> F {
    F::from_bits(F::or_bits(value.to_bits(), F::QUIET_BIT))
}

/// The instruction-set `min`.
pub fn float_min<F: Float>(left: F, right: F) -> F {
    if left.is_nan() {
        quiet_nan(left)
    } else if right.is_nan() {
        quiet_nan(right)
    } else if left < right {
        left
    } else if right < left {
        right
    } else if left.to_bits() < right.to_bits() {
        // Equal non-NaN operands differ at most in the sign bit; the larger
        // unsigned pattern is the negative one.
        right
    } else {
        left
    }
}

/// The instruction-set `max`.
pub fn float_max<F: Float>(left: F, right: F) -> F {
    if left.is_nan() {
        quiet_nan(left)
    } else if right.is_nan() {
        quiet_nan(right)
    } else if left > right {
        left
    } else if right > left {
        right
    } else if left.to_bits() > right.to_bits() {
        right
    } else {
        left
    }
}

pub fn float_ceil<F: Float>(value: F) -> F {
    if value.is_nan() {
        quiet_nan(value)
    } else {
        value.ceil()
    }
}

pub fn float_floor<F: Float>(value: F) -> F {
    if value.is_nan() {
        quiet_nan(value)
    } else {
        value.floor()
    }
}

pub fn float_trunc<F: Float>(value: F) -> F {
    if value.is_nan() {
        quiet_nan(value)
    } else {
        value.trunc()
    }
}

/// Round to the nearest integer, ties to even.
pub fn float_nearest<F: Float>(value: F) -> F {
    if value.is_nan() {
        quiet_nan(value)
    } else {
        value.round_ties_even()
    }
}
