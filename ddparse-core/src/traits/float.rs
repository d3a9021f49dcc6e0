//! Target binary format constraints
//!
//! This module defines the trait that describes an IEEE-754 binary
//! interchange format to the final scaler.

/// Trait for IEEE-754 binary formats the converter can produce
///
/// Every constant describes the bit layout of the format; the scaler works
/// on `u64` bit patterns and narrows them through [`BinaryFloat::from_raw_bits`].
pub trait BinaryFloat:
    Copy + Clone + PartialEq + PartialOrd + core::fmt::Debug + core::ops::Neg<Output = Self>
{
    /// Number of explicitly stored significand bits (hidden bit excluded)
    const MANTISSA_BITS: u32;

    /// Offset added to the unbiased exponent in the exponent field
    const EXPONENT_BIAS: i32;

    /// All-ones exponent field used by infinity and NaN
    const MAX_BIASED_EXPONENT: u64;

    /// Smallest decimal exponent that can still produce a non-zero value
    const MIN_DECIMAL_EXPONENT: i32;

    /// Largest decimal exponent that can still produce a finite value
    const MAX_DECIMAL_EXPONENT: i32;

    /// Unbiased exponent of the smallest normal value
    const MIN_NORMAL_EXPONENT: i32 = 1 - Self::EXPONENT_BIAS;

    /// Position of the sign bit
    const SIGN_BIT: u32;

    const ZERO: Self;
    const INFINITY: Self;
    const NAN: Self;

    /// Reinterpret the low bits of `bits` as a value of this format
    fn from_raw_bits(bits: u64) -> Self;

    /// Widen the bit pattern of this value to `u64`
    fn to_raw_bits(self) -> u64;

    /// Bit pattern of positive infinity
    fn infinity_bits() -> u64 {
        Self::MAX_BIASED_EXPONENT << Self::MANTISSA_BITS
    }

    /// Bit pattern of the smallest positive normal value
    fn min_normal_bits() -> u64 {
        1 << Self::MANTISSA_BITS
    }
}

impl BinaryFloat for f64 {
    const MANTISSA_BITS: u32 = 52;
    const EXPONENT_BIAS: i32 = 1023;
    const MAX_BIASED_EXPONENT: u64 = 0x7FF;
    const MIN_DECIMAL_EXPONENT: i32 = -324;
    const MAX_DECIMAL_EXPONENT: i32 = 308;
    const SIGN_BIT: u32 = 63;

    const ZERO: Self = 0.0;
    const INFINITY: Self = f64::INFINITY;
    const NAN: Self = f64::NAN;

    fn from_raw_bits(bits: u64) -> Self {
        f64::from_bits(bits)
    }

    fn to_raw_bits(self) -> u64 {
        self.to_bits()
    }
}

impl BinaryFloat for f32 {
    const MANTISSA_BITS: u32 = 23;
    const EXPONENT_BIAS: i32 = 127;
    const MAX_BIASED_EXPONENT: u64 = 0xFF;
    const MIN_DECIMAL_EXPONENT: i32 = -46;
    const MAX_DECIMAL_EXPONENT: i32 = 38;
    const SIGN_BIT: u32 = 31;

    const ZERO: Self = 0.0;
    const INFINITY: Self = f32::INFINITY;
    const NAN: Self = f32::NAN;

    fn from_raw_bits(bits: u64) -> Self {
        debug_assert!(bits <= u64::from(u32::MAX), "f32 bit pattern wider than 32 bits");
        f32::from_bits(bits as u32)
    }

    fn to_raw_bits(self) -> u64 {
        u64::from(self.to_bits())
    }
}
