//! Double-double arithmetic
//!
//! A `DoubleDouble` keeps an integer-valued high limb and a fractional low
//! limb. Every operation pulls the integer part out of the low limb with
//! `floor` and folds it into the high limb, so the pair carries roughly
//! 106 bits without any variable-precision arithmetic.

use core::ops::{Add, Div, Mul};
use libm::floor;

/// Exclusive upper bound of the high limb (`2^53`)
pub const HIGH_LIMIT: f64 = 9_007_199_254_740_992.0;

/// Extended-precision non-negative magnitude `high + low`
///
/// Invariants: `high` is an integer in `[0, 2^53)` and `low` is in `[0, 1)`.
/// Field order matters: the derived `PartialOrd` compares `high` first.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DoubleDouble {
    /// Integer part
    pub high: f64,
    /// Fractional remainder in `[0, 1)`
    pub low: f64,
}

impl DoubleDouble {
    /// The zero value
    pub const ZERO: Self = Self {
        high: 0.0,
        low: 0.0,
    };

    /// Create a value from its limbs
    pub fn new(high: f64, low: f64) -> Self {
        debug_assert!(
            (0.0..HIGH_LIMIT).contains(&high) && floor(high) == high,
            "high limb {high} is not an integer below 2^53"
        );
        debug_assert!((0.0..1.0).contains(&low), "low limb {low} outside [0, 1)");
        Self { high, low }
    }

    /// Split a non-negative scalar into integer and fractional limbs
    pub fn from_scalar(value: f64) -> Self {
        let high = floor(value);
        Self::new(high, value - high)
    }

    /// Whether both limbs are zero
    pub fn is_zero(&self) -> bool {
        self.high == 0.0 && self.low == 0.0
    }

    /// Sum of two values
    pub fn add(self, other: Self) -> Self {
        let low_sum = self.low + other.low;
        let overflow = floor(low_sum);
        Self::new(self.high + other.high + overflow, low_sum - overflow)
    }

    /// Multiply by a small integer (a digit, 10 or 16)
    pub fn scale(self, factor: u32) -> Self {
        let factor = f64::from(factor);
        let low_times_factor = self.low * factor;
        let overflow = floor(low_times_factor);
        Self::new(self.high * factor + overflow, low_times_factor - overflow)
    }

    /// Divide by a small non-zero integer
    ///
    /// The high limb is divided as an integer, so the quotient is exact and
    /// only the remainder flows into the low limb.
    pub fn divide(self, divisor: u32) -> Self {
        debug_assert!(divisor != 0, "division of a double-double by zero");
        let high = self.high as u64;
        let quotient = high / u64::from(divisor);
        let remainder = high % u64::from(divisor);
        let low = (self.low + remainder as f64) / f64::from(divisor);
        let carry = floor(low);
        Self::new(quotient as f64 + carry, low - carry)
    }

    /// Compute `self + magnitude * digit` in one pass
    ///
    /// This is the accumulation step; the low products are summed before
    /// the carry is extracted so repeated calls do not drift.
    pub fn multiply_add(self, magnitude: Self, digit: u32) -> Self {
        let digit = f64::from(digit);
        let fma_low = magnitude.low * digit + self.low;
        let overflow = floor(fma_low);
        Self::new(
            magnitude.high * digit + self.high + overflow,
            fma_low - overflow,
        )
    }

    /// Collapse to a single scalar.
    ///
    /// This rounds; the exact scaler never goes through it.
    pub fn to_scalar(self) -> f64 {
        self.high + self.low
    }
}

impl Add for DoubleDouble {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        DoubleDouble::add(self, other)
    }
}

impl Mul<u32> for DoubleDouble {
    type Output = Self;

    fn mul(self, factor: u32) -> Self {
        self.scale(factor)
    }
}

impl Div<u32> for DoubleDouble {
    type Output = Self;

    fn div(self, divisor: u32) -> Self {
        self.divide(divisor)
    }
}
