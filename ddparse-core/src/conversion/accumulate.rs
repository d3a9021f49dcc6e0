//! Digit accumulation
//!
//! Folds the significant digits into a double-double against the table
//! magnitude of the leading digit.

use crate::dd::DoubleDouble;

/// Accumulate `digits` (ASCII, one optional `.`) starting at `magnitude`
///
/// Each digit adds `digit * magnitude` and the magnitude then drops by a
/// factor of ten. Once the magnitude reaches zero, the remaining digits can
/// no longer contribute and the walk stops.
pub fn accumulate(digits: &[u8], magnitude: DoubleDouble) -> DoubleDouble {
    let mut accumulator = DoubleDouble::ZERO;
    let mut magnitude = magnitude;
    for &c in digits {
        if c == b'.' {
            continue;
        }
        if magnitude.is_zero() {
            break;
        }
        debug_assert!(c.is_ascii_digit(), "non-digit {c:#04x} in significand");
        accumulator = accumulator.multiply_add(magnitude, u32::from(c - b'0'));
        magnitude = magnitude / 10;
    }
    accumulator
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_digits() {
        // 10^2 at magnitude 100 * 2^0
        let acc = accumulate(b"123", DoubleDouble::new(100.0, 0.0));
        assert_eq!(acc, DoubleDouble::new(123.0, 0.0));
    }

    #[test]
    fn test_point_is_skipped() {
        let acc = accumulate(b"12.5", DoubleDouble::new(80.0, 0.0));
        // 1*80 + 2*8 + 5*0.8
        assert_eq!(acc.high, 100.0);
        assert!(acc.low < 1e-12);
    }

    #[test]
    fn test_fractional_magnitudes() {
        let acc = accumulate(b"75", DoubleDouble::new(0.0, 0.5));
        // 7 * 0.5 + 5 * 0.05
        assert_eq!(acc.high, 3.0);
        assert!((acc.low - 0.75).abs() < 1e-15);
    }

    #[test]
    fn test_long_tail_terminates() {
        let digits = [b'9'; 2000];
        let acc = accumulate(&digits, DoubleDouble::new(562_949_953_421_312.0, 0.0));
        // 9.99... * 2^49 converges on 10 * 2^49
        assert!((acc.to_scalar() - 5_629_499_534_213_120.0).abs() <= 1.0);
    }

    #[test]
    fn test_empty_digits() {
        assert!(accumulate(b"", DoubleDouble::new(1.0, 0.0)).is_zero());
    }
}
