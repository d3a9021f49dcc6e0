//! Exact final scaling
//!
//! Turns an accumulator `(H, L)` and a power-of-two factor `2^k` into the
//! correctly rounded magnitude bit pattern of the target format. Both limbs
//! are aligned to the output unit with exact integer shifts and exact
//! power-of-two scaling, and the result is rounded to nearest, ties to
//! even, exactly once.
//!
//! Values whose binary exponent lies below the smallest normal exponent are
//! rounded straight into subnormal payload units. Rounding to a full
//! significand first and shifting afterwards would round twice and give
//! wrong bits near the subnormal boundary.

use core::cmp::Ordering;

use libm::{floor, scalbn};

use crate::dd::{DoubleDouble, HIGH_LIMIT};
use crate::traits::BinaryFloat;

/// Scale `accumulator * 2^k` into the magnitude bits of `F`
///
/// The returned pattern never has the sign bit set; the caller applies the
/// sign. Results that overflow the format saturate to infinity.
///
/// # Panics
///
/// Panics if the accumulator limbs break the double-double invariants,
/// which can only happen through a broken table or a misuse of this
/// function.
pub fn scale<F: BinaryFloat>(accumulator: DoubleDouble, k: i32) -> u64 {
    let DoubleDouble { high, low } = accumulator;
    assert!(
        (0.0..HIGH_LIMIT).contains(&high) && floor(high) == high,
        "accumulator high limb {high:e} is not an integer below 2^53"
    );
    assert!(
        (0.0..1.0).contains(&low),
        "accumulator low limb {low:e} outside [0, 1)"
    );

    let high = high as u64;
    if high == 0 && low == 0.0 {
        return 0;
    }

    let leading = if high != 0 {
        63 - high.leading_zeros() as i32
    } else {
        binary_exponent(low)
    };
    let exponent = leading + k;
    let mantissa_bits = F::MANTISSA_BITS as i32;

    if exponent < F::MIN_NORMAL_EXPONENT {
        // Output unit is 2^(MIN_NORMAL_EXPONENT - MANTISSA_BITS)
        let shift = k - F::MIN_NORMAL_EXPONENT + mantissa_bits;
        return pack_subnormal::<F>(round_scaled(high, low, shift));
    }

    let mut exponent = exponent;
    let mut significand = round_scaled(high, low, mantissa_bits - leading);
    if significand == 2 << F::MANTISSA_BITS {
        significand = 1 << F::MANTISSA_BITS;
        exponent += 1;
    }

    let biased = exponent + F::EXPONENT_BIAS;
    if biased <= 0 {
        // Only reachable if the classification above was bypassed; the
        // significand is already rounded, so this is a second rounding.
        let payload = round_shift_right(significand, (1 - biased) as u32);
        return pack_subnormal::<F>(payload);
    }
    if biased as u64 >= F::MAX_BIASED_EXPONENT {
        return F::infinity_bits();
    }

    ((biased as u64) << F::MANTISSA_BITS) | (significand - (1 << F::MANTISSA_BITS))
}

/// Clamp a subnormal payload into a bit pattern
fn pack_subnormal<F: BinaryFloat>(payload: u64) -> u64 {
    if payload >= 1 << F::MANTISSA_BITS {
        F::min_normal_bits()
    } else {
        payload
    }
}

/// `round_half_even((high + low) * 2^shift)` computed exactly
///
/// `high < 2^53` is an integer and `low` lies in `[0, 1)`.
fn round_scaled(high: u64, low: f64, shift: i32) -> u64 {
    if shift >= 0 {
        // Power-of-two scaling of `low` is exact, and so is splitting it
        let scaled_low = scalbn(low, shift);
        let whole = floor(scaled_low);
        let fraction = scaled_low - whole;
        let integer = if high == 0 { 0 } else { high << shift };
        return round_half_even(integer + whole as u64, fraction.total_cmp(&0.5));
    }

    let dropped = shift.unsigned_abs();
    // high + low < 2^53 <= half a unit
    if dropped > 54 {
        return 0;
    }
    let quotient = high >> dropped;
    let remainder = high & ((1 << dropped) - 1);
    let half = 1u64 << (dropped - 1);
    let position = match remainder.cmp(&half) {
        Ordering::Equal if low > 0.0 => Ordering::Greater,
        ordering => ordering,
    };
    round_half_even(quotient, position)
}

/// Right shift with round to nearest, ties to even
fn round_shift_right(value: u64, shift: u32) -> u64 {
    if shift == 0 {
        return value;
    }
    if shift > 64 {
        return 0;
    }
    let quotient = value.checked_shr(shift).unwrap_or(0);
    let remainder = value & (u64::MAX >> (64 - shift));
    let half = 1u64 << (shift - 1);
    round_half_even(quotient, remainder.cmp(&half))
}

/// Round an integer given where the discarded fraction sits relative to one half
fn round_half_even(integer: u64, fraction_vs_half: Ordering) -> u64 {
    match fraction_vs_half {
        Ordering::Less => integer,
        Ordering::Greater => integer + 1,
        Ordering::Equal => integer + (integer & 1),
    }
}

/// Unbiased binary exponent of a positive finite value
fn binary_exponent(value: f64) -> i32 {
    let bits = value.to_bits();
    let biased = ((bits >> 52) & 0x7FF) as i32;
    if biased == 0 {
        let fraction = bits & ((1 << 52) - 1);
        (63 - fraction.leading_zeros() as i32) - 1074
    } else {
        biased - 1023
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scale64(high: f64, low: f64, k: i32) -> u64 {
        scale::<f64>(DoubleDouble::new(high, low), k)
    }

    fn scale32(high: f64, low: f64, k: i32) -> u64 {
        scale::<f32>(DoubleDouble::new(high, low), k)
    }

    #[test]
    fn test_zero() {
        assert_eq!(scale64(0.0, 0.0, 0), 0);
        assert_eq!(scale32(0.0, 0.0, -1000), 0);
    }

    #[test]
    fn test_exact_integers() {
        assert_eq!(scale64(1.0, 0.0, 0), 1.0f64.to_bits());
        assert_eq!(scale64(3.0, 0.0, -1), 1.5f64.to_bits());
        assert_eq!(scale64(3.0, 0.5, 2), 14.0f64.to_bits());
        assert_eq!(scale64(0.0, 0.25, 0), 0.25f64.to_bits());
    }

    #[test]
    fn test_normal_ties_to_even() {
        let top = HIGH_LIMIT / 2.0; // 2^52
        // 2^52 + 1.5 at unit 1 is a tie between odd and even; goes up
        assert_eq!(scale64(top + 1.0, 0.5, 0), (top + 2.0).to_bits());
        // 2^52 + 2.5 is a tie with an even lower neighbour; stays
        assert_eq!(scale64(top + 2.0, 0.5, 0), (top + 2.0).to_bits());
        // Just above the tie rounds up
        assert_eq!(scale64(top + 2.0, 0.75, 0), (top + 3.0).to_bits());
    }

    #[test]
    fn test_significand_carry_bumps_exponent() {
        // (2^53 - 1) + 0.5 rounds to 2^53
        assert_eq!(scale64(HIGH_LIMIT - 1.0, 0.5, 0), HIGH_LIMIT.to_bits());
        assert_eq!(scale64(HIGH_LIMIT - 1.0, 0.5, 1), (2.0 * HIGH_LIMIT).to_bits());
    }

    #[test]
    fn test_subnormal_ties_to_even() {
        assert_eq!(scale64(3.0, 0.5, -1074), 4);
        assert_eq!(scale64(2.0, 0.5, -1074), 2);
        assert_eq!(scale64(2.0, 0.75, -1074), 3);
        assert_eq!(scale64(0.0, 0.5, -1074), 0);
        assert_eq!(scale64(0.0, 0.75, -1074), 1);
    }

    #[test]
    fn test_subnormal_rounds_once() {
        // 2.5 + 2^-53 is above the tie. Rounded to 53 bits first it would
        // become exactly 2.5 and go down to 2.
        let low = 0.5 + scalbn(1.0, -53);
        assert_eq!(scale64(2.0, low, -1074), 3);

        // Same at shift 1: (1.25 + 2^-54) * 2 units
        let low = 0.25 + scalbn(1.0, -54);
        assert_eq!(1.0 + low, 1.25);
        assert_eq!(scale64(1.0, low, -1073), 3);

        // Payload (4p + 1.75) / 4 = p + 0.4375 rounds down to p. Rounding
        // to 53 bits first would give 4p + 2, a tie that goes up to p + 1.
        let p = (1u64 << 50) + 1;
        assert_eq!(scale64((4 * p + 1) as f64, 0.75, -1076), p);
    }

    #[test]
    fn test_factors_below_the_smallest_subnormal() {
        // 2^50 * 2^-1125 is half the smallest subnormal
        let half = scalbn(1.0, 50);
        assert_eq!(scale64(half, 0.0, -1125), 0);
        assert_eq!(scale64(half, 0.5, -1125), 1);
        assert_eq!(scale64(3.0 * half, 0.0, -1125), 2);
        assert_eq!(scale64(half - 1.0, 0.75, -1125), 0);
        assert_eq!(scale64(1.0, 0.0, -1200), 0);
    }

    #[test]
    fn test_promotes_to_min_normal() {
        let payload_max = ((1u64 << 52) - 1) as f64;
        assert_eq!(scale64(payload_max, 0.5, -1074), 1 << 52);
        assert_eq!(scale64(payload_max, 0.25, -1074), (1 << 52) - 1);
    }

    #[test]
    fn test_overflow_saturates() {
        let largest = f64::MAX.to_bits();
        let top = HIGH_LIMIT - 1.0;
        assert_eq!(scale64(top, 0.0, 971), largest);
        assert_eq!(scale64(top, 0.5, 971), f64::INFINITY.to_bits());
        assert_eq!(scale64(1.0, 0.0, 1023), scalbn(1.0, 1023).to_bits());
        assert_eq!(scale64(2.0, 0.0, 1023), f64::INFINITY.to_bits());
    }

    #[test]
    fn test_single_precision_shifts_right() {
        // 2^49 + 2^25 + 1 at unit 2^-26 -> 2^23 + 2^-1 + 2^-26, just above a tie
        let high = (1u64 << 49) + (1 << 25) + 1;
        assert_eq!(f32::from_bits(scale32(high as f64, 0.0, -26) as u32), 8_388_609.0);

        // Exact tie: 2^49 + 2^25 at unit 2^-26 is 2^23 + 0.5 -> even
        let high = (1u64 << 49) + (1 << 25);
        assert_eq!(f32::from_bits(scale32(high as f64, 0.0, -26) as u32), 8_388_608.0);

        // Tie broken by the low limb
        assert_eq!(f32::from_bits(scale32(high as f64, 0.5, -26) as u32), 8_388_609.0);
    }

    #[test]
    fn test_single_precision_subnormals() {
        assert_eq!(scale32(1.0, 0.0, -149), 1);
        assert_eq!(scale32(1.0, 0.5, -149), 2);
        assert_eq!(scale32(0.0, 0.5, -149), 0);
        // 2^40 units of 2^-190 are half of the smallest subnormal: tie to zero
        let half = scalbn(1.0, 40);
        assert_eq!(scale32(half, 0.0, -190), 0);
        assert_eq!(scale32(half, 0.25, -190), 1);
        assert_eq!(scale32(1.0, 0.0, -200), 0);
    }

    #[test]
    fn test_single_precision_overflow() {
        assert_eq!(scale32(1.0, 0.0, 128), u64::from(f32::INFINITY.to_bits()));
        let largest_power = scalbn(1.0, 127) as f32;
        assert_eq!(scale32(1.0, 0.0, 127), u64::from(largest_power.to_bits()));
    }

    #[test]
    #[should_panic(expected = "high limb")]
    fn test_rejects_oversized_high_limb() {
        let accumulator = DoubleDouble {
            high: HIGH_LIMIT,
            low: 0.0,
        };
        scale::<f64>(accumulator, 0);
    }

    #[test]
    fn test_round_shift_right() {
        assert_eq!(round_shift_right(0b1011, 0), 0b1011);
        assert_eq!(round_shift_right(0b1010, 2), 0b10); // 2.5 -> 2
        assert_eq!(round_shift_right(0b1110, 2), 0b100); // 3.5 -> 4
        assert_eq!(round_shift_right(0b1011, 2), 0b11); // 2.75 -> 3
        assert_eq!(round_shift_right(u64::MAX, 64), 1);
        assert_eq!(round_shift_right(u64::MAX, 65), 0);
    }

    #[test]
    fn test_binary_exponent() {
        assert_eq!(binary_exponent(1.0), 0);
        assert_eq!(binary_exponent(0.75), -1);
        assert_eq!(binary_exponent(f64::from_bits(1)), -1074);
        assert_eq!(binary_exponent(f64::from_bits(3)), -1073);
    }
}
