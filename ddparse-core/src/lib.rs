#![cfg_attr(not(any(feature = "std", test)), no_std)]

//! ddparse core - correctly rounded decimal to binary floating point
//!
//! This crate converts ASCII decimal numerals into IEEE-754 `f64` and `f32`
//! bit patterns, rounded to nearest with ties to even, including the
//! subnormal range. It carries no I/O and never allocates.
//!
//! The conversion runs in three stages:
//!
//! - [`scan`] splits the text into sign, decimal exponent and digit span
//! - [`accumulate`] folds the digits into a [`DoubleDouble`] against the
//!   [`Exp10Table`] magnitude for that exponent
//! - [`scale`] turns the accumulator and the exact power-of-two factor into
//!   the final bits, rounding exactly once
//!
//! ```rust
//! use ddparse_core::{parse_with, Exp10Table};
//!
//! let table = Exp10Table::new();
//! let value: f64 = parse_with(&table, "2.2250738585072014e-308");
//! assert_eq!(value, f64::MIN_POSITIVE);
//! ```
//!
//! ## Precision
//!
//! The accumulator carries about 100 significant bits. Halfway cases whose
//! value is an integer below `2^64` accumulate exactly and resolve to even.
//! Any other numeral is correctly rounded as long as its exact value lies
//! further than about `2^-90` (relative) from the nearest halfway point.
//! Closer inputs, including exact halfway points with fractional digits,
//! may land on either neighbour; telling them apart needs arbitrary
//! precision, which this crate does not use.

pub mod conversion;
pub mod dd;
pub mod error;
pub mod table;
pub mod traits;

pub use conversion::{accumulate, scale, scan, Components, ExponentRange, Lexeme, Scan};
pub use dd::DoubleDouble;
pub use error::{ParseError, Result};
pub use table::{Exp10Table, PowerOfTenEntry};
pub use traits::BinaryFloat;

/// Outcome of a partial parse
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conversion<F> {
    /// Converted value with the sign applied
    pub value: F,
    /// Whether the input carried a leading `-`
    pub negative: bool,
    /// Bytes belonging to the numeral; 0 when nothing was recognized
    pub consumed: usize,
}

impl<F: BinaryFloat> Conversion<F> {
    /// Full signed bit pattern of the value
    pub fn bits(&self) -> u64 {
        self.value.to_raw_bits()
    }
}

/// Intermediate state of a finite conversion before final scaling
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Trace {
    /// Whether the input carried a leading `-`
    pub negative: bool,
    /// Power of ten of the first significant digit
    pub decimal_exponent: i32,
    /// Position of the decimal exponent in the table
    pub table_index: usize,
    /// Digits folded against the table magnitude
    pub accumulator: DoubleDouble,
    /// Exponent `k` of the power of two `2^k` applied to the accumulator
    pub factor_exponent: i32,
}

impl Trace {
    /// Finish the conversion into format `F`
    pub fn value<F: BinaryFloat>(&self) -> F {
        let magnitude = F::from_raw_bits(scale::<F>(self.accumulator, self.factor_exponent));
        if self.negative {
            -magnitude
        } else {
            magnitude
        }
    }
}

/// Convert the numeral at the start of `text`, reporting how much was used
///
/// Never fails. Input without a numeral converts to zero (carrying the sign
/// if one was seen) with `consumed == 0`, and exponents outside the range of
/// `F` resolve to zero or infinity.
///
/// Rounding is correct to the bound described in the crate docs: integer
/// halfway values below `2^64` go to even, and inputs within about `2^-90`
/// of a halfway point may round either way.
pub fn parse_partial_with<F, S>(table: &Exp10Table, text: S) -> Conversion<F>
where
    F: BinaryFloat,
    S: AsRef<[u8]>,
{
    let Scan {
        negative,
        lexeme,
        consumed,
    } = scan(text.as_ref());

    let magnitude = match lexeme {
        Lexeme::Invalid | Lexeme::Zero => F::ZERO,
        Lexeme::Infinity => F::INFINITY,
        Lexeme::NotANumber => F::NAN,
        Lexeme::Finite(components) => finite_magnitude::<F>(table, &components),
    };

    Conversion {
        value: if negative { -magnitude } else { magnitude },
        negative,
        consumed,
    }
}

/// Convert the numeral at the start of `text`, ignoring anything after it
///
/// Same rounding bound as [`parse_partial_with`].
pub fn parse_with<F, S>(table: &Exp10Table, text: S) -> F
where
    F: BinaryFloat,
    S: AsRef<[u8]>,
{
    parse_partial_with::<F, S>(table, text).value
}

/// Convert `text`, which must consist of exactly one numeral
pub fn try_parse_with<F, S>(table: &Exp10Table, text: S) -> Result<F>
where
    F: BinaryFloat,
    S: AsRef<[u8]>,
{
    let text = text.as_ref();
    let conversion = parse_partial_with::<F, _>(table, text);
    if conversion.consumed == 0 {
        return Err(ParseError::Empty);
    }
    if conversion.consumed < text.len() {
        return Err(ParseError::TrailingCharacters {
            offset: conversion.consumed,
        });
    }
    Ok(conversion.value)
}

/// Accumulator and factor for a finite non-zero numeral within the table range
pub fn trace_with<S: AsRef<[u8]>>(table: &Exp10Table, text: S) -> Option<Trace> {
    let scanned = scan(text.as_ref());
    let Lexeme::Finite(components) = scanned.lexeme else {
        return None;
    };
    let table_index = Exp10Table::index(components.exponent)?;
    let entry = table.get(components.exponent)?;

    Some(Trace {
        negative: scanned.negative,
        decimal_exponent: components.exponent as i32,
        table_index,
        accumulator: accumulate(components.digits, entry.magnitude),
        factor_exponent: entry.factor_exponent,
    })
}

fn finite_magnitude<F: BinaryFloat>(table: &Exp10Table, components: &Components<'_>) -> F {
    match components.classify(F::MIN_DECIMAL_EXPONENT, F::MAX_DECIMAL_EXPONENT) {
        ExponentRange::Underflow => F::ZERO,
        ExponentRange::Overflow => F::INFINITY,
        ExponentRange::InRange => {
            let Some(entry) = table.get(components.exponent) else {
                return if components.exponent < 0 {
                    F::ZERO
                } else {
                    F::INFINITY
                };
            };
            let accumulator = accumulate(components.digits, entry.magnitude);
            F::from_raw_bits(scale::<F>(accumulator, entry.factor_exponent))
        }
    }
}

/// [`parse_partial_with`] on the process-wide table
#[cfg(feature = "std")]
pub fn parse_partial<F: BinaryFloat, S: AsRef<[u8]>>(text: S) -> Conversion<F> {
    parse_partial_with(Exp10Table::global(), text)
}

/// [`parse_with`] on the process-wide table
#[cfg(feature = "std")]
pub fn parse<F: BinaryFloat, S: AsRef<[u8]>>(text: S) -> F {
    parse_with(Exp10Table::global(), text)
}

/// [`try_parse_with`] on the process-wide table
#[cfg(feature = "std")]
pub fn try_parse<F: BinaryFloat, S: AsRef<[u8]>>(text: S) -> Result<F> {
    try_parse_with(Exp10Table::global(), text)
}

/// [`trace_with`] on the process-wide table
#[cfg(feature = "std")]
pub fn trace<S: AsRef<[u8]>>(text: S) -> Option<Trace> {
    trace_with(Exp10Table::global(), text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits64(text: &str) -> u64 {
        let table = Exp10Table::new();
        parse_with::<f64, _>(&table, text).to_bits()
    }

    fn bits32(text: &str) -> u32 {
        let table = Exp10Table::new();
        parse_with::<f32, _>(&table, text).to_bits()
    }

    #[test]
    fn test_literal_scenarios() {
        assert_eq!(bits64("0"), 0);
        assert_eq!(bits64("-0.0"), (-0.0f64).to_bits());
        assert_eq!(bits64("1e400"), f64::INFINITY.to_bits());
        assert_eq!(bits64("1e-400"), 0);
        assert_eq!(bits64("5e-324"), 0x0000_0000_0000_0001);
        assert_eq!(bits64("1.7976931348623157e308"), 0x7fef_ffff_ffff_ffff);
        assert_eq!(bits64("2.2250738585072014e-308"), 0x0010_0000_0000_0000);
    }

    #[test]
    fn test_boundaries_and_overflow() {
        assert_eq!(bits64("2.225073858507201e-308"), 0x000f_ffff_ffff_ffff);
        assert_eq!(bits64("1.7976931348623159e308"), f64::INFINITY.to_bits());
        assert_eq!(bits64("-1e400"), f64::NEG_INFINITY.to_bits());
        assert_eq!(bits64("-1e-400"), (-0.0f64).to_bits());
        assert_eq!(bits64("1e99999999999999999999"), f64::INFINITY.to_bits());
        assert_eq!(bits64("1e-99999999999999999999"), 0);
    }

    #[test]
    fn test_common_values() {
        for text in [
            "1",
            "0.1",
            "3.14159",
            "-2.5e-3",
            "123456789012345678901234567890",
            "1e23",
            "8.98846567431158e307",
            "4.9406564584124654e-324",
            ".5",
            "5.",
        ] {
            let expected: f64 = text.parse().unwrap();
            assert_eq!(bits64(text), expected.to_bits(), "{text}");
        }
    }

    #[test]
    fn test_ties_to_even() {
        // 2^53 + 1 sits halfway between 2^53 and 2^53 + 2
        assert_eq!(bits64("9007199254740993"), 9_007_199_254_740_992f64.to_bits());
        // 2^53 + 3 sits halfway between 2^53 + 2 and 2^53 + 4
        assert_eq!(bits64("9007199254740995"), 9_007_199_254_740_996f64.to_bits());
        // Anything past the tie rounds up
        assert_eq!(
            bits64("9007199254740993.0000001"),
            9_007_199_254_740_994f64.to_bits()
        );
    }

    #[test]
    fn test_fractions_near_ties() {
        // 1 + 2^-53 = 1.00000000000000011102230246251565...
        assert_eq!(bits64("1.000000000000000111022303"), 0x3ff0_0000_0000_0001);
        assert_eq!(bits64("1.000000000000000111022302"), 0x3ff0_0000_0000_0000);
        // 1 + 2^-24 = 1.000000059604644775390625
        assert_eq!(bits32("1.0000000596046448"), 0x3f80_0001);
        assert_eq!(bits32("1.0000000596046447"), 0x3f80_0000);
        // Trailing zeros keep an integer halfway value exact
        assert_eq!(
            bits64("9007199254740993.000000000"),
            9_007_199_254_740_992f64.to_bits()
        );
        assert_eq!(bits32("16777217.00"), 16_777_216f32.to_bits());
    }

    #[test]
    fn test_closer_than_the_precision_bound() {
        // 1e23 - 1e-17 sits about 2^-133 below a halfway point
        let bits = bits64("9.999999999999999999999999999999999999999e22");
        assert!(
            [0x44b5_2d02_c7e1_4af6, 0x44b5_2d02_c7e1_4af7].contains(&bits),
            "{bits:#x}"
        );
        // Exact single precision halfway point with a fractional expansion
        let bits = bits32("1.430340080332825891673564910888671875e-5");
        assert!([0x376f_f8a3, 0x376f_f8a4].contains(&bits), "{bits:#x}");
    }

    #[test]
    fn test_non_finite_tokens() {
        assert_eq!(bits64("inf"), f64::INFINITY.to_bits());
        assert_eq!(bits64("-Infinity"), f64::NEG_INFINITY.to_bits());
        let table = Exp10Table::new();
        assert!(parse_with::<f64, _>(&table, "NaN").is_nan());
        assert!(parse_with::<f32, _>(&table, "nan").is_nan());
    }

    #[test]
    fn test_grammar_failure_is_signed_zero() {
        let table = Exp10Table::new();
        let conversion = parse_partial_with::<f64, _>(&table, "-x");
        assert_eq!(conversion.consumed, 0);
        assert!(conversion.negative);
        assert_eq!(conversion.bits(), (-0.0f64).to_bits());

        let conversion = parse_partial_with::<f64, _>(&table, "abc");
        assert_eq!((conversion.consumed, conversion.bits()), (0, 0));
    }

    #[test]
    fn test_partial_reports_consumed() {
        let table = Exp10Table::new();
        let conversion = parse_partial_with::<f64, _>(&table, "1.5e3,2");
        assert_eq!(conversion.value, 1500.0);
        assert_eq!(conversion.consumed, 5);

        let conversion = parse_partial_with::<f64, _>(&table, b"42e".as_slice());
        assert_eq!(conversion.value, 42.0);
        assert_eq!(conversion.consumed, 2);
    }

    #[test]
    fn test_strict_parse() {
        let table = Exp10Table::new();
        assert_eq!(try_parse_with::<f64, _>(&table, "0.25"), Ok(0.25));
        assert_eq!(try_parse_with::<f64, _>(&table, ""), Err(ParseError::Empty));
        assert_eq!(try_parse_with::<f64, _>(&table, "-"), Err(ParseError::Empty));
        assert_eq!(
            try_parse_with::<f64, _>(&table, "1.0x"),
            Err(ParseError::TrailingCharacters { offset: 3 })
        );
        assert_eq!(
            try_parse_with::<f64, _>(&table, "1e+"),
            Err(ParseError::TrailingCharacters { offset: 1 })
        );
    }

    #[test]
    fn test_single_precision() {
        assert_eq!(bits32("1"), 1.0f32.to_bits());
        assert_eq!(bits32("0.1"), 0.1f32.to_bits());
        assert_eq!(bits32("3.4028235e38"), f32::MAX.to_bits());
        assert_eq!(bits32("3.5e38"), f32::INFINITY.to_bits());
        assert_eq!(bits32("1e-45"), 1);
        assert_eq!(bits32("7.1e-46"), 1);
        assert_eq!(bits32("7e-46"), 0);
        assert_eq!(bits32("1.1754944e-38"), f32::MIN_POSITIVE.to_bits());
        assert_eq!(bits32("-0"), (-0.0f32).to_bits());
        // 2^24 + 1 ties to 2^24
        assert_eq!(bits32("16777217"), 16_777_216f32.to_bits());
        assert_eq!(bits32("16777219"), 16_777_220f32.to_bits());
    }

    #[test]
    fn test_trace() {
        let table = Exp10Table::new();
        let trace = trace_with(&table, "-1.5").unwrap();
        assert!(trace.negative);
        assert_eq!(trace.decimal_exponent, 0);
        assert_eq!(trace.table_index, 324);
        assert_eq!(libm::scalbn(trace.accumulator.to_scalar(), trace.factor_exponent), 1.5);
        assert_eq!(trace.value::<f64>(), -1.5);
        assert_eq!(trace.value::<f32>(), -1.5f32);

        assert!(trace_with(&table, "0.000").is_none());
        assert!(trace_with(&table, "inf").is_none());
        assert!(trace_with(&table, "1e-325").is_none());
        assert!(trace_with(&table, "").is_none());
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_global_shorthands() {
        assert_eq!(parse::<f64, _>("0.5"), 0.5);
        assert_eq!(parse_partial::<f32, _>("2x").consumed, 1);
        assert_eq!(try_parse::<f64, _>("2x"), Err(ParseError::TrailingCharacters { offset: 1 }));
        assert!(trace("7e10").is_some());
    }
}
