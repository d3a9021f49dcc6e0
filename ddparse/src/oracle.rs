//! Reference conversions and input generation
//!
//! The standard library's `str::parse` is correctly rounded for both `f64`
//! and `f32`, so it serves as the reference every conversion is checked
//! against.

use std::fmt::{self, Write};

use ddparse_core::{parse_with, BinaryFloat, Exp10Table, Trace};
use libm::scalbn;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, Result};

/// Longest digit string produced by [`random_digits`]
pub const MAX_RANDOM_DIGITS: usize = 24;

/// Target format of a conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum Precision {
    #[default]
    Double,
    Single,
}

impl Precision {
    /// Smallest decimal exponent that can produce a non-zero value
    pub fn min_decimal_exponent(self) -> i32 {
        match self {
            Precision::Double => f64::MIN_DECIMAL_EXPONENT,
            Precision::Single => f32::MIN_DECIMAL_EXPONENT,
        }
    }

    /// Largest decimal exponent that can produce a finite value
    pub fn max_decimal_exponent(self) -> i32 {
        match self {
            Precision::Double => f64::MAX_DECIMAL_EXPONENT,
            Precision::Single => f32::MAX_DECIMAL_EXPONENT,
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precision::Double => write!(f, "f64"),
            Precision::Single => write!(f, "f32"),
        }
    }
}

/// Expected signed bit pattern for `text`
pub fn oracle_bits(precision: Precision, text: &str) -> Result<u64> {
    let parsed = match precision {
        Precision::Double => text.parse::<f64>().map(f64::to_bits),
        Precision::Single => text.parse::<f32>().map(|value| u64::from(value.to_bits())),
    };
    parsed.map_err(|_| HarnessError::OracleRejected {
        input: text.to_owned(),
    })
}

/// Signed bit pattern produced by the conversion core
pub fn convert_bits(table: &Exp10Table, precision: Precision, text: &str) -> u64 {
    match precision {
        Precision::Double => parse_with::<f64, _>(table, text).to_bits(),
        Precision::Single => u64::from(parse_with::<f32, _>(table, text).to_bits()),
    }
}

/// Bits of the naive finish: collapse the accumulator to one double and
/// scale it by the power of two
///
/// This rounds twice and is only kept as a comparison column.
pub fn collapsed_bits(trace: &Trace, precision: Precision) -> u64 {
    let magnitude = scalbn(trace.accumulator.to_scalar(), trace.factor_exponent);
    let value = if trace.negative { -magnitude } else { magnitude };
    match precision {
        Precision::Double => value.to_bits(),
        Precision::Single => u64::from((value as f32).to_bits()),
    }
}

/// Shortest decimal string that reads back as `bits`
pub fn shortest_repr(precision: Precision, bits: u64) -> String {
    match precision {
        Precision::Double => format!("{:e}", f64::from_bits(bits)),
        Precision::Single => format!("{:e}", f32::from_bits(bits as u32)),
    }
}

/// Uniformly random bit pattern of a finite value
pub fn random_finite_bits<R: Rng>(precision: Precision, rng: &mut R) -> u64 {
    loop {
        match precision {
            Precision::Double => {
                let bits: u64 = rng.gen();
                if f64::from_bits(bits).is_finite() {
                    return bits;
                }
            }
            Precision::Single => {
                let bits: u32 = rng.gen();
                if f32::from_bits(bits).is_finite() {
                    return u64::from(bits);
                }
            }
        }
    }
}

/// Random numeral `[-]d[.ddd]e<exp>` with up to [`MAX_RANDOM_DIGITS`] digits
///
/// The exponent ranges a little past the representable decimal range so
/// that underflow and overflow are exercised too.
pub fn random_digits<R: Rng>(precision: Precision, rng: &mut R) -> String {
    let len = rng.gen_range(1..=MAX_RANDOM_DIGITS);
    let mut text = String::with_capacity(len + 8);
    if rng.gen_bool(0.5) {
        text.push('-');
    }
    text.push(char::from(b'0' + rng.gen_range(1..=9u8)));
    if len > 1 {
        text.push('.');
        for _ in 1..len {
            text.push(char::from(b'0' + rng.gen_range(0..=9u8)));
        }
    }
    let exponent = rng.gen_range(
        precision.min_decimal_exponent() - 2..=precision.max_decimal_exponent() + 2,
    );
    // Writing into a String cannot fail
    let _ = write!(text, "e{exponent}");
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_oracle_bits() {
        assert_eq!(oracle_bits(Precision::Double, "1.5").unwrap(), 1.5f64.to_bits());
        assert_eq!(
            oracle_bits(Precision::Single, "-0.1").unwrap(),
            u64::from((-0.1f32).to_bits())
        );
        assert!(matches!(
            oracle_bits(Precision::Double, "1.5x"),
            Err(HarnessError::OracleRejected { .. })
        ));
    }

    #[test]
    fn test_convert_matches_oracle_on_simple_inputs() {
        let table = Exp10Table::new();
        for precision in [Precision::Double, Precision::Single] {
            for text in ["0", "-0", "1", "0.3", "6.02214076e23", "-1e-40", "inf"] {
                assert_eq!(
                    convert_bits(&table, precision, text),
                    oracle_bits(precision, text).unwrap(),
                    "{precision} {text}"
                );
            }
        }
    }

    #[test]
    fn test_collapsed_agrees_on_easy_values() {
        let table = Exp10Table::new();
        let trace = ddparse_core::trace_with(&table, "-0.75").unwrap();
        assert_eq!(collapsed_bits(&trace, Precision::Double), (-0.75f64).to_bits());
        assert_eq!(
            collapsed_bits(&trace, Precision::Single),
            u64::from((-0.75f32).to_bits())
        );
    }

    #[test]
    fn test_shortest_repr_round_trips() {
        let mut rng = StdRng::seed_from_u64(7);
        for precision in [Precision::Double, Precision::Single] {
            for _ in 0..100 {
                let bits = random_finite_bits(precision, &mut rng);
                let text = shortest_repr(precision, bits);
                assert_eq!(oracle_bits(precision, &text).unwrap(), bits, "{text}");
            }
        }
    }

    #[test]
    fn test_random_digits_shape() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let text = random_digits(Precision::Single, &mut rng);
            let (mantissa, exponent) = text.split_once('e').unwrap();
            let exponent: i32 = exponent.parse().unwrap();
            assert!((-48..=40).contains(&exponent), "{text}");
            let digits = mantissa.bytes().filter(u8::is_ascii_digit).count();
            assert!((1..=MAX_RANDOM_DIGITS).contains(&digits), "{text}");
            assert!(oracle_bits(Precision::Single, &text).is_ok(), "{text}");
        }
    }
}
