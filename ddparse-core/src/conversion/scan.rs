//! Decimal scanner
//!
//! Splits ASCII text into sign, decimal exponent and the span of
//! significant digits. Grammar:
//!
//! ```text
//! [+-]? ( "inf" | "infinity" | "nan" )          (case-insensitive)
//! [+-]? digit* ( '.' digit* )? ( [eE] [+-]? digit+ )?
//! ```
//!
//! The scanner allocates nothing and never looks at the power-of-ten table.

/// Significant part of a finite numeral
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Components<'a> {
    /// Power of ten of the first significant digit
    pub exponent: i64,
    /// Digits from the first significant digit to the end of the significand,
    /// possibly containing one `.`
    pub digits: &'a [u8],
}

/// Where a decimal exponent falls relative to a supported range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExponentRange {
    /// Below the minimum, the value rounds to zero
    Underflow,
    /// Within range
    InRange,
    /// Above the maximum, the value rounds to infinity
    Overflow,
}

impl Components<'_> {
    /// Classify the exponent against `[min, max]`
    pub fn classify(&self, min: i32, max: i32) -> ExponentRange {
        if self.exponent < i64::from(min) {
            ExponentRange::Underflow
        } else if self.exponent > i64::from(max) {
            ExponentRange::Overflow
        } else {
            ExponentRange::InRange
        }
    }

    /// Iterate over the digit values, skipping the decimal point
    pub fn digit_values(&self) -> impl Iterator<Item = u32> + '_ {
        self.digits
            .iter()
            .filter(|&&c| c != b'.')
            .map(|&c| u32::from(c - b'0'))
    }
}

/// Lexical category of the scanned input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lexeme<'a> {
    /// No digit in either the integer or the fractional part
    Invalid,
    /// Digits were found but all of them are zero
    Zero,
    /// The `inf` / `infinity` token
    Infinity,
    /// The `nan` token
    NotANumber,
    /// A numeral with at least one non-zero digit
    Finite(Components<'a>),
}

/// Result of scanning one numeral
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scan<'a> {
    /// Whether a leading `-` was present
    pub negative: bool,
    /// What was recognized
    pub lexeme: Lexeme<'a>,
    /// Number of bytes belonging to the numeral (0 on grammar failure)
    pub consumed: usize,
}

/// Scan a numeral at the start of `text`
pub fn scan(text: &[u8]) -> Scan<'_> {
    let len = text.len();
    let mut p = 0;
    let mut negative = false;
    if let Some(&sign @ (b'+' | b'-')) = text.first() {
        negative = sign == b'-';
        p = 1;
    }

    if let Some(token_len) = non_finite_token(&text[p..]) {
        let lexeme = if token_len == 3 && text[p..p + 3].eq_ignore_ascii_case(b"nan") {
            Lexeme::NotANumber
        } else {
            Lexeme::Infinity
        };
        return Scan {
            negative,
            lexeme,
            consumed: p + token_len,
        };
    }

    // Exponent of the most significant integer digit; one less than the
    // count of integer digits.
    let mut exponent: i64 = -1;
    let mut significand_begin = p;
    while p < len && text[p].is_ascii_digit() {
        exponent += 1;
        p += 1;
    }
    if p < len && text[p] == b'.' {
        if p == significand_begin {
            significand_begin += 1;
        }
        p += 1;
        while p < len && text[p].is_ascii_digit() {
            p += 1;
        }
    }
    if p == significand_begin {
        return Scan {
            negative,
            lexeme: Lexeme::Invalid,
            consumed: 0,
        };
    }
    let significand_end = p;
    let mut consumed = p;

    if p < len && matches!(text[p], b'e' | b'E') {
        if let Some((suffix, end)) = exponent_suffix(text, p + 1) {
            exponent = exponent.saturating_add(suffix);
            consumed = end;
        }
    }

    let mut first = significand_begin;
    while first < significand_end && matches!(text[first], b'0' | b'.') {
        if text[first] == b'0' {
            exponent = exponent.saturating_sub(1);
        }
        first += 1;
    }

    let lexeme = if first == significand_end {
        Lexeme::Zero
    } else {
        Lexeme::Finite(Components {
            exponent,
            digits: &text[first..significand_end],
        })
    };

    Scan {
        negative,
        lexeme,
        consumed,
    }
}

/// Length of a leading `inf`, `infinity` or `nan` token
fn non_finite_token(text: &[u8]) -> Option<usize> {
    const INFINITY: &[u8] = b"infinity";
    if text.len() >= INFINITY.len() && text[..INFINITY.len()].eq_ignore_ascii_case(INFINITY) {
        return Some(INFINITY.len());
    }
    if text.len() >= 3
        && (text[..3].eq_ignore_ascii_case(b"inf") || text[..3].eq_ignore_ascii_case(b"nan"))
    {
        return Some(3);
    }
    None
}

/// Parse `[+-]? digit+` starting at `start`, saturating on overflow
///
/// Returns the signed value and the offset just past the last digit, or
/// `None` when no digit follows.
fn exponent_suffix(text: &[u8], start: usize) -> Option<(i64, usize)> {
    let mut q = start;
    let negative = match text.get(q) {
        Some(b'-') => {
            q += 1;
            true
        }
        Some(b'+') => {
            q += 1;
            false
        }
        _ => false,
    };

    let digits_start = q;
    let mut value: i64 = 0;
    while let Some(&c) = text.get(q) {
        if !c.is_ascii_digit() {
            break;
        }
        value = value.saturating_mul(10).saturating_add(i64::from(c - b'0'));
        q += 1;
    }

    if q == digits_start {
        return None;
    }
    Some((if negative { -value } else { value }, q))
}
