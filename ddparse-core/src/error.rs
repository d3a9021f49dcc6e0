//! Error types for strict decimal conversion

/// Errors reported by the strict entry points
///
/// The lenient entry points never fail: grammar mismatches resolve to
/// signed zero and out-of-range exponents to zero or infinity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// No numeral, `inf` or `nan` token was recognized at the start of the input
    Empty,
    /// A numeral was recognized but bytes remain after it
    TrailingCharacters {
        /// Byte offset of the first unconsumed byte
        offset: usize,
    },
}

impl core::fmt::Display for ParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ParseError::Empty => write!(f, "No decimal numeral found"),
            ParseError::TrailingCharacters { offset } => {
                write!(f, "Unexpected trailing characters at offset {offset}")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParseError {}

/// Result type for strict conversions
pub type Result<T> = core::result::Result<T, ParseError>;
