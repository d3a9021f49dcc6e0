//! The three conversion stages
//!
//! Text is scanned into a decimal exponent and a digit span, the digits are
//! accumulated against a table magnitude, and the accumulator is scaled
//! into the bits of the target format.

pub mod accumulate;
pub mod scale;
pub mod scan;

pub use accumulate::accumulate;
pub use scale::scale;
pub use scan::{scan, Components, ExponentRange, Lexeme, Scan};
