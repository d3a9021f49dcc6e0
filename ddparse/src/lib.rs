//! ddparse - verification harness for the ddparse conversion core
//!
//! The conversion engine lives in `ddparse-core` and is re-exported here.
//! This crate adds what is needed to trust it:
//!
//! - **oracle**: reference conversions through the standard library and
//!   random input generation
//! - **fuzz**: parallel randomized comparison against the reference
//! - **suite**: a JSON regression suite comparing the exact scaler with the
//!   collapsed two-rounding finish
//!
//! ## Quick Start
//!
//! ```rust
//! use ddparse::{fuzz, Exp10Table, FuzzConfig};
//!
//! let table = Exp10Table::new();
//! let report = fuzz::run(&table, &FuzzConfig::with_samples(1_000)).unwrap();
//! assert!(report.is_clean());
//! ```

pub use ddparse_core::{
    // Entry points
    parse, parse_partial, parse_partial_with, parse_with, trace, trace_with, try_parse,
    try_parse_with,
    // Building blocks
    BinaryFloat, Conversion, DoubleDouble, Exp10Table, PowerOfTenEntry, Trace,
    // Error handling
    ParseError,
};

pub mod error;
pub mod fuzz;
pub mod oracle;
pub mod suite;

pub use error::{HarnessError, Result};
pub use fuzz::{FuzzConfig, FuzzReport, Sampling};
pub use oracle::Precision;
pub use suite::{Algorithm, RegressionRow, SuiteConfig, SuiteReport};
