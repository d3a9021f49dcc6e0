//! Abstract interfaces for the conversion engine
//!
//! The conversion core is written once and instantiated per target format
//! through the traits in this module.

pub mod float;

pub use float::BinaryFloat;
