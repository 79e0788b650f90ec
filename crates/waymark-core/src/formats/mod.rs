//! # Formats Module
//!
//! Binary persistence of abbreviation rule sets.
//!
//! File I/O lives in the app layer; this module only maps rules to bytes and back.

mod persistence;

pub use persistence::*;
