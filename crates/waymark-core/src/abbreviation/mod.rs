//! # Abbreviation Engine
//!
//! Shortens street names for display on plates ("Street" to "St", ...).
//!
//! Rules are regular expressions with a replacement, applied top to bottom.
//! Results are memoized per rule list, and the list can be swapped at any time
//! (hot reload) without restarting the host.
//!
//! ## Layout
//!
//! - `matcher`: the [`PatternCompiler`]/[`PatternMatcher`] seam and its `regex` backend
//! - `rules`: the line-oriented rule text format
//! - `engine`: the shared [`AbbreviationEngine`]

mod engine;
mod matcher;
mod rules;

pub use engine::{AbbreviationEngine, AbbreviationRule, LoadReport, SkippedLine};
pub use matcher::{PatternCompiler, PatternMatcher, RegexCompiler, RegexMatcher};
pub use rules::{PreparedPattern, escape_field, format_rule_line, prepare_pattern, split_rule_line};
