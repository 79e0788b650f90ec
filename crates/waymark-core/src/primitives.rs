//! # Innate Primitives
//!
//! Hardcoded runtime constants for the Waymark core.
//!
//! These are compiled into the binary and immutable at runtime. Anything a user
//! may tune (match timeout, separator) has its default here and its override in
//! the app configuration.

use std::time::Duration;

// =============================================================================
// ADDRESS SAMPLING
// =============================================================================

/// Parametric position near the start of an edge used to sample its lowest address.
pub const RANGE_SAMPLE_START: f32 = 0.05;

/// Parametric position near the end of an edge used to sample its highest address.
pub const RANGE_SAMPLE_END: f32 = 0.95;

/// Maximum number of edges a single chain walk may visit.
///
/// Ring roads made only of pass-through nodes would otherwise never end.
pub const MAX_CHAIN_LENGTH: usize = 512;

/// Number of uniform samples used before refining a closest-point search on a curve.
pub const CURVE_SEARCH_SAMPLES: usize = 16;

/// Refinement passes of the closest-point search after the uniform pass.
pub const CURVE_SEARCH_REFINEMENTS: usize = 24;

// =============================================================================
// LABEL FORMATTING
// =============================================================================

/// Separator placed between the two numbers of a range when none is requested.
pub const DEFAULT_RANGE_SEPARATOR: &str = " ~ ";

/// Query option naming the separator.
pub const VAR_SEPARATOR: &str = "separator";

/// Query option whose mere presence flips the range order.
pub const VAR_INVERTED: &str = "inverted";

/// Query option selecting which adjoining segment a query is about.
pub const VAR_TARGET: &str = "target";

// =============================================================================
// ABBREVIATION ENGINE
// =============================================================================

/// Time budget for applying a single rule to a single text.
pub const DEFAULT_MATCH_TIMEOUT: Duration = Duration::from_millis(100);

/// Upper bound for the compiled size of one rule pattern.
pub const MAX_PATTERN_SIZE: usize = 1 << 20;

/// Prefix requesting case-insensitive matching for one rule.
pub const CASE_INSENSITIVE_PREFIX: &str = "(?i)";

/// Lines starting with this are comments in rule files.
pub const COMMENT_PREFIX: char = '#';

/// Name of the rule file created on first run.
pub const DEFAULT_RULE_FILE_NAME: &str = "_default.txt";

/// Contents of the rule file created on first run. Documentation only, no active rules.
pub const DEFAULT_RULE_FILE_CONTENTS: &str = "\
# Example:
# Street = St
# Remove the initial '#' to make the line effective!
# Each entry is a regular expression followed by '=' and the replacement text.
# Starting a line with (?i) makes the expression case insensitive.
# Use backslash (\\) to escape a '=' used inside the expression: a\\=b = a equals b
# Plain words (letters, digits and spaces only) only match whole words,
# so 'Street' will not touch 'Streetwise'.
# Rules run top to bottom; each rule sees the output of the previous one.
#
# This file (_default.txt) is loaded when a session has no rules of its own.
# Other files in this folder can be selected in waymark.toml (rule_file = ...).
";

// =============================================================================
// PERSISTENCE FORMAT
// =============================================================================

/// Current version tag of the binary rule set format.
///
/// Increment this when making breaking changes to the serialization format.
pub const RULESET_FORMAT_VERSION: u32 = 0;

/// Maximum accepted size of a persisted rule set.
pub const MAX_RULESET_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

/// Maximum number of rules accepted from a persisted rule set.
pub const MAX_PERSISTED_RULES: usize = 65_536;
