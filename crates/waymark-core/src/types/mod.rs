//! # Core Type Definitions
//!
//! This module contains the shared vocabulary of the Waymark core:
//! - Entity handles (`Entity`, `AggregateId`)
//! - Version tokens used for identity-based staleness checks (`VersionToken`)
//! - Error types (`WaymarkError`)
//!
//! ## Handle Guarantees
//!
//! All handles in this module:
//! - Are plain integers into an arena, never pointers
//! - Implement `Ord` for deterministic ordering in `BTreeMap`/`BTreeSet`

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

// =============================================================================
// ENTITY HANDLES
// =============================================================================

/// Handle of anything living in the world-state store.
///
/// Edges, nodes, lanes and placed objects all share one handle space, the same
/// way the host engine does. The kind of an entity is decided by which table
/// of the road network knows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Entity(pub u64);

impl Entity {
    /// Get the raw handle value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of a logical road that spans several graph edges.
///
/// Edges split at mid-block nodes keep the aggregate of the road they came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AggregateId(pub u64);

// =============================================================================
// VERSION TOKEN
// =============================================================================

/// Opaque identifier minted every time a record is (re)computed.
///
/// Tokens are only ever compared for identity. Two computations that happen to
/// produce the same numbers still carry different tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionToken(Uuid);

impl VersionToken {
    /// Mint a token that has never been handed out before.
    #[must_use]
    pub fn fresh() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Waymark system.
///
/// Transient unavailability (a range that is still being computed) is never an
/// error; it surfaces as `None` from the resolver instead.
#[derive(Debug, Error)]
pub enum WaymarkError {
    /// A rule pattern could not be compiled.
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A rule line could not be split into pattern and replacement.
    #[error("Malformed rule line: {0}")]
    MalformedRule(String),

    /// A single match attempt exceeded its time budget.
    #[error("Match timed out after {elapsed_ms} ms for pattern '{pattern}'")]
    MatchTimeout { pattern: String, elapsed_ms: u128 },

    /// Persisted data was written by a newer format than this build understands.
    #[error("Incompatible rule set version {found} (max supported {supported})")]
    IncompatibleVersion { found: u32, supported: u32 },

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A configuration file could not be parsed.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A road scenario description is inconsistent.
    #[error("Scenario error: {0}")]
    ScenarioError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for WaymarkError {
    fn from(e: std::io::Error) -> Self {
        Self::IoError(e.to_string())
    }
}

// =============================================================================
// TESTS
// =============================================================================
