//! # Query Module
//!
//! Options attached to a resolver query.
//!
//! Layout templates pass free-form `key=value` variables along with each
//! query. The core only reads the handful of keys it understands and ignores
//! the rest.

use crate::primitives::{DEFAULT_RANGE_SEPARATOR, VAR_INVERTED, VAR_SEPARATOR, VAR_TARGET};
use std::collections::BTreeMap;

/// Which adjoining segment of an object a query is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SegmentTarget {
    /// The edge the object stands on.
    #[default]
    Own,
    /// The paired edge across the corner.
    Side,
}

/// Free-form query variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryVars {
    vars: BTreeMap<String, String>,
}

impl QueryVars {
    /// Create an empty variable set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    /// Separator between the two numbers of a range.
    #[must_use]
    pub fn separator(&self) -> &str {
        self.get(VAR_SEPARATOR).unwrap_or(DEFAULT_RANGE_SEPARATOR)
    }

    /// Whether the range order is flipped. Only presence matters, not the value.
    #[must_use]
    pub fn is_inverted(&self) -> bool {
        self.contains(VAR_INVERTED)
    }

    /// Segment selected by the `target` variable. Anything but `side` means own.
    #[must_use]
    pub fn target(&self) -> SegmentTarget {
        match self.get(VAR_TARGET) {
            Some(value) if value.eq_ignore_ascii_case("side") => SegmentTarget::Side,
            _ => SegmentTarget::Own,
        }
    }

    /// Parse `key=value` pairs; a bare `key` is stored with an empty value.
    pub fn parse_pairs<'a>(pairs: impl IntoIterator<Item = &'a str>) -> Self {
        let mut vars = Self::new();
        for pair in pairs {
            match pair.split_once('=') {
                Some((key, value)) => vars.insert(key.trim(), value),
                None => vars.insert(pair.trim(), ""),
            }
        }
        vars
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryVars {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut vars = Self::new();
        for (key, value) in iter {
            vars.insert(key, value);
        }
        vars
    }
}
