//! Pattern matching seam of the abbreviation engine.
//!
//! The engine only talks to [`PatternCompiler`] and [`PatternMatcher`]. The
//! default implementation wraps the `regex` crate and enforces a per-rule time
//! budget between successive matches.

use crate::primitives::{DEFAULT_MATCH_TIMEOUT, MAX_PATTERN_SIZE};
use crate::WaymarkError;
use regex::{Regex, RegexBuilder};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A compiled pattern that can rewrite text.
pub trait PatternMatcher: Send + Sync + fmt::Debug {
    /// Replace every match in `text`. `$1`, `${name}` and `$$` expand in `replacement`.
    fn replace_all(&self, text: &str, replacement: &str) -> Result<String, WaymarkError>;
}

/// Builds matchers from pattern strings.
pub trait PatternCompiler: Send + Sync + fmt::Debug {
    fn compile(
        &self,
        pattern: &str,
        case_insensitive: bool,
    ) -> Result<Arc<dyn PatternMatcher>, WaymarkError>;
}

/// Compiler backed by the `regex` crate.
#[derive(Debug, Clone)]
pub struct RegexCompiler {
    match_timeout: Duration,
    size_limit: usize,
}

impl RegexCompiler {
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_MATCH_TIMEOUT)
    }

    #[must_use]
    pub fn with_timeout(match_timeout: Duration) -> Self {
        Self {
            match_timeout,
            size_limit: MAX_PATTERN_SIZE,
        }
    }

    #[must_use]
    pub fn match_timeout(&self) -> Duration {
        self.match_timeout
    }
}

impl Default for RegexCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternCompiler for RegexCompiler {
    fn compile(
        &self,
        pattern: &str,
        case_insensitive: bool,
    ) -> Result<Arc<dyn PatternMatcher>, WaymarkError> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .size_limit(self.size_limit)
            .build()
            .map_err(|e| WaymarkError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Arc::new(RegexMatcher {
            regex,
            timeout: self.match_timeout,
        }))
    }
}

/// A compiled `regex` pattern with a time budget.
#[derive(Debug)]
pub struct RegexMatcher {
    regex: Regex,
    timeout: Duration,
}

impl PatternMatcher for RegexMatcher {
    fn replace_all(&self, text: &str, replacement: &str) -> Result<String, WaymarkError> {
        let started = Instant::now();
        let mut output = String::with_capacity(text.len());
        let mut last_end = 0;

        for captures in self.regex.captures_iter(text) {
            let elapsed = started.elapsed();
            if elapsed >= self.timeout {
                return Err(WaymarkError::MatchTimeout {
                    pattern: self.regex.as_str().to_string(),
                    elapsed_ms: elapsed.as_millis(),
                });
            }
            let Some(whole) = captures.get(0) else {
                continue;
            };
            output.push_str(&text[last_end..whole.start()]);
            captures.expand(replacement, &mut output);
            last_end = whole.end();
        }

        output.push_str(&text[last_end..]);
        Ok(output)
    }
}
