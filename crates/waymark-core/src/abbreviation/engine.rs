//! Rule storage, application and memoization.

use super::matcher::{PatternCompiler, PatternMatcher, RegexCompiler};
use super::rules::{format_rule_line, is_ignored_line, prepare_pattern, split_rule_line};
use crate::formats::{rules_from_bytes, rules_to_bytes};
use crate::WaymarkError;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

// =============================================================================
// RULES
// =============================================================================

/// One compiled abbreviation rule.
#[derive(Clone)]
pub struct AbbreviationRule {
    original_pattern: String,
    replacement: String,
    matcher: Arc<dyn PatternMatcher>,
}

impl AbbreviationRule {
    /// The pattern as written by the user, including any `(?i)` prefix.
    #[must_use]
    pub fn original_pattern(&self) -> &str {
        &self.original_pattern
    }

    #[must_use]
    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    pub fn apply(&self, text: &str) -> Result<String, WaymarkError> {
        self.matcher.replace_all(text, &self.replacement)
    }
}

impl fmt::Debug for AbbreviationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbbreviationRule")
            .field("original_pattern", &self.original_pattern)
            .field("replacement", &self.replacement)
            .finish()
    }
}

/// A line of rule text that did not become a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    /// 1-based line number.
    pub line: usize,
    pub text: String,
    pub reason: String,
}

/// Outcome of loading rule text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped: Vec<SkippedLine>,
}

// =============================================================================
// ENGINE
// =============================================================================

/// An immutable rule list with the memo of results computed under it.
struct Generation {
    rules: Vec<AbbreviationRule>,
    memo: Mutex<BTreeMap<String, String>>,
}

impl Generation {
    fn new(rules: Vec<AbbreviationRule>) -> Arc<Self> {
        Arc::new(Self {
            rules,
            memo: Mutex::new(BTreeMap::new()),
        })
    }
}

/// Ordered list of regex rewrite rules applied to sign text.
///
/// Safe to share between threads. Every change to the rule list installs a
/// new generation with an empty memo, so a result computed under an old rule
/// list can never be returned once the new list is visible.
pub struct AbbreviationEngine {
    compiler: Arc<dyn PatternCompiler>,
    current: RwLock<Arc<Generation>>,
}

impl fmt::Debug for AbbreviationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbbreviationEngine")
            .field("compiler", &self.compiler)
            .field("rules", &self.len())
            .finish()
    }
}

impl Default for AbbreviationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AbbreviationEngine {
    /// Engine backed by the `regex` crate with the default match timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::with_compiler(RegexCompiler::new())
    }

    #[must_use]
    pub fn with_compiler(compiler: impl PatternCompiler + 'static) -> Self {
        Self {
            compiler: Arc::new(compiler),
            current: RwLock::new(Generation::new(Vec::new())),
        }
    }

    fn snapshot(&self) -> Arc<Generation> {
        Arc::clone(&*self.current.read())
    }

    fn install(&self, rules: Vec<AbbreviationRule>) {
        *self.current.write() = Generation::new(rules);
    }

    /// Compile a rule without adding it.
    pub fn compile_rule(&self, pattern: &str, replacement: &str) -> Result<AbbreviationRule, WaymarkError> {
        if pattern.is_empty() {
            return Err(WaymarkError::MalformedRule("empty pattern".to_string()));
        }
        let prepared = prepare_pattern(pattern);
        let matcher = self
            .compiler
            .compile(&prepared.expression, prepared.case_insensitive)?;
        Ok(AbbreviationRule {
            original_pattern: pattern.to_string(),
            replacement: replacement.to_string(),
            matcher,
        })
    }

    /// Compile and append one rule.
    pub fn add_rule(&self, pattern: &str, replacement: &str) -> Result<(), WaymarkError> {
        let rule = self.compile_rule(pattern, replacement)?;
        let mut current = self.current.write();
        let mut rules = current.rules.clone();
        rules.push(rule);
        *current = Generation::new(rules);
        Ok(())
    }

    /// Remove every rule.
    pub fn clear(&self) {
        self.install(Vec::new());
    }

    /// Replace the rule list with the rules in `source`.
    ///
    /// Lines that cannot be parsed or compiled are reported and skipped; the
    /// remaining rules keep their order.
    pub fn load(&self, source: &str) -> LoadReport {
        let mut report = LoadReport::default();
        let mut rules = Vec::new();

        for (index, line) in source.lines().enumerate() {
            if is_ignored_line(line) {
                continue;
            }
            let compiled = split_rule_line(line)
                .ok_or_else(|| WaymarkError::MalformedRule("missing '='".to_string()))
                .and_then(|(pattern, replacement)| self.compile_rule(&pattern, &replacement));
            match compiled {
                Ok(rule) => rules.push(rule),
                Err(e) => {
                    tracing::warn!(line = index + 1, error = %e, "skipping abbreviation rule");
                    report.skipped.push(SkippedLine {
                        line: index + 1,
                        text: line.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        report.loaded = rules.len();
        self.install(rules);
        report
    }

    /// Reload from rule text, typically after the backing file changed.
    pub fn reload(&self, source: &str) -> LoadReport {
        let report = self.load(source);
        tracing::info!(
            loaded = report.loaded,
            skipped = report.skipped.len(),
            "abbreviation rules reloaded"
        );
        report
    }

    /// Apply every rule in order, trimming after each one.
    ///
    /// A rule that fails (for example on timeout) is logged and skipped; the
    /// text keeps the value it had before that rule.
    pub fn apply(&self, text: &str) -> String {
        let generation = self.snapshot();
        if let Some(hit) = generation.memo.lock().get(text) {
            return hit.clone();
        }

        let mut output = text.to_string();
        for rule in &generation.rules {
            match rule.apply(&output) {
                Ok(rewritten) => output = rewritten.trim().to_string(),
                Err(e) => tracing::warn!(
                    pattern = %rule.original_pattern,
                    error = %e,
                    "abbreviation rule skipped"
                ),
            }
        }

        generation.memo.lock().insert(text.to_string(), output.clone());
        output
    }

    /// Render the rule list as rule text that [`load`](Self::load) accepts.
    #[must_use]
    pub fn export(&self) -> String {
        self.snapshot()
            .rules
            .iter()
            .map(|rule| format_rule_line(&rule.original_pattern, &rule.replacement) + "\n")
            .collect()
    }

    /// `(pattern, replacement)` pairs in application order.
    #[must_use]
    pub fn rules(&self) -> Vec<(String, String)> {
        self.snapshot()
            .rules
            .iter()
            .map(|rule| (rule.original_pattern.clone(), rule.replacement.clone()))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.current.read().rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of memoized results under the current rule list.
    #[must_use]
    pub fn memo_len(&self) -> usize {
        self.snapshot().memo.lock().len()
    }

    /// Encode the rule list in the versioned binary format.
    pub fn to_bytes(&self) -> Result<Vec<u8>, WaymarkError> {
        rules_to_bytes(&self.rules())
    }

    /// Replace the rule list with the rules of a binary rule set.
    ///
    /// Decoding errors leave the current rules untouched. Rules that decode
    /// but fail to compile are logged and skipped. Returns the number loaded.
    pub fn load_bytes(&self, bytes: &[u8]) -> Result<usize, WaymarkError> {
        let decoded = rules_from_bytes(bytes)?;
        let mut rules = Vec::with_capacity(decoded.len());
        for (pattern, replacement) in decoded {
            match self.compile_rule(&pattern, &replacement) {
                Ok(rule) => rules.push(rule),
                Err(e) => tracing::warn!(%pattern, error = %e, "skipping persisted rule"),
            }
        }
        let loaded = rules.len();
        self.install(rules);
        Ok(loaded)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn engine(source: &str) -> AbbreviationEngine {
        let engine = AbbreviationEngine::new();
        engine.load(source);
        engine
    }

    #[test]
    fn rules_apply_in_order_on_previous_output() {
        let engine = engine("Street = St\nSt = S.\n");
        assert_eq!(engine.apply("Main Street"), "Main S.");
    }

    #[test]
    fn plain_words_only_match_whole_words() {
        let engine = engine("Street = St\n");
        assert_eq!(engine.apply("Streetwise Street"), "Streetwise St");
    }

    #[test]
    fn output_is_trimmed_after_each_rule() {
        let engine = engine("Avenue = \n");
        assert_eq!(engine.apply("Park Avenue"), "Park");
    }

    #[test]
    fn no_rules_returns_input() {
        let engine = AbbreviationEngine::new();
        assert_eq!(engine.apply("  Main Street "), "  Main Street ");
    }

    #[test]
    fn load_reports_bad_lines_and_keeps_the_rest() {
        let engine = AbbreviationEngine::new();
        let report = engine.load("# comment\n\nStreet = St\n(broken = x\nno separator\n = empty\n");
        assert_eq!(report.loaded, 1);
        let lines: Vec<usize> = report.skipped.iter().map(|s| s.line).collect();
        assert_eq!(lines, vec![4, 5, 6]);
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn memo_is_dropped_when_rules_change() {
        let engine = engine("Street = St\n");
        assert_eq!(engine.apply("Main Street"), "Main St");
        assert_eq!(engine.memo_len(), 1);

        engine.reload("Street = Str\n");
        assert_eq!(engine.memo_len(), 0);
        assert_eq!(engine.apply("Main Street"), "Main Str");

        engine.add_rule("Main", "M").expect("add");
        assert_eq!(engine.apply("Main Street"), "M Str");
    }

    #[test]
    fn concurrent_reloads_never_mix_rule_lists() {
        const SHORT: &str = "North = N\nStreet = St\n";
        const LONG: &str = "North = No.\nStreet = Str\n";
        let engine = engine(SHORT);

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for round in 0..200 {
                    engine.reload(if round % 2 == 0 { LONG } else { SHORT });
                }
            });
            for _ in 0..4 {
                scope.spawn(|| {
                    for i in 0..500 {
                        let output = engine.apply(&format!("North {i} Street"));
                        assert!(
                            output == format!("N {i} St") || output == format!("No. {i} Str"),
                            "mixed rule lists produced {output:?}"
                        );
                    }
                });
            }
        });
    }

    #[test]
    fn export_reloads_to_the_same_rules() {
        let engine = engine("(?i)street = St\na\\=b = a equals b\n");
        let exported = engine.export();

        let copy = AbbreviationEngine::new();
        copy.load(&exported);
        assert_eq!(copy.rules(), engine.rules());
        assert_eq!(copy.apply("main STREET"), "main St");
    }

    #[test]
    fn timed_out_rule_is_skipped() {
        let engine = AbbreviationEngine::with_compiler(RegexCompiler::with_timeout(Duration::ZERO));
        engine.load("Street = St\n");
        assert_eq!(engine.apply("Main Street"), "Main Street");
    }

    #[test]
    fn binary_round_trip_preserves_rules() {
        let engine = engine("Street = St\n(?i)avenue = Ave\n");
        let bytes = engine.to_bytes().expect("encode");

        let copy = AbbreviationEngine::new();
        assert_eq!(copy.load_bytes(&bytes).expect("decode"), 2);
        assert_eq!(copy.rules(), engine.rules());
    }

    #[test]
    fn failed_binary_load_keeps_existing_rules() {
        let engine = engine("Street = St\n");
        let mut bytes = engine.to_bytes().expect("encode");
        bytes[0] = 9;
        assert!(engine.load_bytes(&bytes).is_err());
        assert_eq!(engine.len(), 1);
    }
}
