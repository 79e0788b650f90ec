//! Rule text format.
//!
//! One rule per line: `pattern = replacement`. The first `=` not preceded by a
//! backslash separates the two halves; `\=` stands for a literal `=` on either
//! side. Blank lines and lines starting with `#` are ignored.

use crate::primitives::{CASE_INSENSITIVE_PREFIX, COMMENT_PREFIX};

/// Pattern as it will be compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedPattern {
    pub expression: String,
    pub case_insensitive: bool,
}

/// Derive the compiled form of a user pattern.
///
/// A leading `(?i)` turns on case-insensitive matching and is stripped. A
/// pattern made only of letters, digits, underscores and spaces is wrapped in
/// word boundaries so it never matches inside a longer word.
#[must_use]
pub fn prepare_pattern(original: &str) -> PreparedPattern {
    let (body, case_insensitive) = match original.strip_prefix(CASE_INSENSITIVE_PREFIX) {
        Some(rest) => (rest, true),
        None => (original, false),
    };
    let expression = if is_plain_words(body) {
        format!(r"\b{body}\b")
    } else {
        body.to_string()
    };
    PreparedPattern {
        expression,
        case_insensitive,
    }
}

fn is_plain_words(pattern: &str) -> bool {
    pattern
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == ' ')
}

/// Whether a line carries no rule.
#[must_use]
pub fn is_ignored_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.is_empty() || trimmed.starts_with(COMMENT_PREFIX)
}

/// Split a rule line into trimmed `(pattern, replacement)`.
///
/// Returns `None` when the line has no unescaped `=`.
#[must_use]
pub fn split_rule_line(line: &str) -> Option<(String, String)> {
    let mut pattern = String::new();
    let mut replacement = String::new();
    let mut split = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        let target = if split { &mut replacement } else { &mut pattern };
        match c {
            '\\' if chars.peek() == Some(&'=') => {
                target.push('=');
                chars.next();
            }
            '=' if !split => split = true,
            _ => target.push(c),
        }
    }

    split.then(|| (pattern.trim().to_string(), replacement.trim().to_string()))
}

/// Escape a field for writing back into rule text.
#[must_use]
pub fn escape_field(field: &str) -> String {
    field.replace('=', r"\=")
}

/// Render one rule as a line of rule text.
#[must_use]
pub fn format_rule_line(pattern: &str, replacement: &str) -> String {
    format!("{}={}", escape_field(pattern), escape_field(replacement))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_words_get_word_boundaries() {
        let prepared = prepare_pattern("Street");
        assert_eq!(prepared.expression, r"\bStreet\b");
        assert!(!prepared.case_insensitive);
    }

    #[test]
    fn case_prefix_is_stripped_before_anchoring() {
        let prepared = prepare_pattern("(?i)north west");
        assert_eq!(prepared.expression, r"\bnorth west\b");
        assert!(prepared.case_insensitive);
    }

    #[test]
    fn expressions_are_left_alone() {
        assert_eq!(prepare_pattern(r"(\d+)th").expression, r"(\d+)th");
    }

    #[test]
    fn split_on_first_unescaped_equals() {
        assert_eq!(
            split_rule_line(r" a\=b = a equals b "),
            Some(("a=b".to_string(), "a equals b".to_string()))
        );
        assert_eq!(
            split_rule_line("x = y = z"),
            Some(("x".to_string(), "y = z".to_string()))
        );
        assert_eq!(split_rule_line("no separator"), None);
    }

    #[test]
    fn other_backslashes_survive() {
        assert_eq!(
            split_rule_line(r"\bAve\b=Av"),
            Some((r"\bAve\b".to_string(), "Av".to_string()))
        );
    }

    #[test]
    fn comments_and_blanks_are_ignored() {
        assert!(is_ignored_line(""));
        assert!(is_ignored_line("   "));
        assert!(is_ignored_line("# Street = St"));
        assert!(!is_ignored_line("Street = St"));
    }

    #[test]
    fn formatted_lines_split_back_to_the_same_fields() {
        let line = format_rule_line("a=b", "c=d");
        assert_eq!(line, r"a\=b=c\=d");
        assert_eq!(
            split_rule_line(&line),
            Some(("a=b".to_string(), "c=d".to_string()))
        );
    }
}
