//! Ordered find-and-replace normalisation applied to extracted Markdown.
//!
//! A [`ReplaceStrategy`] is an ordered list of literal `pattern → replacement`
//! rules. Each rule is *saturated* before the next one runs: its pattern is
//! replaced repeatedly until no occurrence is left, so `"\n\n\n" → "\n\n"`
//! turns any run of three or more newlines into exactly two.
//!
//! ## Termination
//!
//! A rule whose replacement contains its own pattern (`"a" → "aa"`) can never
//! saturate. Such rules are applied in a single pass. A rule with a shorter
//! replacement than its pattern always runs to its fixpoint. Any other rule
//! stops at a fixpoint or after [`MAX_PASSES`] passes, whichever comes first.

use crate::error::DocMdError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// Upper bound on replacement passes for a rule that does not shrink the text.
pub const MAX_PASSES: usize = 1024;

/// Rules applied to every converted document unless the caller opts out.
///
/// 1. Collapse runs of 3+ newlines to a single blank line.
/// 2. Flatten deeply indented list items.
/// 3. Shorten long `x` redaction runs.
/// 4. Merge doubled bullet markers.
pub const DEFAULT_RULES: &[(&str, &str)] = &[
    ("\n\n\n", "\n\n"),
    ("      - ", "- "),
    ("xxxxxxx", "xxx"),
    ("- -", "-"),
];

/// A single literal replacement rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replacement {
    pub pattern: String,
    pub replacement: String,
}

impl Replacement {
    /// `true` when applying the rule can never remove the last occurrence.
    fn reintroduces_pattern(&self) -> bool {
        self.replacement.contains(self.pattern.as_str())
    }

    /// Replace until the pattern no longer occurs (or the pass budget runs out).
    fn saturate(&self, mut text: String) -> String {
        if !text.contains(self.pattern.as_str()) {
            return text;
        }
        if self.reintroduces_pattern() {
            debug!(
                pattern = ?self.pattern,
                "replacement contains its pattern; applying a single pass"
            );
            return text.replace(self.pattern.as_str(), &self.replacement);
        }

        // Every productive pass of a shrinking rule shortens the text, so it
        // always reaches a fixpoint and is exempt from the pass budget.
        let shrinks = self.replacement.len() < self.pattern.len();
        let mut passes = 0;
        loop {
            let next = text.replace(self.pattern.as_str(), &self.replacement);
            if next == text {
                return text;
            }
            text = next;
            if !text.contains(self.pattern.as_str()) {
                return text;
            }
            passes += 1;
            if !shrinks && passes >= MAX_PASSES {
                break;
            }
        }

        warn!(
            pattern = ?self.pattern,
            passes = MAX_PASSES,
            "replacement did not reach a fixpoint; stopping"
        );
        text
    }
}

/// An ordered, validated list of [`Replacement`] rules.
///
/// Serialises as a JSON array of `{ "pattern": ..., "replacement": ... }`
/// objects. Deserialising rejects empty patterns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Replacement>", into = "Vec<Replacement>")]
pub struct ReplaceStrategy {
    rules: Vec<Replacement>,
}

impl ReplaceStrategy {
    /// Build a strategy from ordered `(pattern, replacement)` pairs.
    ///
    /// # Errors
    /// [`DocMdError::EmptyPattern`] if any pattern is the empty string.
    pub fn new<I, P, R>(pairs: I) -> Result<Self, DocMdError>
    where
        I: IntoIterator<Item = (P, R)>,
        P: Into<String>,
        R: Into<String>,
    {
        let mut strategy = Self::empty();
        strategy.extend(pairs)?;
        Ok(strategy)
    }

    /// A strategy with no rules; applying it returns the input unchanged.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// The built-in [`DEFAULT_RULES`].
    pub fn default_strategy() -> Self {
        Self {
            rules: DEFAULT_RULES
                .iter()
                .map(|(p, r)| Replacement {
                    pattern: (*p).to_string(),
                    replacement: (*r).to_string(),
                })
                .collect(),
        }
    }

    /// Append one rule after the existing ones.
    pub fn push(
        &mut self,
        pattern: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Result<(), DocMdError> {
        let pattern = pattern.into();
        if pattern.is_empty() {
            return Err(DocMdError::EmptyPattern {
                index: self.rules.len(),
            });
        }
        self.rules.push(Replacement {
            pattern,
            replacement: replacement.into(),
        });
        Ok(())
    }

    /// Append several rules, keeping their order.
    pub fn extend<I, P, R>(&mut self, pairs: I) -> Result<(), DocMdError>
    where
        I: IntoIterator<Item = (P, R)>,
        P: Into<String>,
        R: Into<String>,
    {
        for (p, r) in pairs {
            self.push(p, r)?;
        }
        Ok(())
    }

    /// Parse a JSON array of `{ "pattern", "replacement" }` objects.
    pub fn from_json(json: &str) -> Result<Self, DocMdError> {
        serde_json::from_str(json).map_err(|e| DocMdError::InvalidStrategy(e.to_string()))
    }

    /// Read and parse a JSON strategy file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, DocMdError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            DocMdError::InvalidStrategy(format!("cannot read '{}': {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    /// Apply every rule in order, saturating each before moving on.
    pub fn apply(&self, text: &str) -> String {
        self.rules
            .iter()
            .fold(text.to_string(), |acc, rule| rule.saturate(acc))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Replacement> {
        self.rules.iter()
    }
}

impl Default for ReplaceStrategy {
    fn default() -> Self {
        Self::default_strategy()
    }
}

impl TryFrom<Vec<Replacement>> for ReplaceStrategy {
    type Error = DocMdError;

    fn try_from(rules: Vec<Replacement>) -> Result<Self, Self::Error> {
        Self::new(rules.into_iter().map(|r| (r.pattern, r.replacement)))
    }
}

impl From<ReplaceStrategy> for Vec<Replacement> {
    fn from(strategy: ReplaceStrategy) -> Self {
        strategy.rules
    }
}

/// Apply `strategy` to `text`. See [`ReplaceStrategy::apply`].
pub fn apply_strategy_replace(text: &str, strategy: &ReplaceStrategy) -> String {
    strategy.apply(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_newline_runs_to_two() {
        let s = ReplaceStrategy::new([("\n\n\n", "\n\n")]).unwrap();
        assert_eq!(s.apply("hello\n\n\n\nworld"), "hello\n\nworld");
        assert_eq!(s.apply("a\n\n\n\n\n\n\n\nb"), "a\n\nb");
    }

    #[test]
    fn rules_apply_in_order() {
        // "ab" -> "c" first, then "cc" -> "d"
        let s = ReplaceStrategy::new([("ab", "c"), ("cc", "d")]).unwrap();
        assert_eq!(s.apply("abab"), "d");

        // Reversed order: "cc" has nothing to match before "ab" runs.
        let s = ReplaceStrategy::new([("cc", "d"), ("ab", "c")]).unwrap();
        assert_eq!(s.apply("abab"), "cc");
    }

    #[test]
    fn self_reintroducing_rule_terminates() {
        let s = ReplaceStrategy::new([("a", "aa")]).unwrap();
        assert_eq!(s.apply("bab"), "baab");
    }

    #[test]
    fn shrinking_rule_saturates() {
        let s = ReplaceStrategy::new([("xxxxxxx", "xxx")]).unwrap();
        // 20 -> 12 -> 8 -> 4
        assert_eq!(s.apply(&"x".repeat(20)), "xxxx");
    }

    #[test]
    fn shrinking_rule_ignores_pass_budget() {
        // One occurrence per pass, six spaces removed each time.
        let input = format!("{}- item", " ".repeat(6 * (MAX_PASSES + 76)));
        let s = ReplaceStrategy::default();
        let once = s.apply(&input);
        assert_eq!(once, "- item");
        assert_eq!(s.apply(&once), once);
    }

    #[test]
    fn empty_pattern_is_rejected() {
        let err = ReplaceStrategy::new([("ok", "fine"), ("", "boom")]).unwrap_err();
        assert!(matches!(err, DocMdError::EmptyPattern { index: 1 }));

        let mut s = ReplaceStrategy::empty();
        assert!(s.push("", "x").is_err());
        assert!(s.is_empty());
    }

    #[test]
    fn empty_strategy_is_identity() {
        assert_eq!(ReplaceStrategy::empty().apply("a\n\n\n\nb"), "a\n\n\n\nb");
    }

    #[test]
    fn default_strategy_matches_rule_table() {
        let s = ReplaceStrategy::default();
        assert_eq!(s.len(), DEFAULT_RULES.len());
        assert_eq!(s.apply("- - item"), "- item");
        assert_eq!(s.apply("      - nested"), "- nested");
    }

    #[test]
    fn json_round_trip_keeps_order() {
        let json = r#"[{"pattern":"b","replacement":"c"},{"pattern":"a","replacement":"b"}]"#;
        let s = ReplaceStrategy::from_json(json).unwrap();
        let patterns: Vec<&str> = s.iter().map(|r| r.pattern.as_str()).collect();
        assert_eq!(patterns, ["b", "a"]);
        assert_eq!(s.apply("ab"), "bc");
        assert_eq!(serde_json::to_string(&s).unwrap(), json);
    }

    #[test]
    fn json_with_empty_pattern_is_invalid() {
        let err = ReplaceStrategy::from_json(r#"[{"pattern":"","replacement":"x"}]"#).unwrap_err();
        assert!(matches!(err, DocMdError::InvalidStrategy(_)));
    }

    #[test]
    fn free_function_delegates() {
        let s = ReplaceStrategy::default();
        assert_eq!(apply_strategy_replace("x\n\n\n\ny", &s), "x\n\ny");
    }
}
