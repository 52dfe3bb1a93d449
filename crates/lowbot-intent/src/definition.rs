//! Intent definitions.
//!
//! An intent is a name plus the ways a user may express it: literal phrases
//! and regex patterns.  Patterns may carry named captures (for example
//! `(?P<city>\w+)`), which become slot data on the request envelope.
//!
//! ```toml
//! [[intents]]
//! name = "greet"
//! phrases = ["hello", "hi", "good morning"]
//!
//! [[intents]]
//! name = "weather"
//! patterns = ['weather in (?P<city>\w+)']
//! pattern_score = 0.95
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{IntentError, Result};

/// Score given to a pattern match when the definition does not set one.
pub const DEFAULT_PATTERN_SCORE: f64 = 0.9;

/// One intent and the phrases and patterns that express it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentDefinition {
    pub name: String,
    /// Literal phrases, matched case-insensitively on word boundaries.
    #[serde(default)]
    pub phrases: Vec<String>,
    /// Regex patterns, matched case-insensitively anywhere in the text.
    #[serde(default)]
    pub patterns: Vec<String>,
    /// Score reported when one of `patterns` matches.
    #[serde(default = "default_pattern_score")]
    pub pattern_score: f64,
}

fn default_pattern_score() -> f64 {
    DEFAULT_PATTERN_SCORE
}

impl IntentDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phrases: Vec::new(),
            patterns: Vec::new(),
            pattern_score: DEFAULT_PATTERN_SCORE,
        }
    }

    pub fn with_phrase(mut self, phrase: impl Into<String>) -> Self {
        self.phrases.push(phrase.into());
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    pub fn with_pattern_score(mut self, score: f64) -> Self {
        self.pattern_score = score;
        self
    }

    fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| IntentError::InvalidDefinition {
            intent: self.name.clone(),
            reason: reason.to_string(),
        };
        if self.name.trim().is_empty() {
            return Err(invalid("name is empty"));
        }
        if self.phrases.is_empty() && self.patterns.is_empty() {
            return Err(invalid("needs at least one phrase or pattern"));
        }
        if self.phrases.iter().any(|p| p.trim().is_empty()) {
            return Err(invalid("phrases must not be blank"));
        }
        if !(0.0..=1.0).contains(&self.pattern_score) {
            return Err(invalid("pattern_score must be within [0, 1]"));
        }
        Ok(())
    }
}

/// An ordered collection of intent definitions.
///
/// Order matters: when two intents score the same, the earlier one wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntentSet {
    #[serde(default)]
    pub intents: Vec<IntentDefinition>,
}

impl IntentSet {
    pub fn new(intents: Vec<IntentDefinition>) -> Self {
        Self { intents }
    }

    /// Parse a TOML document with an `[[intents]]` array.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let set: Self = toml::from_str(source)?;
        set.validate()?;
        Ok(set)
    }

    /// Check every definition and reject duplicate names.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for intent in &self.intents {
            intent.validate()?;
            if !seen.insert(intent.name.as_str()) {
                return Err(IntentError::DuplicateIntent(intent.name.clone()));
            }
        }
        Ok(())
    }

    pub fn names(&self) -> Vec<&str> {
        self.intents.iter().map(|i| i.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.intents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }
}

impl From<Vec<IntentDefinition>> for IntentSet {
    fn from(intents: Vec<IntentDefinition>) -> Self {
        Self::new(intents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_toml() {
        let set = IntentSet::from_toml_str(
            r#"
            [[intents]]
            name = "greet"
            phrases = ["hello", "hi"]

            [[intents]]
            name = "weather"
            patterns = ['weather in (?P<city>\w+)']
            pattern_score = 0.95
            "#,
        )
        .expect("valid intents");

        assert_eq!(set.names(), vec!["greet", "weather"]);
        assert_eq!(set.intents[0].pattern_score, DEFAULT_PATTERN_SCORE);
        assert_eq!(set.intents[1].pattern_score, 0.95);
    }

    #[test]
    fn rejects_duplicates() {
        let set = IntentSet::new(vec![
            IntentDefinition::new("greet").with_phrase("hello"),
            IntentDefinition::new("greet").with_phrase("hi"),
        ]);
        assert!(matches!(
            set.validate(),
            Err(IntentError::DuplicateIntent(name)) if name == "greet"
        ));
    }

    #[test]
    fn rejects_empty_definitions() {
        let set = IntentSet::new(vec![IntentDefinition::new("greet")]);
        assert!(matches!(
            set.validate(),
            Err(IntentError::InvalidDefinition { .. })
        ));

        let set = IntentSet::new(vec![IntentDefinition::new(" ").with_phrase("hello")]);
        assert!(set.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_pattern_score() {
        let set = IntentSet::new(vec![
            IntentDefinition::new("weather")
                .with_pattern("weather")
                .with_pattern_score(1.5),
        ]);
        assert!(set.validate().is_err());
    }

    #[test]
    fn bad_toml_is_an_error() {
        assert!(matches!(
            IntentSet::from_toml_str("[[intents]]\nname = 3"),
            Err(IntentError::Toml(_))
        ));
    }
}
