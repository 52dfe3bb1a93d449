//! Keyword intent classifier.
//!
//! Scores text against every intent in an [`IntentSet`] in two ways:
//!
//! | Technique | Score |
//! |-----------|-------|
//! | Phrase match via [`aho_corasick`], on word boundaries | `0.6 + 0.4 * phrase_len / text_len` |
//! | Pattern match via [`regex`], named captures become slots | the intent's `pattern_score` |
//!
//! Each intent keeps its best score; the highest-scoring intent wins and ties
//! go to the intent defined first.  A phrase that is the whole message
//! therefore scores `1.0`, while a phrase buried in a long sentence scores
//! closer to `0.6`.
//!
//! The classifier is built once and never mutated, so it is shared freely
//! across dispatches.
//!
//! # Example
//!
//! ```rust
//! # use lowbot_intent::{IntentDefinition, KeywordClassifier};
//! let classifier = KeywordClassifier::new(
//!     vec![
//!         IntentDefinition::new("greet").with_phrase("hello"),
//!         IntentDefinition::new("weather").with_pattern(r"weather in (?P<city>\w+)"),
//!     ],
//!     0.75,
//! )
//! .unwrap();
//!
//! let intent = classifier.classify_text("Hello");
//! assert_eq!(intent.intent_name, "greet");
//! assert_eq!(intent.score, 1.0);
//! ```

use async_trait::async_trait;
use aho_corasick::AhoCorasick;
use regex::{Regex, RegexBuilder};

use lowbot_kernel::{ClassifiedIntent, Classifier, SlotData, SlotExtractor};

use crate::definition::IntentSet;
use crate::error::{IntentError, Result};

/// Intent name reported when nothing clears the minimum score.
pub const NO_INTENT: &str = "none";

/// Lowest score a phrase match can produce.
const PHRASE_FLOOR: f64 = 0.6;

// ---------------------------------------------------------------------------
// Internal types
// ---------------------------------------------------------------------------

struct PatternRoute {
    intent: usize,
    compiled: Regex,
    score: f64,
}

// ---------------------------------------------------------------------------
// KeywordClassifier
// ---------------------------------------------------------------------------

/// Phrase and pattern based [`Classifier`] that also extracts slots.
pub struct KeywordClassifier {
    /// Intent names, in definition order.
    intents: Vec<String>,
    /// Normalised phrases and the index of their intent.
    phrases: Vec<(String, usize)>,
    automaton: Option<AhoCorasick>,
    patterns: Vec<PatternRoute>,
    min_score: f64,
}

impl KeywordClassifier {
    /// Build a classifier from intent definitions and a minimum score.
    ///
    /// Classifications below `min_score` are reported as [`NO_INTENT`] with
    /// the score they reached.
    pub fn new(intents: impl Into<IntentSet>, min_score: f64) -> Result<Self> {
        let set = intents.into();
        set.validate()?;
        if !(0.0..=1.0).contains(&min_score) {
            return Err(IntentError::InvalidMinScore(min_score));
        }

        let mut names = Vec::with_capacity(set.len());
        let mut phrases = Vec::new();
        let mut patterns = Vec::new();

        for (index, intent) in set.intents.into_iter().enumerate() {
            for phrase in &intent.phrases {
                phrases.push((normalize(phrase), index));
            }
            for pattern in &intent.patterns {
                let compiled = RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| IntentError::InvalidPattern {
                        intent: intent.name.clone(),
                        pattern: pattern.clone(),
                        reason: e.to_string(),
                    })?;
                patterns.push(PatternRoute {
                    intent: index,
                    compiled,
                    score: intent.pattern_score,
                });
            }
            names.push(intent.name);
        }

        let automaton = if phrases.is_empty() {
            None
        } else {
            let needles: Vec<&str> = phrases.iter().map(|(p, _)| p.as_str()).collect();
            Some(AhoCorasick::new(&needles).map_err(|e| IntentError::Automaton(e.to_string()))?)
        };

        tracing::debug!(
            intents = names.len(),
            phrases = phrases.len(),
            patterns = patterns.len(),
            min_score,
            "keyword classifier built"
        );

        Ok(Self {
            intents: names,
            phrases,
            automaton,
            patterns,
            min_score,
        })
    }

    /// Classify `text` synchronously.
    pub fn classify_text(&self, text: &str) -> ClassifiedIntent {
        let best = self.rank(text).into_iter().next();
        let intent = match best {
            Some(top) if top.is_resolved(self.min_score) => top,
            Some(top) => ClassifiedIntent::new(NO_INTENT, top.score),
            None => ClassifiedIntent::new(NO_INTENT, 0.0),
        };
        tracing::debug!(
            text = %text,
            intent = %intent.intent_name,
            score = intent.score,
            "text classified"
        );
        intent
    }

    /// Every intent that matched `text`, best first.
    pub fn rank(&self, text: &str) -> Vec<ClassifiedIntent> {
        let mut scores: Vec<Option<f64>> = vec![None; self.intents.len()];
        let mut offer = |intent: usize, score: f64| {
            let slot = &mut scores[intent];
            if slot.is_none_or(|current| score > current) {
                *slot = Some(score);
            }
        };

        let normalized = normalize(text);
        if let Some(ac) = &self.automaton
            && !normalized.is_empty()
        {
            let text_len = normalized.chars().count() as f64;
            for mat in ac.find_overlapping_iter(&normalized) {
                if !on_word_boundary(&normalized, mat.start(), mat.end()) {
                    continue;
                }
                let (phrase, intent) = &self.phrases[mat.pattern().as_usize()];
                let coverage = phrase.chars().count() as f64 / text_len;
                offer(*intent, PHRASE_FLOOR + (1.0 - PHRASE_FLOOR) * coverage);
            }
        }

        let trimmed = text.trim();
        for route in &self.patterns {
            if route.compiled.is_match(trimmed) {
                offer(route.intent, route.score);
            }
        }

        let mut ranked: Vec<ClassifiedIntent> = scores
            .into_iter()
            .enumerate()
            .filter_map(|(index, score)| {
                score.map(|s| ClassifiedIntent::new(self.intents[index].clone(), s))
            })
            .collect();
        // Stable sort keeps definition order on ties.
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked
    }

    /// Named captures of the first pattern of `intent_name` that matches
    /// `text`.
    pub fn extract_slots(&self, text: &str, intent_name: &str) -> Option<SlotData> {
        let index = self.intents.iter().position(|name| name == intent_name)?;
        let trimmed = text.trim();

        self.patterns
            .iter()
            .filter(|route| route.intent == index)
            .find_map(|route| {
                let caps = route.compiled.captures(trimmed)?;
                let slots: SlotData = route
                    .compiled
                    .capture_names()
                    .flatten()
                    .filter_map(|name| {
                        caps.name(name)
                            .map(|m| (name.to_string(), m.as_str().to_string()))
                    })
                    .collect();
                (!slots.is_empty()).then_some(slots)
            })
    }

    pub fn min_score(&self) -> f64 {
        self.min_score
    }

    pub fn intent_names(&self) -> &[String] {
        &self.intents
    }

    pub fn phrase_count(&self) -> usize {
        self.phrases.len()
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }
}

#[async_trait]
impl Classifier for KeywordClassifier {
    async fn classify(&self, text: &str) -> lowbot_kernel::Result<ClassifiedIntent> {
        Ok(self.classify_text(text))
    }
}

impl SlotExtractor for KeywordClassifier {
    fn extract(&self, text: &str, intent: &ClassifiedIntent) -> Option<SlotData> {
        self.extract_slots(text, &intent.intent_name)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Lowercase and collapse runs of whitespace.
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether `text[start..end]` is not glued to surrounding letters or digits.
fn on_word_boundary(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    before.is_none_or(|c| !c.is_alphanumeric()) && after.is_none_or(|c| !c.is_alphanumeric())
}
