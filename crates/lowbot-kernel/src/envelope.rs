//! Inbound messages and the canonical request envelope.
//!
//! An [`Utterance`] is what an adapter hands to the bot: raw text plus who
//! said it, where, and through which adapter.  Once classified, it is wrapped
//! into a [`RequestEnvelope`], the immutable value every later pipeline stage
//! reads from.  Envelope fields are private; skills get read-only accessors.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BotError, Result};

/// Structured slot values extracted from the utterance text.
pub type SlotData = HashMap<String, String>;

// ---------------------------------------------------------------------------
// Utterance
// ---------------------------------------------------------------------------

/// A raw inbound chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Utterance {
    /// The message text as received.
    pub text: String,
    /// Identifier of the message author on the originating platform.
    pub author: String,
    /// Identifier of the channel the message arrived on.
    pub channel: String,
    /// Name of the adapter that received the message.
    pub adapter: String,
    /// Optional locale tag (e.g. `en`, `fr`).
    pub locale: Option<String>,
    /// When the adapter received the message.
    pub received_at: DateTime<Utc>,
}

impl Utterance {
    /// Create an utterance stamped with the current time.
    pub fn new(
        adapter: impl Into<String>,
        channel: impl Into<String>,
        author: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            author: author.into(),
            channel: channel.into(),
            adapter: adapter.into(),
            locale: None,
            received_at: Utc::now(),
        }
    }

    /// Attach a locale tag.
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Classification result
// ---------------------------------------------------------------------------

/// A classifier's best guess for an utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedIntent {
    /// Name of the best-matching intent.
    pub intent_name: String,
    /// Confidence in `[0, 1]`.
    pub score: f64,
}

impl ClassifiedIntent {
    /// Create a classification, clamping the score into `[0, 1]`.
    ///
    /// A NaN score becomes `0.0`.
    pub fn new(intent_name: impl Into<String>, score: f64) -> Self {
        let score = if score.is_nan() {
            0.0
        } else {
            score.clamp(0.0, 1.0)
        };
        Self {
            intent_name: intent_name.into(),
            score,
        }
    }

    /// Whether the score exceeds `min_score`.
    pub fn is_resolved(&self, min_score: f64) -> bool {
        self.score > min_score
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Session identity carried by an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub author: String,
    pub channel: String,
    pub adapter: String,
    pub locale: Option<String>,
}

/// The immutable request passed by reference through the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct RequestEnvelope {
    session: Session,
    intent: ClassifiedIntent,
    input_data: Option<SlotData>,
    text: String,
}

impl RequestEnvelope {
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn intent(&self) -> &ClassifiedIntent {
        &self.intent
    }

    /// Extracted slot data, if an extractor produced any.
    pub fn input_data(&self) -> Option<&SlotData> {
        self.input_data.as_ref()
    }

    /// Look up a single slot value.
    pub fn slot(&self, name: &str) -> Option<&str> {
        self.input_data
            .as_ref()
            .and_then(|slots| slots.get(name))
            .map(String::as_str)
    }

    /// The original message text.
    pub fn text(&self) -> &str {
        &self.text
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Pluggable slot extraction.  Must be pure.
pub trait SlotExtractor: Send + Sync {
    /// Extract slot values for `intent` from `text`; `None` when there are
    /// none.
    fn extract(&self, text: &str, intent: &ClassifiedIntent) -> Option<SlotData>;
}

/// Builds envelopes, optionally running a [`SlotExtractor`].
#[derive(Clone, Default)]
pub struct EnvelopeBuilder {
    extractor: Option<Arc<dyn SlotExtractor>>,
}

impl EnvelopeBuilder {
    /// A builder that never fills `input_data`.
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder that fills `input_data` from `extractor`.
    pub fn with_extractor(extractor: Arc<dyn SlotExtractor>) -> Self {
        Self {
            extractor: Some(extractor),
        }
    }

    /// Wrap a classified utterance into a [`RequestEnvelope`].
    ///
    /// Fails with [`BotError::MalformedMessage`] when the utterance has no
    /// author or channel.
    pub fn build(
        &self,
        utterance: &Utterance,
        intent: ClassifiedIntent,
    ) -> Result<RequestEnvelope> {
        if utterance.author.trim().is_empty() {
            return Err(BotError::MalformedMessage {
                reason: "message has no author".into(),
            });
        }
        if utterance.channel.trim().is_empty() {
            return Err(BotError::MalformedMessage {
                reason: "message has no channel".into(),
            });
        }

        let input_data = self
            .extractor
            .as_ref()
            .and_then(|extractor| extractor.extract(&utterance.text, &intent));

        Ok(RequestEnvelope {
            session: Session {
                author: utterance.author.clone(),
                channel: utterance.channel.clone(),
                adapter: utterance.adapter.clone(),
                locale: utterance.locale.clone(),
            },
            intent,
            input_data,
            text: utterance.text.clone(),
        })
    }
}

/// Build an envelope without slot extraction.
pub fn build_envelope(utterance: &Utterance, intent: ClassifiedIntent) -> Result<RequestEnvelope> {
    EnvelopeBuilder::new().build(utterance, intent)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
