//! The skill contract.
//!
//! A skill declares which envelopes it services through
//! [`Skill::can_handle`] and produces reply content through
//! [`Skill::handle`].  Handlers return a [`serde_json::Value`] because skills
//! are pluggable and may hand back anything; the dispatcher only accepts a
//! non-empty JSON string as content.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::envelope::RequestEnvelope;
use crate::error::Result;

/// Descriptive metadata for a skill.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillInfo {
    /// Skill name; names need not be unique.
    pub name: String,
    /// Locales the skill can reply in (e.g. `en`, `fr`).
    #[serde(default)]
    pub locales: Vec<String>,
}

impl SkillInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            locales: Vec::new(),
        }
    }

    pub fn with_locales<I, S>(mut self, locales: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.locales = locales.into_iter().map(Into::into).collect();
        self
    }
}

/// A pluggable handler for envelopes.
#[async_trait]
pub trait Skill: Send + Sync {
    /// Metadata used for registration, matching logs and reports.
    fn info(&self) -> &SkillInfo;

    /// Whether this skill services `envelope`.
    ///
    /// Must be total and side-effect free.  An `Err` is treated as "does not
    /// handle" and logged as an anomaly.
    fn can_handle(&self, envelope: &RequestEnvelope) -> Result<bool>;

    /// Produce reply content for `envelope`.
    async fn handle(&self, envelope: &RequestEnvelope) -> Result<serde_json::Value>;
}
