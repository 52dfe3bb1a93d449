//! Keyword intent classification for LowBot.
//!
//! - **[`definition`]**: intent definitions ([`IntentDefinition`],
//!   [`IntentSet`]), loadable from TOML.
//! - **[`classifier`]**: [`KeywordClassifier`], a phrase and pattern matcher
//!   implementing the kernel's `Classifier` and `SlotExtractor` traits.

pub mod classifier;
pub mod definition;
pub mod error;

pub use classifier::{KeywordClassifier, NO_INTENT};
pub use definition::{DEFAULT_PATTERN_SCORE, IntentDefinition, IntentSet};
pub use error::{IntentError, Result};
