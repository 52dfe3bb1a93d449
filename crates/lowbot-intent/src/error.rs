//! Intent crate error types.

use lowbot_kernel::BotError;

/// Errors raised while defining intents or building a classifier.
#[derive(Debug, thiserror::Error)]
pub enum IntentError {
    /// A regex pattern failed to compile.
    #[error("invalid pattern `{pattern}` for intent `{intent}`: {reason}")]
    InvalidPattern {
        intent: String,
        pattern: String,
        reason: String,
    },

    /// An intent definition is unusable as written.
    #[error("invalid intent `{intent}`: {reason}")]
    InvalidDefinition { intent: String, reason: String },

    /// Two definitions share a name.
    #[error("intent `{0}` is defined more than once")]
    DuplicateIntent(String),

    /// The minimum score is outside `[0, 1]`.
    #[error("minimum score {0} is outside [0, 1]")]
    InvalidMinScore(f64),

    /// The phrase automaton could not be built.
    #[error("failed to build phrase matcher: {0}")]
    Automaton(String),

    /// An intent file could not be parsed.
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Convenience alias used throughout the intent crate.
pub type Result<T> = std::result::Result<T, IntentError>;

impl From<IntentError> for BotError {
    fn from(e: IntentError) -> Self {
        BotError::Config(e.to_string())
    }
}
