//! Kernel error types and the failure taxonomy.
//!
//! Every stage of the dispatch pipeline surfaces errors through [`BotError`].
//! Recovery never inspects the error message: it asks for the
//! [`ErrorKind`], which is a closed set with one user-facing reply and one log
//! severity per kind.  Variants that do not belong to a named kind (malformed
//! messages, unknown adapters, internal faults) fall into
//! [`ErrorKind::Unknown`].

use serde::{Deserialize, Serialize};

use crate::events::Severity;

// ---------------------------------------------------------------------------
// Taxonomy
// ---------------------------------------------------------------------------

/// The closed set of failure kinds the recovery stage knows how to answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A payment provider reported insufficient funds.
    PaymentDeclined,
    /// A skill handler returned content that is not a usable string.
    UnprocessableSkillResponse,
    /// The intent did not clear the score threshold, or no skill matched it.
    UnresolvableIntent,
    /// A dependent service refused the connection, failed, or timed out.
    ServiceUnavailable,
    /// Anything outside the set above.
    Unknown,
}

impl ErrorKind {
    /// The reply sent back to the originating channel.
    pub fn reply(self) -> &'static str {
        match self {
            Self::PaymentDeclined => "you don't have enough for that",
            Self::UnprocessableSkillResponse => "my skill for this is broken, try later",
            Self::UnresolvableIntent => "I understand your intent but have no skill for that",
            Self::ServiceUnavailable => "the data service I need is down",
            Self::Unknown => "sorry, something went wrong on my end",
        }
    }

    /// The severity the failure is logged at.
    pub fn severity(self) -> Severity {
        match self {
            Self::Unknown => Severity::Critical,
            Self::PaymentDeclined
            | Self::UnprocessableSkillResponse
            | Self::UnresolvableIntent
            | Self::ServiceUnavailable => Severity::Error,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::PaymentDeclined => "payment_declined",
            Self::UnprocessableSkillResponse => "unprocessable_skill_response",
            Self::UnresolvableIntent => "unresolvable_intent",
            Self::ServiceUnavailable => "service_unavailable",
            Self::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Unified error type for the LowBot kernel.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    // -- Taxonomy errors ----------------------------------------------------
    /// The payment provider declined the charge.
    #[error("payment declined: {reason}")]
    PaymentDeclined { reason: String },

    /// A skill handler produced something other than a content string.
    #[error("skill `{skill}` returned unprocessable content: {reason}")]
    UnprocessableSkillResponse { skill: String, reason: String },

    /// The intent could not be resolved to a skill.
    #[error("unresolvable intent `{intent}`: {reason}")]
    UnresolvableIntent { intent: String, reason: String },

    /// A dependent service is unreachable or failed.
    #[error("service `{service}` unavailable: {reason}")]
    ServiceUnavailable { service: String, reason: String },

    /// A suspension point exceeded the configured deadline.
    #[error("{stage} stage timed out after {millis}ms")]
    StageTimeout { stage: String, millis: u64 },

    // -- Input and lookup errors --------------------------------------------
    /// The inbound message lacks session identity.
    #[error("malformed message: {reason}")]
    MalformedMessage { reason: String },

    /// The adapter name was never registered.
    #[error("unknown adapter: {adapter}")]
    UnknownAdapter { adapter: String },

    // -- Startup errors -----------------------------------------------------
    /// A skill failed validation at registration time.
    #[error("invalid skill registration: {reason}")]
    InvalidSkill { reason: String },

    /// A credential required by an adapter is not present in the environment.
    #[error("adapter `{adapter}` requires `{key}` (env var `{env_var}` is not set)")]
    MissingCredential {
        adapter: String,
        key: String,
        env_var: String,
    },

    /// An adapter client could not be constructed or failed to log in.
    #[error("adapter `{adapter}` failed to start: {reason}")]
    AdapterStartup { adapter: String, reason: String },

    /// The bot was assembled with an incomplete or inconsistent configuration.
    #[error("configuration error: {0}")]
    Config(String),

    // -- Generic ------------------------------------------------------------
    /// Catch-all for faults that don't fit a specific variant.  Prefer a typed
    /// variant whenever possible.
    #[error("internal error: {0}")]
    Internal(String),
}

impl BotError {
    /// Map this error onto the recovery taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PaymentDeclined { .. } => ErrorKind::PaymentDeclined,
            Self::UnprocessableSkillResponse { .. } => ErrorKind::UnprocessableSkillResponse,
            Self::UnresolvableIntent { .. } => ErrorKind::UnresolvableIntent,
            Self::ServiceUnavailable { .. } | Self::StageTimeout { .. } => {
                ErrorKind::ServiceUnavailable
            }
            Self::MalformedMessage { .. }
            | Self::UnknownAdapter { .. }
            | Self::InvalidSkill { .. }
            | Self::MissingCredential { .. }
            | Self::AdapterStartup { .. }
            | Self::Config(_)
            | Self::Internal(_) => ErrorKind::Unknown,
        }
    }

    /// Shorthand for a [`BotError::ServiceUnavailable`].
    pub fn service_unavailable(service: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            service: service.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`BotError::PaymentDeclined`].
    pub fn payment_declined(reason: impl Into<String>) -> Self {
        Self::PaymentDeclined {
            reason: reason.into(),
        }
    }
}

/// Connection-level I/O failures mean the other side is down; everything else
/// is an internal fault.
impl From<std::io::Error> for BotError {
    fn from(e: std::io::Error) -> Self {
        use std::io::ErrorKind as Io;
        match e.kind() {
            Io::ConnectionRefused
            | Io::ConnectionReset
            | Io::ConnectionAborted
            | Io::NotConnected
            | Io::BrokenPipe
            | Io::TimedOut => Self::service_unavailable("io", e.to_string()),
            _ => Self::Internal(e.to_string()),
        }
    }
}

/// Convenience alias used throughout the kernel crate.
pub type Result<T> = std::result::Result<T, BotError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
