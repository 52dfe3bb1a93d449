//! Adapter error types.
//!
//! Adapter failures surface as [`AdapterError`] and convert into the kernel's
//! [`BotError`] where they cross into the dispatch pipeline, so that recovery
//! can pick the right reply.

use lowbot_kernel::BotError;

/// Unified error type for LowBot adapters.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// Writing to or reading from a local stream failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The remote endpoint could not be reached (refused, reset, timed out).
    #[error("adapter `{adapter}` could not reach {url}: {reason}")]
    Unreachable {
        adapter: String,
        url: String,
        reason: String,
    },

    /// The remote endpoint answered with a non-success status.
    #[error("adapter `{adapter}` was rejected with status {status}: {body}")]
    Rejected {
        adapter: String,
        status: u16,
        body: String,
    },

    /// A login method this adapter does not implement.
    #[error("adapter `{adapter}` has no login method `{method}`")]
    UnsupportedLogin { adapter: String, method: String },

    /// Adapter settings are unusable.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience alias used throughout the adapters crate.
pub type Result<T> = std::result::Result<T, AdapterError>;

impl From<AdapterError> for BotError {
    fn from(e: AdapterError) -> Self {
        match e {
            AdapterError::Io(io) => BotError::from(io),
            AdapterError::Unreachable { ref adapter, .. } => {
                BotError::service_unavailable(adapter.clone(), e.to_string())
            }
            AdapterError::Rejected {
                ref adapter,
                status,
                ..
            } if status >= 500 => BotError::service_unavailable(adapter.clone(), e.to_string()),
            AdapterError::Rejected { .. } => BotError::Internal(e.to_string()),
            AdapterError::UnsupportedLogin { .. } | AdapterError::Config(_) => {
                BotError::Config(e.to_string())
            }
        }
    }
}
