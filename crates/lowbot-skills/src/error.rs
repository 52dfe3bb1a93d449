//! Error types for the skills crate.

use std::path::PathBuf;

use lowbot_kernel::BotError;

/// Skill definition errors.
#[derive(Debug, thiserror::Error)]
pub enum SkillError {
    #[error("invalid skill `{name}`: {reason}")]
    InvalidManifest { name: String, reason: String },

    #[error("failed to parse skill file `{path}`: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, SkillError>;

impl From<SkillError> for BotError {
    fn from(e: SkillError) -> Self {
        match e {
            SkillError::InvalidManifest { .. } => BotError::InvalidSkill {
                reason: e.to_string(),
            },
            other => BotError::Config(other.to_string()),
        }
    }
}
