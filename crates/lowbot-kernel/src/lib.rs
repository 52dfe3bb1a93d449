//! LowBot dispatch kernel.
//!
//! This crate turns an inbound chat message into exactly one delivered reply:
//!
//! - **[`envelope`]** -- Inbound [`Utterance`]s, classification results and
//!   the immutable [`RequestEnvelope`].
//! - **[`classifier`]** -- The swappable [`Classifier`] contract.
//! - **[`skill`]** / **[`registry`]** -- The [`Skill`] contract and the
//!   ordered, first-match-wins [`SkillRegistry`].
//! - **[`adapter`]** -- Adapter bindings, credential resolution, client login
//!   and the connected [`AdapterSet`].
//! - **[`format`]** -- Per-adapter output rendering.
//! - **[`dispatcher`]** -- The staged pipeline with its single recovery
//!   boundary, concurrency cap and stage timeouts.
//! - **[`events`]** -- Structured event logging and a broadcast [`EventBus`].
//! - **[`error`]** -- [`BotError`] and the closed [`ErrorKind`] taxonomy.
//!
//! All shared types are `Send + Sync` and read-only once the bot is built.

pub mod adapter;
pub mod bot;
pub mod classifier;
pub mod config;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod events;
pub mod format;
pub mod registry;
pub mod skill;

// Re-export the most commonly used types at the crate root for convenience.
pub use adapter::{
    AdapterBinding, AdapterConf, AdapterSet, ChatClient, ClientFactory, ConnectedAdapter,
    EnvSource, LoginMethod, ProcessEnv, TOKEN_KEY,
};
pub use bot::BotBuilder;
pub use classifier::Classifier;
pub use config::DispatchConfig;
pub use dispatcher::{DispatchOutcome, DispatchReport, DispatchStage, Dispatcher};
pub use envelope::{
    ClassifiedIntent, EnvelopeBuilder, RequestEnvelope, Session, SlotData, SlotExtractor,
    Utterance, build_envelope,
};
pub use error::{BotError, ErrorKind, Result};
pub use events::{BotEvent, EventBus, Severity};
pub use format::{Markup, OutputConfig, OutputFormatter, RenderedResponse};
pub use registry::{MatchOutcome, SkillRegistry, SkillRegistryBuilder};
pub use skill::{Skill, SkillInfo};
