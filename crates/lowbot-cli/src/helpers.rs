//! Shared helper functions used across CLI subcommands.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use lowbot_intent::KeywordClassifier;
use lowbot_kernel::{Dispatcher, EnvSource, Skill};
use lowbot_skills::{help_skill, static_skills};

use crate::config::LowbotConfig;

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Initialize the tracing subscriber with the given default log level.
///
/// `RUST_LOG` overrides the level when set.
pub fn init_tracing(default_level: &str, json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_current_span(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }
}

// ---------------------------------------------------------------------------
// Bot assembly
// ---------------------------------------------------------------------------

/// Everything `build_bot` produced.
pub struct Assembled {
    pub dispatcher: Arc<Dispatcher>,
    pub classifier: Arc<KeywordClassifier>,
}

/// The classifier described by `config`.
pub fn build_classifier(config: &LowbotConfig) -> Result<Arc<KeywordClassifier>> {
    let classifier = KeywordClassifier::new(config.intent_set(), config.bot.min_score)
        .context("failed to build the intent classifier")?;
    Ok(Arc::new(classifier))
}

/// Skills in registration order: inline manifests, then `skills_dir`, then
/// the help skill when `help_intent` is set.
pub fn build_skills(config: &LowbotConfig, base: &Path) -> Result<Vec<Arc<dyn Skill>>> {
    let manifests = config.skill_manifests(base)?;
    let mut skills = static_skills(manifests).context("failed to build skills")?;

    if let Some(intent) = &config.help_intent {
        let names = skills.iter().map(|s| s.info().name.clone()).collect();
        skills.push(Arc::new(help_skill(intent.clone(), names)));
    }
    Ok(skills)
}

/// Assemble a dispatcher from `config`.
///
/// `base` is the directory relative paths in the configuration resolve
/// against.
pub async fn build_bot(config: &LowbotConfig, base: &Path, env: &dyn EnvSource) -> Result<Assembled> {
    let classifier = build_classifier(config)?;
    let skills = build_skills(config, base)?;

    let mut builder = Dispatcher::builder(config.bot.clone())
        .classifier(classifier.clone())
        .slot_extractor(classifier.clone());
    for skill in skills {
        builder = builder.skill(skill);
    }
    for (name, settings) in &config.adapters {
        builder = builder.adapter(settings.binding(name));
    }

    let dispatcher = builder.build(env).await.context("failed to start the bot")?;
    info!(
        intents = classifier.intent_names().len(),
        skills = dispatcher.registry().len(),
        adapters = dispatcher.adapters().len(),
        "bot assembled"
    );

    Ok(Assembled {
        dispatcher: Arc::new(dispatcher),
        classifier,
    })
}
