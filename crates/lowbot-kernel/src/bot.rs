//! Bot assembly.
//!
//! [`BotBuilder`] gathers the classifier, skills, adapter bindings and
//! configuration, validates them, connects every adapter, and produces a
//! [`Dispatcher`].  Nothing it assembles can be changed afterwards.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::adapter::{AdapterBinding, AdapterSet, EnvSource};
use crate::classifier::Classifier;
use crate::config::DispatchConfig;
use crate::dispatcher::Dispatcher;
use crate::envelope::{EnvelopeBuilder, SlotExtractor};
use crate::error::{BotError, Result};
use crate::events::{BotEvent, EventBus};
use crate::registry::SkillRegistry;
use crate::skill::Skill;

/// Assembles a [`Dispatcher`].
#[derive(Default)]
pub struct BotBuilder {
    config: DispatchConfig,
    classifier: Option<Arc<dyn Classifier>>,
    extractor: Option<Arc<dyn SlotExtractor>>,
    skills: Vec<Arc<dyn Skill>>,
    adapters: Vec<AdapterBinding>,
    events: Option<EventBus>,
}

impl BotBuilder {
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn slot_extractor(mut self, extractor: Arc<dyn SlotExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Append a skill.  Registration order is matching order.
    pub fn skill(mut self, skill: Arc<dyn Skill>) -> Self {
        self.skills.push(skill);
        self
    }

    pub fn adapter(mut self, binding: AdapterBinding) -> Self {
        self.adapters.push(binding);
        self
    }

    /// Use an existing event bus instead of creating one.
    pub fn events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Validate everything, connect the adapters and freeze the result.
    ///
    /// Adapter credentials are resolved from `env`.  The first error aborts
    /// startup.
    pub async fn build(self, env: &dyn EnvSource) -> Result<Dispatcher> {
        self.config.validate().map_err(BotError::Config)?;

        let classifier = self
            .classifier
            .ok_or_else(|| BotError::Config("no classifier configured".into()))?;

        let mut registry = SkillRegistry::builder();
        for skill in self.skills {
            registry.register(skill)?;
        }
        if registry.is_empty() {
            warn!("no skills registered; every dispatch will be unresolvable");
        }
        let registry = registry.build();

        let events = self
            .events
            .unwrap_or_else(|| EventBus::new(self.config.event_capacity));

        let mut adapters = AdapterSet::new(self.config.default_adapter.clone());
        for binding in self.adapters {
            if adapters.contains(&binding.name) {
                warn!(adapter = %binding.name, "adapter already loaded; skipping duplicate");
                continue;
            }
            let connected = binding.connect(env).await?;
            let name = connected.name().to_string();
            if adapters.insert(connected) {
                events.emit(BotEvent::AdapterReady {
                    adapter: name,
                    timestamp: Utc::now(),
                });
            }
        }
        if !adapters.contains(&self.config.default_adapter) {
            warn!(
                default_adapter = %self.config.default_adapter,
                "default adapter is not loaded"
            );
        }

        let envelopes = match self.extractor {
            Some(extractor) => EnvelopeBuilder::with_extractor(extractor),
            None => EnvelopeBuilder::new(),
        };

        info!(
            skills = registry.len(),
            adapters = adapters.len(),
            min_score = self.config.min_score,
            max_in_flight = self.config.max_in_flight,
            "bot assembled"
        );

        Ok(Dispatcher::new(
            classifier,
            envelopes,
            registry,
            adapters,
            events,
            self.config,
        ))
    }
}

impl Dispatcher {
    /// Start assembling a dispatcher.
    pub fn builder(config: DispatchConfig) -> BotBuilder {
        BotBuilder::new(config)
    }
}
