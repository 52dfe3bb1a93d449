//! The dispatch pipeline.
//!
//! One dispatch turns one [`Utterance`] into one delivered reply.  Its stages
//! run strictly in order, each feeding the next:
//!
//! ```text
//! Idle -> Classifying -> Matching -> Handling -> ValidatingOutput
//!      -> Formatting -> Delivering -> Logging -> Done
//!                  \ (any failure) -> Recovering -> Done
//! ```
//!
//! No stage handles its own failures and nothing is retried.  Every error
//! travels to the single recovery stage, which answers the channel with the
//! reply mapped from the error's [`ErrorKind`], logs it at the mapped
//! severity, and finishes the dispatch.  A dispatch therefore always ends in
//! [`DispatchStage::Done`] and never takes the process down.
//!
//! Classification, the skill handler and delivery are the only suspension
//! points; each is bounded by the configured stage timeout.  The number of
//! dispatches running at once is bounded by a semaphore.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::adapter::{AdapterConf, AdapterSet};
use crate::classifier::Classifier;
use crate::config::DispatchConfig;
use crate::envelope::{ClassifiedIntent, EnvelopeBuilder, Utterance};
use crate::error::{BotError, ErrorKind, Result};
use crate::events::{BotEvent, EventBus};
use crate::format::RenderedResponse;
use crate::registry::{MatchOutcome, SkillRegistry};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A state of the per-dispatch state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStage {
    Idle,
    Classifying,
    Matching,
    Handling,
    ValidatingOutput,
    Formatting,
    Delivering,
    Logging,
    Recovering,
    Done,
}

impl std::fmt::Display for DispatchStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Classifying => "classifying",
            Self::Matching => "matching",
            Self::Handling => "handling",
            Self::ValidatingOutput => "validating_output",
            Self::Formatting => "formatting",
            Self::Delivering => "delivering",
            Self::Logging => "logging",
            Self::Recovering => "recovering",
            Self::Done => "done",
        };
        write!(f, "{s}")
    }
}

/// How a dispatch ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// The skill's reply reached the channel.
    Delivered {
        skill: String,
        response: RenderedResponse,
    },
    /// A stage failed and recovery answered instead.
    Recovered {
        kind: ErrorKind,
        failed_at: DispatchStage,
        error: String,
        /// Whether the mapped reply reached the channel.
        reply_delivered: bool,
    },
}

/// Summary of a finished dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchReport {
    pub id: Uuid,
    /// Every stage entered, in order, ending with [`DispatchStage::Done`].
    pub stages: Vec<DispatchStage>,
    pub outcome: DispatchOutcome,
}

impl DispatchReport {
    pub fn is_delivered(&self) -> bool {
        matches!(self.outcome, DispatchOutcome::Delivered { .. })
    }

    /// The recovered error kind, if the dispatch failed.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match &self.outcome {
            DispatchOutcome::Delivered { .. } => None,
            DispatchOutcome::Recovered { kind, .. } => Some(*kind),
        }
    }

    pub fn visited(&self, stage: DispatchStage) -> bool {
        self.stages.contains(&stage)
    }
}

// ---------------------------------------------------------------------------
// Stage trace
// ---------------------------------------------------------------------------

struct StageTrace {
    id: Uuid,
    stages: Vec<DispatchStage>,
}

impl StageTrace {
    fn new(id: Uuid) -> Self {
        Self {
            id,
            stages: vec![DispatchStage::Idle],
        }
    }

    fn enter(&mut self, stage: DispatchStage) {
        debug!(dispatch_id = %self.id, %stage, "dispatch stage");
        self.stages.push(stage);
    }

    fn current(&self) -> DispatchStage {
        self.stages.last().copied().unwrap_or(DispatchStage::Idle)
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Runs the dispatch pipeline over shared, read-only bot state.
///
/// Built by [`crate::BotBuilder`].  Wrap in `Arc` to dispatch from many tasks.
pub struct Dispatcher {
    classifier: Arc<dyn Classifier>,
    envelopes: EnvelopeBuilder,
    registry: SkillRegistry,
    adapters: Arc<AdapterSet>,
    events: EventBus,
    config: DispatchConfig,
    permits: Arc<Semaphore>,
}

impl Dispatcher {
    pub(crate) fn new(
        classifier: Arc<dyn Classifier>,
        envelopes: EnvelopeBuilder,
        registry: SkillRegistry,
        adapters: AdapterSet,
        events: EventBus,
        config: DispatchConfig,
    ) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(config.max_in_flight)),
            classifier,
            envelopes,
            registry,
            adapters: Arc::new(adapters),
            events,
            config,
        }
    }

    /// Run one dispatch to completion.
    ///
    /// Waits for a free slot when `max_in_flight` dispatches are already
    /// running.  Never fails: errors end in recovery and are described by the
    /// returned report.
    pub async fn dispatch(&self, utterance: Utterance) -> DispatchReport {
        // The semaphore is never closed, so acquisition only fails if that
        // changes; dispatching unbounded is preferable to dropping the message.
        let _permit = self.permits.acquire().await.ok();

        let id = Uuid::now_v7();
        let mut trace = StageTrace::new(id);
        debug!(
            dispatch_id = %id,
            adapter = %utterance.adapter,
            channel = %utterance.channel,
            "dispatch started"
        );

        let outcome = match self.run(id, &utterance, &mut trace).await {
            Ok((skill, response)) => DispatchOutcome::Delivered { skill, response },
            Err(error) => self.recover(id, &utterance, &mut trace, error).await,
        };

        trace.enter(DispatchStage::Done);
        DispatchReport {
            id,
            stages: trace.stages,
            outcome,
        }
    }

    /// Dispatch on a new tokio task.
    pub fn spawn(self: &Arc<Self>, utterance: Utterance) -> JoinHandle<DispatchReport> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.dispatch(utterance).await })
    }

    /// Classify `text` without dispatching it.
    pub async fn classify(&self, text: &str) -> Result<ClassifiedIntent> {
        self.classifier.classify(text).await
    }

    /// Render `content` for the named adapter.
    pub fn format(&self, content: &str, adapter: &str) -> Result<RenderedResponse> {
        self.adapters.format(content, adapter)
    }

    /// Resolved configuration of an adapter, or of the default adapter.
    pub fn conf(&self, adapter: Option<&str>) -> Result<&AdapterConf> {
        self.adapters.conf(adapter)
    }

    pub fn registry(&self) -> &SkillRegistry {
        &self.registry
    }

    pub fn adapters(&self) -> &AdapterSet {
        &self.adapters
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Number of dispatches currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.config
            .max_in_flight
            .saturating_sub(self.permits.available_permits())
    }

    // -- Pipeline -----------------------------------------------------------

    async fn run(
        &self,
        id: Uuid,
        utterance: &Utterance,
        trace: &mut StageTrace,
    ) -> Result<(String, RenderedResponse)> {
        trace.enter(DispatchStage::Classifying);
        let classified = self
            .within(DispatchStage::Classifying, async {
                self.classifier
                    .classify(&utterance.text)
                    .await
                    .map_err(classifier_failure)
            })
            .await?;
        let envelope = self.envelopes.build(utterance, classified)?;

        trace.enter(DispatchStage::Matching);
        let intent = envelope.intent();
        if !intent.is_resolved(self.config.min_score) {
            return Err(BotError::UnresolvableIntent {
                intent: intent.intent_name.clone(),
                reason: format!(
                    "score {:.2} is below the minimum {:.2}",
                    intent.score, self.config.min_score
                ),
            });
        }
        let skill = match self.registry.match_envelope(&envelope) {
            MatchOutcome::Matched(skill) => Arc::clone(skill),
            MatchOutcome::Unresolved => {
                return Err(BotError::UnresolvableIntent {
                    intent: intent.intent_name.clone(),
                    reason: "no registered skill can handle it".into(),
                });
            }
        };
        let skill_name = skill.info().name.clone();
        self.events.emit(BotEvent::IntentMatched {
            dispatch_id: id,
            intent: intent.intent_name.clone(),
            score: intent.score,
            skill: skill_name.clone(),
            adapter: utterance.adapter.clone(),
            channel: utterance.channel.clone(),
            timestamp: Utc::now(),
        });

        trace.enter(DispatchStage::Handling);
        let raw = self
            .within(DispatchStage::Handling, async {
                AssertUnwindSafe(skill.handle(&envelope))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|_| {
                        Err(BotError::Internal(format!("skill `{skill_name}` panicked")))
                    })
            })
            .await?;

        trace.enter(DispatchStage::ValidatingOutput);
        let content = validate_output(&skill_name, raw)?;

        trace.enter(DispatchStage::Formatting);
        let response = self.adapters.format(&content, &utterance.adapter)?;

        trace.enter(DispatchStage::Delivering);
        let adapter = self.adapters.get(&utterance.adapter)?;
        self.within(
            DispatchStage::Delivering,
            adapter.client().send(&utterance.channel, &response),
        )
        .await?;

        trace.enter(DispatchStage::Logging);
        self.events.emit(BotEvent::ReplySent {
            dispatch_id: id,
            skill: skill_name.clone(),
            adapter: utterance.adapter.clone(),
            channel: utterance.channel.clone(),
            timestamp: Utc::now(),
        });

        Ok((skill_name, response))
    }

    // -- Recovery -----------------------------------------------------------

    async fn recover(
        &self,
        id: Uuid,
        utterance: &Utterance,
        trace: &mut StageTrace,
        error: BotError,
    ) -> DispatchOutcome {
        let failed_at = trace.current();
        trace.enter(DispatchStage::Recovering);

        let kind = error.kind();
        let reply_delivered = self.deliver_reply(id, utterance, kind).await;

        self.events.emit(BotEvent::Recovered {
            dispatch_id: id,
            kind,
            stage: failed_at.to_string(),
            error: error.to_string(),
            adapter: utterance.adapter.clone(),
            channel: utterance.channel.clone(),
            reply_delivered,
            timestamp: Utc::now(),
        });

        DispatchOutcome::Recovered {
            kind,
            failed_at,
            error: error.to_string(),
            reply_delivered,
        }
    }

    /// Send the reply mapped from `kind` back to the originating channel.
    async fn deliver_reply(&self, id: Uuid, utterance: &Utterance, kind: ErrorKind) -> bool {
        let adapter = match self.adapters.get(&utterance.adapter) {
            Ok(adapter) => adapter,
            Err(e) => {
                warn!(dispatch_id = %id, error = %e, "no adapter to deliver recovery reply");
                return false;
            }
        };

        let response = adapter.formatter().format(kind.reply());
        match self
            .within(
                DispatchStage::Delivering,
                adapter.client().send(&utterance.channel, &response),
            )
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(dispatch_id = %id, error = %e, "failed to deliver recovery reply");
                false
            }
        }
    }

    /// Bound a suspension point by the stage timeout.
    async fn within<T>(
        &self,
        stage: DispatchStage,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.config.stage_timeout(), fut).await {
            Ok(result) => result,
            Err(_) => Err(BotError::StageTimeout {
                stage: stage.to_string(),
                millis: self.config.stage_timeout_ms,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A failing classifier means the scoring backend is down, never that the
/// intent is unresolvable.
fn classifier_failure(e: BotError) -> BotError {
    match e {
        e @ (BotError::ServiceUnavailable { .. } | BotError::StageTimeout { .. }) => e,
        other => BotError::service_unavailable("classifier", other.to_string()),
    }
}

/// Accept only a non-empty JSON string as skill content.
fn validate_output(skill: &str, raw: Value) -> Result<String> {
    match raw {
        Value::String(content) if !content.trim().is_empty() => Ok(content),
        Value::String(_) => Err(BotError::UnprocessableSkillResponse {
            skill: skill.to_string(),
            reason: "content is empty".into(),
        }),
        other => Err(BotError::UnprocessableSkillResponse {
            skill: skill.to_string(),
            reason: format!("expected a string, got {}", json_type(&other)),
        }),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn validate_accepts_strings() {
        assert_eq!(
            validate_output("greeter", json!("Hey there")).unwrap(),
            "Hey there"
        );
    }

    #[test]
    fn validate_rejects_other_shapes() {
        for value in [json!(42), json!(null), json!(["a"]), json!({"text": "hi"}), json!("  ")] {
            let err = validate_output("greeter", value).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::UnprocessableSkillResponse);
        }
    }

    #[test]
    fn classifier_errors_become_service_unavailable() {
        let err = classifier_failure(BotError::Internal("model crashed".into()));
        assert!(matches!(
            err,
            BotError::ServiceUnavailable { ref service, .. } if service == "classifier"
        ));

        let err = classifier_failure(BotError::UnresolvableIntent {
            intent: "x".into(),
            reason: "y".into(),
        });
        assert_eq!(err.kind(), ErrorKind::ServiceUnavailable);
    }

    #[test]
    fn stage_names() {
        assert_eq!(DispatchStage::ValidatingOutput.to_string(), "validating_output");
        assert_eq!(DispatchStage::Done.to_string(), "done");
    }
}
