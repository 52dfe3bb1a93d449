//! Closure-backed skills.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use lowbot_kernel::{RequestEnvelope, Result, Skill, SkillInfo};

type Predicate = Arc<dyn Fn(&RequestEnvelope) -> Result<bool> + Send + Sync>;
type Handler = Arc<dyn Fn(&RequestEnvelope) -> Result<Value> + Send + Sync>;

/// A skill whose predicate and handler are plain closures.
///
/// ```rust
/// # use lowbot_skills::FnSkill;
/// let echo = FnSkill::for_intent("Echo", "echo", |envelope| {
///     Ok(serde_json::Value::String(envelope.text().to_string()))
/// });
/// ```
#[derive(Clone)]
pub struct FnSkill {
    info: SkillInfo,
    predicate: Predicate,
    handler: Handler,
}

impl FnSkill {
    pub fn new<P, H>(info: SkillInfo, predicate: P, handler: H) -> Self
    where
        P: Fn(&RequestEnvelope) -> Result<bool> + Send + Sync + 'static,
        H: Fn(&RequestEnvelope) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            info,
            predicate: Arc::new(predicate),
            handler: Arc::new(handler),
        }
    }

    /// A skill that handles exactly the intent named `intent`.
    pub fn for_intent<H>(name: impl Into<String>, intent: impl Into<String>, handler: H) -> Self
    where
        H: Fn(&RequestEnvelope) -> Result<Value> + Send + Sync + 'static,
    {
        let intent = intent.into();
        Self::new(
            SkillInfo::new(name),
            move |envelope| Ok(envelope.intent().intent_name == intent),
            handler,
        )
    }
}

/// A skill that answers `intent` by listing `skill_names`.
pub fn help_skill(intent: impl Into<String>, skill_names: Vec<String>) -> FnSkill {
    let reply = if skill_names.is_empty() {
        "I can't do anything yet.".to_string()
    } else {
        format!("I can help with: {}", skill_names.join(", "))
    };
    FnSkill::for_intent("Help", intent, move |_| Ok(Value::String(reply.clone())))
}

impl std::fmt::Debug for FnSkill {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnSkill").field("info", &self.info).finish()
    }
}

#[async_trait]
impl Skill for FnSkill {
    fn info(&self) -> &SkillInfo {
        &self.info
    }

    fn can_handle(&self, envelope: &RequestEnvelope) -> Result<bool> {
        (self.predicate)(envelope)
    }

    async fn handle(&self, envelope: &RequestEnvelope) -> Result<Value> {
        (self.handler)(envelope)
    }
}
