//! Ordered skill registry.
//!
//! Skills are registered once, in a fixed order, through a
//! [`SkillRegistryBuilder`].  Building freezes the list into a
//! [`SkillRegistry`], which is cheaply cloneable (`Arc`-backed), `Send + Sync`
//! and read-only for the rest of the process lifetime.
//!
//! Matching scans skills in registration order and selects the first whose
//! predicate accepts the envelope.  Duplicate names are allowed; the earlier
//! registration wins.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut builder = SkillRegistry::builder();
//! builder.register(Arc::new(Greeter))?;
//! builder.register(Arc::new(Weather))?;
//! let registry = builder.build();
//!
//! match registry.match_envelope(&envelope) {
//!     MatchOutcome::Matched(skill) => println!("{}", skill.info().name),
//!     MatchOutcome::Unresolved => println!("no skill"),
//! }
//! ```

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use crate::envelope::RequestEnvelope;
use crate::error::{BotError, Result};
use crate::skill::Skill;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// The result of matching an envelope against the registry.
pub enum MatchOutcome<'a> {
    /// The first skill whose predicate accepted the envelope.
    Matched(&'a Arc<dyn Skill>),
    /// No registered skill accepted the envelope.
    Unresolved,
}

impl std::fmt::Debug for MatchOutcome<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Matched(skill) => f
                .debug_tuple("Matched")
                .field(&skill.info().name)
                .finish(),
            Self::Unresolved => f.write_str("Unresolved"),
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Collects skills in registration order.
#[derive(Default)]
pub struct SkillRegistryBuilder {
    skills: Vec<Arc<dyn Skill>>,
}

impl SkillRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a skill.
    ///
    /// Rejects skills whose info has a blank name or a blank locale tag, so a
    /// malformed plugin fails at startup instead of mid-dispatch.
    pub fn register(&mut self, skill: Arc<dyn Skill>) -> Result<()> {
        let info = skill.info();
        if info.name.trim().is_empty() {
            return Err(BotError::InvalidSkill {
                reason: format!("skill #{} has an empty name", self.skills.len()),
            });
        }
        if info.locales.iter().any(|l| l.trim().is_empty()) {
            return Err(BotError::InvalidSkill {
                reason: format!("skill `{}` declares an empty locale", info.name),
            });
        }

        if self.skills.iter().any(|s| s.info().name == info.name) {
            tracing::debug!(
                skill = %info.name,
                "skill name already registered; earlier registration wins on ties"
            );
        }

        tracing::debug!(skill = %info.name, position = self.skills.len(), "skill registered");
        self.skills.push(skill);
        Ok(())
    }

    /// Number of skills registered so far.
    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    /// Freeze the registration order.
    pub fn build(self) -> SkillRegistry {
        SkillRegistry {
            skills: self.skills.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Read-only, ordered skill registry.
#[derive(Clone)]
pub struct SkillRegistry {
    skills: Arc<[Arc<dyn Skill>]>,
}

impl SkillRegistry {
    pub fn builder() -> SkillRegistryBuilder {
        SkillRegistryBuilder::new()
    }

    /// Select the first skill, in registration order, that can handle
    /// `envelope`.
    ///
    /// A predicate that errors or panics counts as "does not handle" and is
    /// logged at warn level.
    pub fn match_envelope(&self, envelope: &RequestEnvelope) -> MatchOutcome<'_> {
        for skill in self.skills.iter() {
            let name = &skill.info().name;
            match catch_unwind(AssertUnwindSafe(|| skill.can_handle(envelope))) {
                Ok(Ok(true)) => {
                    tracing::debug!(skill = %name, intent = %envelope.intent().intent_name, "skill matched");
                    return MatchOutcome::Matched(skill);
                }
                Ok(Ok(false)) => {}
                Ok(Err(e)) => {
                    tracing::warn!(skill = %name, error = %e, "skill predicate failed");
                }
                Err(_) => {
                    tracing::warn!(skill = %name, "skill predicate panicked");
                }
            }
        }
        MatchOutcome::Unresolved
    }

    /// Return the first registered skill with the given name.
    pub fn find(&self, name: &str) -> Option<&Arc<dyn Skill>> {
        self.skills.iter().find(|s| s.info().name == name)
    }

    /// Skill names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.skills.iter().map(|s| s.info().name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}

impl Default for SkillRegistry {
    fn default() -> Self {
        SkillRegistryBuilder::new().build()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::Value;

    use super::*;
    use crate::envelope::{ClassifiedIntent, Utterance, build_envelope};
    use crate::skill::SkillInfo;

    enum Predicate {
        Intent(&'static str),
        Always,
        Fails,
        Panics,
    }

    struct TestSkill {
        info: SkillInfo,
        predicate: Predicate,
        checks: AtomicUsize,
    }

    impl TestSkill {
        fn new(name: &str, predicate: Predicate) -> Arc<Self> {
            Arc::new(Self {
                info: SkillInfo::new(name),
                predicate,
                checks: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Skill for TestSkill {
        fn info(&self) -> &SkillInfo {
            &self.info
        }

        fn can_handle(&self, envelope: &RequestEnvelope) -> Result<bool> {
            self.checks.fetch_add(1, Ordering::SeqCst);
            match self.predicate {
                Predicate::Intent(name) => Ok(envelope.intent().intent_name == name),
                Predicate::Always => Ok(true),
                Predicate::Fails => Err(BotError::Internal("predicate exploded".into())),
                Predicate::Panics => panic!("predicate panicked"),
            }
        }

        async fn handle(&self, _envelope: &RequestEnvelope) -> Result<Value> {
            Ok(Value::String(self.info.name.clone()))
        }
    }

    fn envelope(intent: &str) -> RequestEnvelope {
        let utterance = Utterance::new("terminal", "general", "alice", "hi");
        build_envelope(&utterance, ClassifiedIntent::new(intent, 0.9)).expect("envelope")
    }

    fn matched_name(outcome: MatchOutcome<'_>) -> Option<String> {
        match outcome {
            MatchOutcome::Matched(skill) => Some(skill.info().name.clone()),
            MatchOutcome::Unresolved => None,
        }
    }

    #[test]
    fn selects_the_only_matching_skill() {
        let mut builder = SkillRegistry::builder();
        builder.register(TestSkill::new("a", Predicate::Intent("weather"))).unwrap();
        builder.register(TestSkill::new("b", Predicate::Intent("greet"))).unwrap();
        builder.register(TestSkill::new("c", Predicate::Intent("joke"))).unwrap();
        let registry = builder.build();

        assert_eq!(
            matched_name(registry.match_envelope(&envelope("greet"))).as_deref(),
            Some("b")
        );
    }

    #[test]
    fn earlier_registration_wins() {
        let first = TestSkill::new("first", Predicate::Always);
        let second = TestSkill::new("second", Predicate::Always);

        let mut builder = SkillRegistry::builder();
        builder.register(first.clone()).unwrap();
        builder.register(second.clone()).unwrap();
        let registry = builder.build();

        for _ in 0..3 {
            assert_eq!(
                matched_name(registry.match_envelope(&envelope("anything"))).as_deref(),
                Some("first")
            );
        }
        // The scan stops at the first match.
        assert_eq!(second.checks.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn duplicate_names_are_allowed() {
        let mut builder = SkillRegistry::builder();
        builder.register(TestSkill::new("dup", Predicate::Intent("x"))).unwrap();
        builder.register(TestSkill::new("dup", Predicate::Intent("y"))).unwrap();
        let registry = builder.build();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["dup", "dup"]);
        assert!(matches!(
            registry.match_envelope(&envelope("y")),
            MatchOutcome::Matched(_)
        ));
    }

    #[test]
    fn no_match_is_unresolved() {
        let mut builder = SkillRegistry::builder();
        builder.register(TestSkill::new("a", Predicate::Intent("weather"))).unwrap();
        let registry = builder.build();

        assert!(matches!(
            registry.match_envelope(&envelope("greet")),
            MatchOutcome::Unresolved
        ));
        assert!(matches!(
            SkillRegistry::default().match_envelope(&envelope("greet")),
            MatchOutcome::Unresolved
        ));
    }

    #[test]
    fn failing_predicate_counts_as_no_match() {
        let mut builder = SkillRegistry::builder();
        builder.register(TestSkill::new("broken", Predicate::Fails)).unwrap();
        builder.register(TestSkill::new("panicky", Predicate::Panics)).unwrap();
        builder.register(TestSkill::new("fallback", Predicate::Always)).unwrap();
        let registry = builder.build();

        assert_eq!(
            matched_name(registry.match_envelope(&envelope("greet"))).as_deref(),
            Some("fallback")
        );
    }

    #[test]
    fn rejects_blank_name() {
        let mut builder = SkillRegistry::builder();
        let result = builder.register(TestSkill::new("  ", Predicate::Always));
        assert!(matches!(result, Err(BotError::InvalidSkill { .. })));
        assert!(builder.is_empty());
    }

    #[test]
    fn find_returns_first_by_name() {
        let mut builder = SkillRegistry::builder();
        builder.register(TestSkill::new("greeter", Predicate::Always)).unwrap();
        let registry = builder.build();

        assert!(registry.find("greeter").is_some());
        assert!(registry.find("missing").is_none());
    }
}
