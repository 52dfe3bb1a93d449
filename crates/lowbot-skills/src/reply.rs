//! Static reply skills.

use async_trait::async_trait;
use serde_json::Value;

use lowbot_kernel::{RequestEnvelope, Result, Skill, SkillInfo};

use crate::manifest::SkillManifest;

/// Answers one intent with a fixed, per-locale reply.
///
/// The reply for the message's locale is used when there is one; otherwise
/// the default locale's.  A locale such as `fr-CA` falls back to `fr` before
/// the default.
#[derive(Debug, Clone)]
pub struct StaticSkill {
    info: SkillInfo,
    manifest: SkillManifest,
}

impl StaticSkill {
    /// Build from a manifest, validating it first.
    pub fn from_manifest(manifest: SkillManifest) -> crate::Result<Self> {
        manifest.validate()?;
        let info = SkillInfo::new(manifest.name.clone())
            .with_locales(manifest.replies.keys().cloned());
        Ok(Self { info, manifest })
    }

    pub fn intent(&self) -> &str {
        &self.manifest.intent
    }

    /// The reply for `locale`.
    pub fn reply_for(&self, locale: Option<&str>) -> &str {
        let replies = &self.manifest.replies;
        locale
            .and_then(|tag| {
                replies.get(tag).or_else(|| {
                    let language = tag.split(['-', '_']).next()?;
                    replies.get(language)
                })
            })
            .or_else(|| replies.get(&self.manifest.default_locale))
            .map(String::as_str)
            .unwrap_or_default()
    }
}

#[async_trait]
impl Skill for StaticSkill {
    fn info(&self) -> &SkillInfo {
        &self.info
    }

    fn can_handle(&self, envelope: &RequestEnvelope) -> Result<bool> {
        Ok(envelope.intent().intent_name == self.manifest.intent)
    }

    async fn handle(&self, envelope: &RequestEnvelope) -> Result<Value> {
        let locale = envelope.session().locale.as_deref();
        Ok(Value::String(self.reply_for(locale).to_string()))
    }
}

#[cfg(test)]
mod tests {
    use lowbot_kernel::{ClassifiedIntent, Utterance, build_envelope};

    use super::*;

    fn greeter() -> StaticSkill {
        StaticSkill::from_manifest(
            SkillManifest::new("Greeter", "greet")
                .with_reply("en", "Hey there!")
                .with_reply("fr", "Salut !"),
        )
        .unwrap()
    }

    fn envelope(intent: &str, locale: Option<&str>) -> RequestEnvelope {
        let mut utterance = Utterance::new("terminal", "general", "alice", "hello");
        if let Some(locale) = locale {
            utterance = utterance.with_locale(locale);
        }
        build_envelope(&utterance, ClassifiedIntent::new(intent, 1.0)).unwrap()
    }

    #[test]
    fn info_lists_locales() {
        let skill = greeter();
        assert_eq!(skill.info().name, "Greeter");
        assert_eq!(skill.info().locales, vec!["en", "fr"]);
    }

    #[test]
    fn handles_only_its_intent() {
        let skill = greeter();
        assert!(skill.can_handle(&envelope("greet", None)).unwrap());
        assert!(!skill.can_handle(&envelope("weather", None)).unwrap());
    }

    #[tokio::test]
    async fn replies_in_the_message_locale() {
        let skill = greeter();
        assert_eq!(
            skill.handle(&envelope("greet", Some("fr"))).await.unwrap(),
            Value::String("Salut !".into())
        );
        assert_eq!(
            skill.handle(&envelope("greet", None)).await.unwrap(),
            Value::String("Hey there!".into())
        );
    }

    #[test]
    fn locale_fallbacks() {
        let skill = greeter();
        assert_eq!(skill.reply_for(Some("fr-CA")), "Salut !");
        assert_eq!(skill.reply_for(Some("de")), "Hey there!");
    }

    #[test]
    fn invalid_manifest_is_rejected() {
        assert!(StaticSkill::from_manifest(SkillManifest::new("Greeter", "greet")).is_err());
    }
}
