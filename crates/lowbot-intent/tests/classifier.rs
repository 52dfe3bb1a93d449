//! Keyword classifier driven through the kernel dispatcher.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use lowbot_intent::{IntentSet, KeywordClassifier, NO_INTENT};
use lowbot_kernel::{
    AdapterBinding, AdapterConf, ChatClient, Classifier, ClientFactory, DispatchConfig,
    Dispatcher, ErrorKind, RenderedResponse, RequestEnvelope, Result, Skill, SkillInfo, Utterance,
};

const INTENTS: &str = r#"
[[intents]]
name = "greet"
phrases = ["hello", "hi there"]

[[intents]]
name = "weather"
patterns = ['weather (?:in|for) (?P<city>[A-Za-z]+)']
pattern_score = 0.95
"#;

// ═══════════════════════════════════════════════════════════════════════
//  Test doubles
// ═══════════════════════════════════════════════════════════════════════

struct WeatherSkill {
    info: SkillInfo,
}

#[async_trait]
impl Skill for WeatherSkill {
    fn info(&self) -> &SkillInfo {
        &self.info
    }

    fn can_handle(&self, envelope: &RequestEnvelope) -> Result<bool> {
        Ok(envelope.intent().intent_name == "weather")
    }

    async fn handle(&self, envelope: &RequestEnvelope) -> Result<Value> {
        let city = envelope.slot("city").unwrap_or("nowhere");
        Ok(Value::String(format!("Sunny in {city}")))
    }
}

#[derive(Default)]
struct Outbox {
    sent: Mutex<Vec<String>>,
}

#[async_trait]
impl ChatClient for Outbox {
    async fn send(&self, _channel: &str, response: &RenderedResponse) -> Result<()> {
        self.sent.lock().unwrap().push(response.as_str().to_string());
        Ok(())
    }
}

struct OutboxFactory(Arc<Outbox>);

impl ClientFactory for OutboxFactory {
    fn construct(&self, _credentials: Option<&AdapterConf>) -> Result<Arc<dyn ChatClient>> {
        let client: Arc<dyn ChatClient> = self.0.clone();
        Ok(client)
    }
}

async fn bot(outbox: Arc<Outbox>) -> Dispatcher {
    let classifier = Arc::new(
        KeywordClassifier::new(IntentSet::from_toml_str(INTENTS).unwrap(), 0.75).unwrap(),
    );
    Dispatcher::builder(DispatchConfig::default())
        .classifier(classifier.clone())
        .slot_extractor(classifier)
        .skill(Arc::new(WeatherSkill {
            info: SkillInfo::new("Weather"),
        }))
        .adapter(AdapterBinding::new("terminal", Arc::new(OutboxFactory(outbox))))
        .build(&HashMap::<String, String>::new())
        .await
        .expect("bot should build")
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn classifies_through_the_trait() {
    let classifier: Arc<dyn Classifier> = Arc::new(
        KeywordClassifier::new(IntentSet::from_toml_str(INTENTS).unwrap(), 0.75).unwrap(),
    );

    let intent = classifier.classify("Hi there").await.unwrap();
    assert_eq!(intent.intent_name, "greet");
    assert_eq!(intent.score, 1.0);

    let intent = classifier.classify("what's for dinner").await.unwrap();
    assert_eq!(intent.intent_name, NO_INTENT);
}

#[tokio::test]
async fn captured_slots_reach_the_skill() {
    let outbox = Arc::new(Outbox::default());
    let dispatcher = bot(outbox.clone()).await;

    let report = dispatcher
        .dispatch(Utterance::new(
            "terminal",
            "general",
            "alice",
            "what's the weather in Lisbon?",
        ))
        .await;

    assert!(report.is_delivered());
    assert_eq!(*outbox.sent.lock().unwrap(), vec!["Sunny in Lisbon"]);
}

#[tokio::test]
async fn recognised_intent_without_a_skill_is_unresolvable() {
    let outbox = Arc::new(Outbox::default());
    let dispatcher = bot(outbox.clone()).await;

    let report = dispatcher
        .dispatch(Utterance::new("terminal", "general", "alice", "hello"))
        .await;

    assert_eq!(report.error_kind(), Some(ErrorKind::UnresolvableIntent));
    assert_eq!(
        *outbox.sent.lock().unwrap(),
        vec!["I understand your intent but have no skill for that"]
    );
}
