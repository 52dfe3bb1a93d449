//! Adapter bindings and the connected adapter set.
//!
//! An [`AdapterBinding`] describes one chat platform: its name, which
//! environment variables hold its credentials, how its output is formatted,
//! and how its client is constructed and logged in.  Connecting a binding
//! resolves its configuration, builds the client according to its
//! [`LoginMethod`], and yields a [`ConnectedAdapter`].
//!
//! All connected adapters live in an [`AdapterSet`], which is assembled once
//! at startup and only read afterwards.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{BotError, Result};
use crate::format::{OutputConfig, OutputFormatter, RenderedResponse};

/// Configuration key holding the login token.
pub const TOKEN_KEY: &str = "token";

// ---------------------------------------------------------------------------
// Login convention
// ---------------------------------------------------------------------------

/// How an adapter's client authenticates.
///
/// Serialized as `"constructor"`, a method name, or `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum LoginMethod {
    /// Credentials are passed when the client is constructed.
    Constructor,
    /// The named method is invoked after construction with the resolved token.
    Method(String),
    /// No explicit login.
    #[default]
    None,
}

impl From<Option<String>> for LoginMethod {
    fn from(value: Option<String>) -> Self {
        match value.as_deref() {
            None => Self::None,
            Some("constructor") => Self::Constructor,
            Some(method) => Self::Method(method.to_string()),
        }
    }
}

impl From<LoginMethod> for Option<String> {
    fn from(value: LoginMethod) -> Self {
        match value {
            LoginMethod::Constructor => Some("constructor".to_string()),
            LoginMethod::Method(method) => Some(method),
            LoginMethod::None => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration resolution
// ---------------------------------------------------------------------------

/// A source of environment variables.
pub trait EnvSource: Send + Sync {
    fn var(&self, name: &str) -> Option<String>;
}

/// Reads from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// An adapter's configuration, resolved from its `confKey -> envVar` mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdapterConf {
    adapter: String,
    values: BTreeMap<String, String>,
    /// `(confKey, envVar)` pairs whose variable was not set.
    missing: Vec<(String, String)>,
}

impl AdapterConf {
    /// Resolve every mapping in `vars` against `env`.
    pub fn resolve(
        adapter: impl Into<String>,
        vars: &BTreeMap<String, String>,
        env: &dyn EnvSource,
    ) -> Self {
        let mut values = BTreeMap::new();
        let mut missing = Vec::new();
        for (key, env_var) in vars {
            match env.var(env_var) {
                Some(value) => {
                    values.insert(key.clone(), value);
                }
                None => missing.push((key.clone(), env_var.clone())),
            }
        }
        Self {
            adapter: adapter.into(),
            values,
            missing,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Like [`AdapterConf::get`], but a missing value is a
    /// [`BotError::MissingCredential`].
    pub fn require(&self, key: &str) -> Result<&str> {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }
        let env_var = self
            .missing
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .unwrap_or_default();
        Err(BotError::MissingCredential {
            adapter: self.adapter.clone(),
            key: key.to_string(),
            env_var,
        })
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    pub fn missing(&self) -> &[(String, String)] {
        &self.missing
    }
}

// ---------------------------------------------------------------------------
// Client contracts
// ---------------------------------------------------------------------------

/// A constructed platform client.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Invoke the named login method with the resolved token.
    async fn login(&self, method: &str, _token: &str) -> Result<()> {
        Err(BotError::Config(format!(
            "login method `{method}` is not supported by this client"
        )))
    }

    /// Deliver a rendered reply to `channel`.
    async fn send(&self, channel: &str, response: &RenderedResponse) -> Result<()>;
}

/// Constructs platform clients.
pub trait ClientFactory: Send + Sync {
    /// Build a client.  `credentials` is `Some` only for
    /// [`LoginMethod::Constructor`].
    fn construct(&self, credentials: Option<&AdapterConf>) -> Result<Arc<dyn ChatClient>>;
}

// ---------------------------------------------------------------------------
// Binding
// ---------------------------------------------------------------------------

/// Description of one chat platform, before it is connected.
#[derive(Clone)]
pub struct AdapterBinding {
    pub name: String,
    /// `confKey -> envVar`.
    pub vars: BTreeMap<String, String>,
    pub output: OutputConfig,
    pub login: LoginMethod,
    factory: Arc<dyn ClientFactory>,
}

impl AdapterBinding {
    pub fn new(name: impl Into<String>, factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            name: name.into(),
            vars: BTreeMap::new(),
            output: OutputConfig::default(),
            login: LoginMethod::None,
            factory,
        }
    }

    pub fn with_var(mut self, key: impl Into<String>, env_var: impl Into<String>) -> Self {
        self.vars.insert(key.into(), env_var.into());
        self
    }

    pub fn with_vars(mut self, vars: BTreeMap<String, String>) -> Self {
        self.vars.extend(vars);
        self
    }

    pub fn with_output(mut self, output: OutputConfig) -> Self {
        self.output = output;
        self
    }

    pub fn with_login(mut self, login: LoginMethod) -> Self {
        self.login = login;
        self
    }

    /// Resolve configuration, construct the client and log in.
    pub async fn connect(self, env: &dyn EnvSource) -> Result<ConnectedAdapter> {
        self.output
            .validate()
            .map_err(|reason| BotError::Config(format!("adapter `{}`: {reason}", self.name)))?;

        let conf = AdapterConf::resolve(&self.name, &self.vars, env);
        let startup = |e: BotError| match e {
            e @ BotError::MissingCredential { .. } => e,
            other => BotError::AdapterStartup {
                adapter: self.name.clone(),
                reason: other.to_string(),
            },
        };

        let client = match &self.login {
            LoginMethod::Constructor => {
                conf.require(TOKEN_KEY)?;
                self.factory.construct(Some(&conf)).map_err(startup)?
            }
            LoginMethod::Method(method) => {
                let token = conf.require(TOKEN_KEY)?;
                let client = self.factory.construct(None).map_err(startup)?;
                client.login(method, token).await.map_err(startup)?;
                client
            }
            LoginMethod::None => self.factory.construct(None).map_err(startup)?,
        };

        tracing::debug!(adapter = %self.name, login = ?self.login, "adapter client constructed");

        Ok(ConnectedAdapter {
            formatter: OutputFormatter::new(self.output),
            name: self.name,
            client,
            conf,
        })
    }
}

impl std::fmt::Debug for AdapterBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterBinding")
            .field("name", &self.name)
            .field("vars", &self.vars)
            .field("output", &self.output)
            .field("login", &self.login)
            .finish()
    }
}

/// A binding whose client is constructed and logged in.
pub struct ConnectedAdapter {
    name: String,
    formatter: OutputFormatter,
    client: Arc<dyn ChatClient>,
    conf: AdapterConf,
}

impl ConnectedAdapter {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn formatter(&self) -> &OutputFormatter {
        &self.formatter
    }

    pub fn client(&self) -> &Arc<dyn ChatClient> {
        &self.client
    }

    pub fn conf(&self) -> &AdapterConf {
        &self.conf
    }
}

// ---------------------------------------------------------------------------
// Adapter set
// ---------------------------------------------------------------------------

/// Every connected adapter, keyed by name.
pub struct AdapterSet {
    adapters: HashMap<String, ConnectedAdapter>,
    default_adapter: String,
}

impl AdapterSet {
    pub fn new(default_adapter: impl Into<String>) -> Self {
        Self {
            adapters: HashMap::new(),
            default_adapter: default_adapter.into(),
        }
    }

    /// Add a connected adapter.  An adapter whose name is already present is
    /// ignored; the first one stays.
    pub fn insert(&mut self, adapter: ConnectedAdapter) -> bool {
        if self.adapters.contains_key(adapter.name()) {
            tracing::warn!(adapter = %adapter.name(), "adapter already loaded; keeping the first");
            return false;
        }
        self.adapters.insert(adapter.name.clone(), adapter);
        true
    }

    /// Look up a connected adapter.
    pub fn get(&self, name: &str) -> Result<&ConnectedAdapter> {
        self.adapters
            .get(name)
            .ok_or_else(|| BotError::UnknownAdapter {
                adapter: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.adapters.contains_key(name)
    }

    /// Render `content` with the named adapter's output configuration.
    pub fn format(&self, content: &str, adapter: &str) -> Result<RenderedResponse> {
        Ok(self.get(adapter)?.formatter.format(content))
    }

    /// Resolved configuration for `adapter`, or for the default adapter.
    pub fn conf(&self, adapter: Option<&str>) -> Result<&AdapterConf> {
        Ok(&self.get(adapter.unwrap_or(&self.default_adapter))?.conf)
    }

    pub fn default_adapter(&self) -> &str {
        &self.default_adapter
    }

    /// Adapter names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.adapters.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::format::Markup;

    #[derive(Default)]
    struct NullClient {
        logins: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl ChatClient for NullClient {
        async fn login(&self, method: &str, token: &str) -> Result<()> {
            self.logins
                .lock()
                .unwrap()
                .push((method.to_string(), token.to_string()));
            Ok(())
        }

        async fn send(&self, _channel: &str, _response: &RenderedResponse) -> Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingFactory {
        credentials: Mutex<Vec<Option<AdapterConf>>>,
        client: Arc<NullClient>,
    }

    impl ClientFactory for RecordingFactory {
        fn construct(&self, credentials: Option<&AdapterConf>) -> Result<Arc<dyn ChatClient>> {
            self.credentials.lock().unwrap().push(credentials.cloned());
            let client: Arc<dyn ChatClient> = self.client.clone();
            Ok(client)
        }
    }

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn login_method_serde_convention() {
        let m: LoginMethod = serde_json::from_str(r#""constructor""#).unwrap();
        assert_eq!(m, LoginMethod::Constructor);
        let m: LoginMethod = serde_json::from_str(r#""login""#).unwrap();
        assert_eq!(m, LoginMethod::Method("login".into()));
        let m: LoginMethod = serde_json::from_str("null").unwrap();
        assert_eq!(m, LoginMethod::None);
        assert_eq!(
            serde_json::to_string(&LoginMethod::Constructor).unwrap(),
            r#""constructor""#
        );
    }

    #[test]
    fn conf_resolution_tracks_missing_vars() {
        let vars = BTreeMap::from([
            ("token".to_string(), "BOT_TOKEN".to_string()),
            ("guild".to_string(), "BOT_GUILD".to_string()),
        ]);
        let conf = AdapterConf::resolve("discord", &vars, &env(&[("BOT_TOKEN", "abc")]));

        assert_eq!(conf.get("token"), Some("abc"));
        assert_eq!(conf.get("guild"), None);
        assert_eq!(conf.missing(), &[("guild".to_string(), "BOT_GUILD".to_string())]);

        match conf.require("guild") {
            Err(BotError::MissingCredential { env_var, .. }) => assert_eq!(env_var, "BOT_GUILD"),
            other => panic!("expected MissingCredential, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn constructor_login_passes_credentials() {
        let factory = Arc::new(RecordingFactory::default());
        let binding = AdapterBinding::new("discord", factory.clone())
            .with_var("token", "BOT_TOKEN")
            .with_login(LoginMethod::Constructor);

        let connected = binding
            .connect(&env(&[("BOT_TOKEN", "abc")]))
            .await
            .expect("connect");
        assert_eq!(connected.name(), "discord");

        let credentials = factory.credentials.lock().unwrap();
        assert_eq!(credentials.len(), 1);
        assert_eq!(
            credentials[0].as_ref().and_then(|c| c.get("token")),
            Some("abc")
        );
        assert!(factory.client.logins.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn method_login_is_invoked_after_construction() {
        let factory = Arc::new(RecordingFactory::default());
        let binding = AdapterBinding::new("slack", factory.clone())
            .with_var("token", "SLACK_TOKEN")
            .with_login(LoginMethod::Method("auth".into()));

        binding
            .connect(&env(&[("SLACK_TOKEN", "xoxb")]))
            .await
            .expect("connect");

        assert!(factory.credentials.lock().unwrap()[0].is_none());
        assert_eq!(
            *factory.client.logins.lock().unwrap(),
            vec![("auth".to_string(), "xoxb".to_string())]
        );
    }

    #[tokio::test]
    async fn missing_token_fails_startup() {
        let factory = Arc::new(RecordingFactory::default());
        let binding = AdapterBinding::new("discord", factory.clone())
            .with_var("token", "BOT_TOKEN")
            .with_login(LoginMethod::Constructor);

        let err = binding.connect(&env(&[])).await.err().expect("should fail");
        assert!(matches!(err, BotError::MissingCredential { .. }));
        assert!(factory.credentials.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn zero_max_chars_fails_startup() {
        let factory = Arc::new(RecordingFactory::default());
        let binding = AdapterBinding::new("terminal", factory.clone())
            .with_output(OutputConfig::new(Markup::Plain).with_max_chars(0));

        let err = binding.connect(&env(&[])).await.err().expect("should fail");
        assert!(matches!(err, BotError::Config(ref reason) if reason.contains("max_chars")));
        assert!(factory.credentials.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn adapter_set_lookups() {
        let factory = Arc::new(RecordingFactory::default());
        let mut set = AdapterSet::new("terminal");
        let terminal = AdapterBinding::new("terminal", factory.clone())
            .with_var("prompt", "PROMPT")
            .with_output(OutputConfig::new(Markup::Ssml))
            .connect(&env(&[("PROMPT", "> ")]))
            .await
            .expect("connect");
        assert!(set.insert(terminal));

        let duplicate = AdapterBinding::new("terminal", factory)
            .connect(&env(&[]))
            .await
            .expect("connect");
        assert!(!set.insert(duplicate));
        assert_eq!(set.len(), 1);

        assert_eq!(
            set.format("hi", "terminal").unwrap().as_str(),
            "<speak><s>hi</s></speak>"
        );
        assert_eq!(set.conf(None).unwrap().get("prompt"), Some("> "));
        assert!(matches!(
            set.format("hi", "irc"),
            Err(BotError::UnknownAdapter { .. })
        ));
        assert!(matches!(
            set.conf(Some("irc")),
            Err(BotError::UnknownAdapter { .. })
        ));
    }
}
