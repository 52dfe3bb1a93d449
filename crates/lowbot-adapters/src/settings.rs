//! Declarative adapter settings.
//!
//! Turns a configuration entry such as
//!
//! ```toml
//! [adapters.support]
//! kind = "webhook"
//! url = "https://chat.example.com/hooks/lowbot"
//! login = "constructor"
//! output = { markup = "markdown", max_chars = 2000 }
//! vars = { token = "SUPPORT_HOOK_TOKEN" }
//! ```
//!
//! into a kernel [`AdapterBinding`] with the matching client factory.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use lowbot_kernel::{AdapterBinding, ClientFactory, LoginMethod, OutputConfig};

use crate::terminal::{DEFAULT_PREFIX, TerminalFactory};
use crate::webhook::{DEFAULT_TIMEOUT_SECS, WebhookFactory};

/// Which client an adapter uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdapterKind {
    Terminal {
        #[serde(default = "default_prefix")]
        prefix: String,
    },
    Webhook {
        url: String,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl AdapterKind {
    /// The client factory for an adapter registered as `name`.
    pub fn factory(&self, name: &str) -> Arc<dyn ClientFactory> {
        match self {
            Self::Terminal { prefix } => Arc::new(TerminalFactory::new(prefix.clone())),
            Self::Webhook { url, timeout_secs } => Arc::new(
                WebhookFactory::new(name, url.clone())
                    .with_timeout(Duration::from_secs(*timeout_secs)),
            ),
        }
    }
}

/// Everything needed to bind one adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterSettings {
    #[serde(flatten)]
    pub kind: AdapterKind,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub login: LoginMethod,
    /// `confKey -> envVar`.
    #[serde(default)]
    pub vars: BTreeMap<String, String>,
}

impl AdapterSettings {
    pub fn terminal() -> Self {
        Self {
            kind: AdapterKind::Terminal {
                prefix: default_prefix(),
            },
            output: OutputConfig::default(),
            login: LoginMethod::None,
            vars: BTreeMap::new(),
        }
    }

    /// Bind these settings under `name`.
    pub fn binding(&self, name: &str) -> AdapterBinding {
        AdapterBinding::new(name, self.kind.factory(name))
            .with_output(self.output.clone())
            .with_login(self.login.clone())
            .with_vars(self.vars.clone())
    }
}

#[cfg(test)]
mod tests {
    use lowbot_kernel::Markup;
    use serde_json::json;

    use super::*;

    #[test]
    fn webhook_settings_deserialize() {
        let settings: AdapterSettings = serde_json::from_value(json!({
            "kind": "webhook",
            "url": "http://127.0.0.1:8080/hook",
            "login": "constructor",
            "output": { "markup": "markdown", "max_chars": 200 },
            "vars": { "token": "HOOK_TOKEN" }
        }))
        .unwrap();

        assert_eq!(
            settings.kind,
            AdapterKind::Webhook {
                url: "http://127.0.0.1:8080/hook".into(),
                timeout_secs: DEFAULT_TIMEOUT_SECS,
            }
        );
        assert_eq!(settings.login, LoginMethod::Constructor);
        assert_eq!(settings.output.markup, Markup::Markdown);
        assert_eq!(settings.output.max_chars, Some(200));

        let binding = settings.binding("support");
        assert_eq!(binding.name, "support");
        assert_eq!(
            binding.vars.get("token").map(String::as_str),
            Some("HOOK_TOKEN")
        );
    }

    #[test]
    fn terminal_settings_default_everything() {
        let settings: AdapterSettings =
            serde_json::from_value(json!({ "kind": "terminal" })).unwrap();
        assert_eq!(settings, AdapterSettings::terminal());
        assert_eq!(settings.login, LoginMethod::None);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let result: Result<AdapterSettings, _> =
            serde_json::from_value(json!({ "kind": "carrier_pigeon" }));
        assert!(result.is_err());
    }
}
