//! Configuration file loading.
//!
//! Reads `config/lowbot.toml` (or the `--config` path):
//!
//! ```toml
//! [bot]
//! min_score = 0.75
//! default_adapter = "terminal"
//!
//! [[intents]]
//! name = "greet"
//! phrases = ["hello", "hi"]
//!
//! [[skills]]
//! name = "Greeter"
//! intent = "greet"
//! replies = { en = "Hey there!" }
//!
//! [adapters.terminal]
//! kind = "terminal"
//! ```
//!
//! A missing file at the default location yields defaults with a terminal
//! adapter; a missing file given explicitly is an error.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use lowbot_adapters::{AdapterSettings, TERMINAL_ADAPTER};
use lowbot_intent::{IntentDefinition, IntentSet};
use lowbot_kernel::DispatchConfig;
use lowbot_skills::{SkillManifest, SkillManifests};

/// Everything in a LowBot configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LowbotConfig {
    #[serde(default)]
    pub bot: DispatchConfig,

    /// Intent to answer with the list of loaded skills, if any.
    #[serde(default)]
    pub help_intent: Option<String>,

    /// Extra directory of skill manifest files, loaded after `skills`.
    #[serde(default)]
    pub skills_dir: Option<PathBuf>,

    #[serde(default)]
    pub intents: Vec<IntentDefinition>,

    #[serde(default)]
    pub skills: Vec<SkillManifest>,

    #[serde(default)]
    pub adapters: BTreeMap<String, AdapterSettings>,
}

impl LowbotConfig {
    /// Load and validate the configuration at `path`.
    ///
    /// `explicit` is whether the user named the path; only then is a missing
    /// file an error.
    pub fn load(path: &Path, explicit: bool) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str::<Self>(&content)
                .with_context(|| format!("failed to parse {}", path.display()))?
        } else if explicit {
            bail!("configuration file {} does not exist", path.display());
        } else {
            tracing::warn!(path = %path.display(), "configuration file not found, using defaults");
            Self::default()
        };

        if config.adapters.is_empty() {
            config
                .adapters
                .insert(TERMINAL_ADAPTER.to_string(), AdapterSettings::terminal());
        }

        config.validate()?;
        tracing::debug!(
            path = %path.display(),
            intents = config.intents.len(),
            skills = config.skills.len(),
            adapters = config.adapters.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Check every section without connecting anything.
    pub fn validate(&self) -> Result<()> {
        self.bot
            .validate()
            .map_err(anyhow::Error::msg)
            .context("invalid [bot] section")?;
        self.intent_set()
            .validate()
            .context("invalid [[intents]]")?;
        SkillManifests {
            skills: self.skills.clone(),
        }
        .validate()
        .context("invalid [[skills]]")?;
        for (name, settings) in &self.adapters {
            settings
                .output
                .validate()
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("invalid [adapters.{name}] section"))?;
        }
        Ok(())
    }

    pub fn intent_set(&self) -> IntentSet {
        IntentSet::new(self.intents.clone())
    }

    /// Inline skills followed by those in `skills_dir`.
    ///
    /// A relative `skills_dir` is resolved against `base`.
    pub fn skill_manifests(&self, base: &Path) -> Result<SkillManifests> {
        let mut manifests = SkillManifests {
            skills: self.skills.clone(),
        };
        if let Some(dir) = &self.skills_dir {
            let dir = if dir.is_relative() {
                base.join(dir)
            } else {
                dir.clone()
            };
            let loaded = SkillManifests::load_dir(&dir)
                .with_context(|| format!("failed to load skills from {}", dir.display()))?;
            manifests.skills.extend(loaded.skills);
        }
        Ok(manifests)
    }
}

#[cfg(test)]
mod tests {
    use lowbot_adapters::AdapterKind;
    use lowbot_kernel::{LoginMethod, Markup};

    use super::*;

    const SAMPLE: &str = r#"
        help_intent = "help"

        [bot]
        min_score = 0.6
        max_in_flight = 8

        [[intents]]
        name = "greet"
        phrases = ["hello"]

        [[skills]]
        name = "Greeter"
        intent = "greet"
        replies = { en = "Hey there!" }

        [adapters.terminal]
        kind = "terminal"
        prefix = "bot> "

        [adapters.support]
        kind = "webhook"
        url = "http://127.0.0.1:8080/hook"
        login = "bearer"
        output = { markup = "markdown" }
        vars = { token = "SUPPORT_TOKEN" }
    "#;

    fn write(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("lowbot.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn loads_every_section() {
        let dir = tempfile::tempdir().unwrap();
        let config = LowbotConfig::load(&write(dir.path(), SAMPLE), true).unwrap();

        assert_eq!(config.bot.min_score, 0.6);
        assert_eq!(config.bot.max_in_flight, 8);
        assert_eq!(config.bot.stage_timeout_ms, 30_000);
        assert_eq!(config.help_intent.as_deref(), Some("help"));
        assert_eq!(config.intents[0].name, "greet");
        assert_eq!(config.skills[0].name, "Greeter");

        let support = &config.adapters["support"];
        assert!(matches!(support.kind, AdapterKind::Webhook { .. }));
        assert_eq!(support.login, LoginMethod::Method("bearer".into()));
        assert_eq!(support.output.markup, Markup::Markdown);
        assert_eq!(
            config.adapters["terminal"].kind,
            AdapterKind::Terminal {
                prefix: "bot> ".into()
            }
        );
    }

    #[test]
    fn missing_default_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = LowbotConfig::load(&dir.path().join("lowbot.toml"), false).unwrap();
        assert_eq!(config.bot, DispatchConfig::default());
        assert!(config.adapters.contains_key(TERMINAL_ADAPTER));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(LowbotConfig::load(&dir.path().join("nope.toml"), true).is_err());
    }

    #[test]
    fn invalid_sections_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "[bot]\nmin_score = 3.0\n");
        let err = LowbotConfig::load(&path, true).unwrap_err();
        assert!(format!("{err:#}").contains("[bot]"));

        let path = write(dir.path(), "[[intents]]\nname = \"empty\"\n");
        assert!(LowbotConfig::load(&path, true).is_err());

        let path = write(
            dir.path(),
            "[adapters.terminal]\nkind = \"terminal\"\noutput = { max_chars = 0 }\n",
        );
        let err = LowbotConfig::load(&path, true).unwrap_err();
        assert!(format!("{err:#}").contains("[adapters.terminal]"));
    }

    #[test]
    fn skills_dir_is_appended() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("skills")).unwrap();
        std::fs::write(
            dir.path().join("skills/weather.toml"),
            "[[skills]]\nname = \"Weather\"\nintent = \"weather\"\nreplies = { en = \"Sunny\" }\n",
        )
        .unwrap();
        let path = write(
            dir.path(),
            &format!("skills_dir = \"skills\"\n{SAMPLE}"),
        );

        let config = LowbotConfig::load(&path, true).unwrap();
        let manifests = config.skill_manifests(dir.path()).unwrap();
        let names: Vec<_> = manifests.skills.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Greeter", "Weather"]);
    }
}
