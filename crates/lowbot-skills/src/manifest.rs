//! Skill manifests.
//!
//! A manifest declares a static reply skill: which intent it answers and what
//! it says in each locale.
//!
//! ```toml
//! [[skills]]
//! name = "Greeter"
//! intent = "greet"
//! default_locale = "en"
//!
//! [skills.replies]
//! en = "Hey there!"
//! fr = "Salut !"
//! ```
//!
//! Manifests are read from a single TOML document or from every `*.toml`
//! file in a directory, in file-name order.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SkillError};

fn default_locale() -> String {
    "en".to_string()
}

/// One static reply skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillManifest {
    pub name: String,
    /// The intent this skill answers.
    pub intent: String,
    /// Locale used when the message's locale has no reply.
    #[serde(default = "default_locale")]
    pub default_locale: String,
    /// `locale -> reply`.
    pub replies: BTreeMap<String, String>,
}

impl SkillManifest {
    pub fn new(name: impl Into<String>, intent: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            intent: intent.into(),
            default_locale: default_locale(),
            replies: BTreeMap::new(),
        }
    }

    pub fn with_reply(mut self, locale: impl Into<String>, reply: impl Into<String>) -> Self {
        self.replies.insert(locale.into(), reply.into());
        self
    }

    pub fn with_default_locale(mut self, locale: impl Into<String>) -> Self {
        self.default_locale = locale.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| SkillError::InvalidManifest {
            name: self.name.clone(),
            reason: reason.to_string(),
        };
        if self.name.trim().is_empty() {
            return Err(invalid("name is empty"));
        }
        if self.intent.trim().is_empty() {
            return Err(invalid("intent is empty"));
        }
        if self.replies.is_empty() {
            return Err(invalid("has no replies"));
        }
        if let Some((locale, _)) = self
            .replies
            .iter()
            .find(|(locale, reply)| locale.trim().is_empty() || reply.trim().is_empty())
        {
            return Err(invalid(&format!("blank locale or reply for `{locale}`")));
        }
        if !self.replies.contains_key(&self.default_locale) {
            return Err(invalid(&format!(
                "no reply for default locale `{}`",
                self.default_locale
            )));
        }
        Ok(())
    }
}

/// A list of manifests, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillManifests {
    #[serde(default)]
    pub skills: Vec<SkillManifest>,
}

impl SkillManifests {
    /// Parse a TOML document with a `[[skills]]` array.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let manifests: Self = toml::from_str(source)?;
        manifests.validate()?;
        Ok(manifests)
    }

    /// Load a single manifest file.
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let manifests: Self = toml::from_str(&content).map_err(|source| SkillError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        manifests.validate()?;
        Ok(manifests)
    }

    /// Load every `*.toml` file in `dir`, sorted by file name.
    ///
    /// A missing directory yields no manifests.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        if !dir.exists() {
            tracing::debug!(path = %dir.display(), "skills directory does not exist");
            return Ok(Self::default());
        }

        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "toml") {
                files.push(path);
            }
        }
        files.sort();

        let mut all = Self::default();
        for path in &files {
            let loaded = Self::load_file(path)?;
            tracing::debug!(path = %path.display(), skills = loaded.skills.len(), "skill file loaded");
            all.skills.extend(loaded.skills);
        }

        tracing::info!(count = all.skills.len(), dir = %dir.display(), "skills loaded");
        Ok(all)
    }

    pub fn validate(&self) -> Result<()> {
        self.skills.iter().try_for_each(SkillManifest::validate)
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GREETER: &str = r#"
        [[skills]]
        name = "Greeter"
        intent = "greet"

        [skills.replies]
        en = "Hey there!"
        fr = "Salut !"
    "#;

    #[test]
    fn parses_manifest() {
        let manifests = SkillManifests::from_toml_str(GREETER).unwrap();
        assert_eq!(manifests.len(), 1);
        let greeter = &manifests.skills[0];
        assert_eq!(greeter.intent, "greet");
        assert_eq!(greeter.default_locale, "en");
        assert_eq!(greeter.replies.get("fr").map(String::as_str), Some("Salut !"));
    }

    #[test]
    fn default_locale_needs_a_reply() {
        let manifest = SkillManifest::new("Greeter", "greet")
            .with_reply("fr", "Salut !")
            .with_default_locale("en");
        assert!(matches!(
            manifest.validate(),
            Err(SkillError::InvalidManifest { .. })
        ));
    }

    #[test]
    fn blank_fields_are_rejected() {
        assert!(SkillManifest::new("", "greet").with_reply("en", "hi").validate().is_err());
        assert!(SkillManifest::new("Greeter", " ").with_reply("en", "hi").validate().is_err());
        assert!(SkillManifest::new("Greeter", "greet").validate().is_err());
        assert!(SkillManifest::new("Greeter", "greet").with_reply("en", "  ").validate().is_err());
    }

    #[test]
    fn loads_directory_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("b.toml"),
            "[[skills]]\nname = \"Second\"\nintent = \"b\"\nreplies = { en = \"b\" }\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("a.toml"),
            "[[skills]]\nname = \"First\"\nintent = \"a\"\nreplies = { en = \"a\" }\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let manifests = SkillManifests::load_dir(dir.path()).unwrap();
        let names: Vec<_> = manifests.skills.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["First", "Second"]);
    }

    #[test]
    fn missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let manifests = SkillManifests::load_dir(&dir.path().join("nope")).unwrap();
        assert!(manifests.is_empty());
    }

    #[test]
    fn parse_errors_name_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[[skills]]\nname = ").unwrap();

        let err = SkillManifests::load_file(&path).unwrap_err();
        assert!(matches!(err, SkillError::Parse { .. }));
        assert!(err.to_string().contains("broken.toml"));
    }
}
