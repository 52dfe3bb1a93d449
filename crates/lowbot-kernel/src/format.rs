//! Channel-specific output formatting.
//!
//! Each adapter carries an [`OutputConfig`] describing the markup its platform
//! expects.  An [`OutputFormatter`] renders skill content into a
//! [`RenderedResponse`] for that platform.  Formatting is pure: the same
//! content and configuration always produce the same output.
//!
//! | Markup | Rendering |
//! |--------|-----------|
//! | `plain` | content as-is |
//! | `markdown` | markdown control characters backslash-escaped |
//! | `html` | HTML entities escaped, newlines as `<br>` |
//! | `ssml` | XML escaped, wrapped in `<speak><s>…</s></speak>` |

use serde::{Deserialize, Serialize};

/// Markup dialect expected by a platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Markup {
    #[default]
    Plain,
    Markdown,
    Html,
    Ssml,
}

/// Per-adapter output configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub markup: Markup,
    /// Truncate content longer than this many characters, ending with `…`.
    pub max_chars: Option<usize>,
}

impl OutputConfig {
    pub fn new(markup: Markup) -> Self {
        Self {
            markup,
            max_chars: None,
        }
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = Some(max_chars);
        self
    }

    /// Check that the values are usable.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_chars == Some(0) {
            return Err("max_chars must be at least 1".into());
        }
        Ok(())
    }
}

/// Formatted content ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RenderedResponse(String);

impl RenderedResponse {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for RenderedResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Renders content according to an [`OutputConfig`].
#[derive(Debug, Clone, Default)]
pub struct OutputFormatter {
    config: OutputConfig,
}

impl OutputFormatter {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OutputConfig {
        &self.config
    }

    /// Render `content` for this formatter's platform.
    pub fn format(&self, content: &str) -> RenderedResponse {
        let content = content.trim_end();
        let content = match self.config.max_chars {
            Some(max) => truncate(content, max),
            None => content.to_string(),
        };

        let rendered = match self.config.markup {
            Markup::Plain => content,
            Markup::Markdown => escape_markdown(&content),
            Markup::Html => escape_xml(&content).replace('\n', "<br>"),
            Markup::Ssml => format!("<speak><s>{}</s></speak>", escape_xml(&content)),
        };
        RenderedResponse(rendered)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Cut `text` to at most `max` characters, marking the cut with `…`.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(max - 1).collect();
    out.push('…');
    out
}

fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '*' | '_' | '`' | '~' | '|' | '>' | '[' | ']') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_passes_through() {
        let f = OutputFormatter::new(OutputConfig::new(Markup::Plain));
        assert_eq!(f.format("Hey there\n").as_str(), "Hey there");
    }

    #[test]
    fn markdown_escapes_control_characters() {
        let f = OutputFormatter::new(OutputConfig::new(Markup::Markdown));
        assert_eq!(f.format("a *b* _c_").as_str(), r"a \*b\* \_c\_");
    }

    #[test]
    fn ssml_wraps_and_escapes() {
        let f = OutputFormatter::new(OutputConfig::new(Markup::Ssml));
        assert_eq!(
            f.format("Tom & Jerry").as_str(),
            "<speak><s>Tom &amp; Jerry</s></speak>"
        );
    }

    #[test]
    fn html_escapes_and_breaks_lines() {
        let f = OutputFormatter::new(OutputConfig::new(Markup::Html));
        assert_eq!(f.format("<b>\nhi").as_str(), "&lt;b&gt;<br>hi");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let f = OutputFormatter::new(OutputConfig::new(Markup::Plain).with_max_chars(4));
        assert_eq!(f.format("héllo wörld").as_str(), "hél…");
        assert_eq!(f.format("hey").as_str(), "hey");
    }

    #[test]
    fn formatting_is_deterministic() {
        let f = OutputFormatter::new(OutputConfig::new(Markup::Markdown).with_max_chars(10));
        let a = f.format("some *content* that is long");
        let b = f.format("some *content* that is long");
        assert_eq!(a, b);
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: OutputConfig =
            serde_json::from_str(r#"{"markup":"ssml"}"#).expect("deserialize");
        assert_eq!(config.markup, Markup::Ssml);
        assert!(config.max_chars.is_none());

        let config: OutputConfig = serde_json::from_str("{}").expect("deserialize");
        assert_eq!(config, OutputConfig::default());
    }

    #[test]
    fn zero_max_chars_is_rejected() {
        assert!(OutputConfig::new(Markup::Plain).with_max_chars(0).validate().is_err());
        assert!(OutputConfig::new(Markup::Plain).with_max_chars(1).validate().is_ok());
        assert!(OutputConfig::default().validate().is_ok());
    }
}
