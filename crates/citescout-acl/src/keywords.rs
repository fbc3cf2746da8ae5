//! Keyword gates and term counts for the anthology scan.
//!
//! All matching is plain case-sensitive substring search.

use std::path::Path;

use citescout_core::config_file::ConfigFormat;
use serde::{Deserialize, Serialize};

use crate::AclError;

/// Model and dialogue terms; an abstract needs at least one.
pub const DEFAULT_TOPIC_TERMS: &[&str] = &[
    "language model",
    "BERT",
    "GPT",
    "contextualised word embeddings",
    "XLM-R",
    "conversational",
    "chatbot",
    "open-domain",
    "open domain",
    "dialogue model",
];

/// Bias terms; an abstract needs at least one, and they are counted in the body.
pub const DEFAULT_BIAS_TERMS: &[&str] = &["bias", "toxic", "stereotype", "harm", "fair"];

/// Prompting terms counted in the body.
pub const DEFAULT_PROMPT_TERMS: &[&str] = &[
    "prompt",
    "probe",
    "probing",
    "trigger",
    "template",
    "completion",
];

/// Body text ends at the first occurrence of this marker.
const REFERENCES_MARKER: &str = "References";

fn owned(terms: &[&str]) -> Vec<String> {
    terms.iter().map(|s| s.to_string()).collect()
}

/// Term lists used by the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordSets {
    pub topic: Vec<String>,
    pub bias: Vec<String>,
    pub prompt: Vec<String>,
    pub body_bias: Vec<String>,
}

impl Default for KeywordSets {
    fn default() -> Self {
        Self {
            topic: owned(DEFAULT_TOPIC_TERMS),
            bias: owned(DEFAULT_BIAS_TERMS),
            prompt: owned(DEFAULT_PROMPT_TERMS),
            body_bias: owned(DEFAULT_BIAS_TERMS),
        }
    }
}

/// Distinct-term counts for one paper body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeywordCounts {
    pub prompt: usize,
    pub bias: usize,
}

impl KeywordCounts {
    /// A paper is reported only when more than one prompt term appears.
    pub fn qualifies(&self) -> bool {
        self.prompt > 1
    }
}

fn any_term(text: &str, terms: &[String]) -> bool {
    terms.iter().any(|t| text.contains(t.as_str()))
}

/// Number of `terms` that occur in `text`; each term counts at most once.
pub fn count_distinct_terms(text: &str, terms: &[String]) -> usize {
    terms.iter().filter(|t| text.contains(t.as_str())).count()
}

/// The part of `text` before the first "References", or all of it.
pub fn body_before_references(text: &str) -> &str {
    match text.find(REFERENCES_MARKER) {
        Some(end) => &text[..end],
        None => text,
    }
}

impl KeywordSets {
    /// Abstract gate: at least one topic term and at least one bias term.
    pub fn abstract_matches(&self, abstract_text: &str) -> bool {
        any_term(abstract_text, &self.topic) && any_term(abstract_text, &self.bias)
    }

    /// Count prompt and bias terms in the body of an extracted paper.
    pub fn count_body(&self, full_text: &str) -> KeywordCounts {
        let body = body_before_references(full_text);
        KeywordCounts {
            prompt: count_distinct_terms(body, &self.prompt),
            bias: count_distinct_terms(body, &self.body_bias),
        }
    }

    /// Replace the lists a config file provides; the rest keep their defaults.
    pub fn with_overrides(mut self, file: KeywordFile) -> Self {
        if let Some(topic) = file.topic {
            self.topic = topic;
        }
        if let Some(bias) = file.bias {
            self.bias = bias;
        }
        if let Some(prompt) = file.prompt {
            self.prompt = prompt;
        }
        if let Some(body_bias) = file.body_bias {
            self.body_bias = body_bias;
        }
        self
    }

    /// Defaults overlaid with the lists in `path` (YAML, or TOML by extension).
    pub fn load(path: &Path) -> Result<Self, AclError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AclError::Config(format!("{}: {e}", path.display())))?;
        let file = KeywordFile::parse(&content, ConfigFormat::from_path(path))
            .map_err(|e| AclError::Config(format!("{}: {e}", path.display())))?;
        Ok(Self::default().with_overrides(file))
    }
}

/// On-disk keyword overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordFile {
    pub topic: Option<Vec<String>>,
    pub bias: Option<Vec<String>>,
    pub prompt: Option<Vec<String>>,
    pub body_bias: Option<Vec<String>>,
}

impl KeywordFile {
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self, String> {
        match format {
            ConfigFormat::Yaml if content.trim().is_empty() => Ok(Self::default()),
            ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
        }
    }
}
