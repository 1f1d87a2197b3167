//! Text normalization for extracted script fragments.
//!
//! An ordered list of substitution rules strips reference numbers and
//! speaker labels, then turns stray control characters into spaces.

use crate::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;

/// Reference markers such as `#12`.
static HASH_NUMBER_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#\d+").unwrap());

/// Instructor label ("강사:") and the whitespace after it.
static INSTRUCTOR_LABEL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"강사:\s*").unwrap());

/// Voice actor label ("성우:") and the whitespace after it.
static VOICE_ACTOR_LABEL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"성우:\s*").unwrap());

/// Vertical tab (soft line break in PowerPoint) and form feed.
static CONTROL_CHAR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\x0B\x0C]").unwrap());

/// A single named substitution.
#[derive(Debug, Clone)]
pub struct Rule {
    name: String,
    pattern: Regex,
    replacement: String,
}

impl Rule {
    /// Build a rule from a regex pattern.
    pub fn new(
        name: impl Into<String>,
        pattern: &str,
        replacement: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        let pattern = Regex::new(pattern).map_err(|e| Error::InvalidRule {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            name,
            pattern,
            replacement: replacement.into(),
        })
    }

    /// Build a rule that deletes a literal label and any whitespace after it.
    pub fn label(label: &str) -> Result<Self> {
        let pattern = format!(r"{}\s*", regex::escape(label));
        Self::new(format!("label:{}", label), &pattern, "")
    }

    fn from_static(name: &str, pattern: &Regex, replacement: &str) -> Self {
        Self {
            name: name.to_string(),
            pattern: pattern.clone(),
            replacement: replacement.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Apply this rule to every match in `text`.
    pub fn apply(&self, text: &str) -> String {
        // NoExpand: replacements are literal, "$" must not be a group reference
        self.pattern
            .replace_all(text, regex::NoExpand(&self.replacement))
            .into_owned()
    }
}

/// Ordered substitution chain applied to every accepted text fragment.
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    rules: Vec<Rule>,
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextNormalizer {
    /// Create a normalizer with the default chain:
    ///
    /// 1. remove `#<digits>` markers
    /// 2. remove the instructor label
    /// 3. remove the voice actor label
    /// 4. replace vertical tab / form feed with a space
    pub fn new() -> Self {
        Self {
            rules: vec![
                Rule::from_static("hash-number", &HASH_NUMBER_REGEX, ""),
                Rule::from_static("instructor-label", &INSTRUCTOR_LABEL_REGEX, ""),
                Rule::from_static("voice-actor-label", &VOICE_ACTOR_LABEL_REGEX, ""),
                Rule::from_static("control-chars", &CONTROL_CHAR_REGEX, " "),
            ],
        }
    }

    /// Create a normalizer with no rules; only trimming is applied.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule to the end of the chain.
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Append a label-stripping rule to the end of the chain.
    pub fn with_label(self, label: &str) -> Result<Self> {
        Ok(self.with_rule(Rule::label(label)?))
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Normalize a single text fragment.
    ///
    /// Runs the chain until the text stops changing, then trims it. A
    /// removal can splice a new match together (`#강사:5` becomes `#5`), so
    /// a single pass would not be idempotent.
    pub fn normalize(&self, raw: &str) -> String {
        let mut current = raw.to_string();

        // After the first pass every change of the default chain removes at
        // least one char, so this bound is only reached by rules that grow
        // the text.
        let max_passes = raw.chars().count() + 2;
        for _ in 0..max_passes {
            let next = self.apply_chain(&current);
            if next == current {
                break;
            }
            current = next;
        }

        current.trim().to_string()
    }

    fn apply_chain(&self, text: &str) -> String {
        self.rules
            .iter()
            .fold(text.to_string(), |acc, rule| rule.apply(&acc))
    }
}
