//! Template inputs and `{placeholder}` interpolation.

use crate::{Result, ScribeError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex"));

/// Named values substituted into agent and task templates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Inputs(BTreeMap<String, String>);

impl Inputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inputs carrying a single `topic` value.
    pub fn topic(topic: impl Into<String>) -> Self {
        Self::new().with("topic", topic)
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Replace every `{name}` in `template` with the matching input.
///
/// Only identifier-shaped placeholders are considered, so JSON snippets or
/// stray braces pass through. Substituted values are not scanned again.
pub fn interpolate(template: &str, inputs: &Inputs) -> Result<String> {
    if let Some(missing) = PLACEHOLDER_RE
        .captures_iter(template)
        .filter_map(|c| c.get(1))
        .find(|m| inputs.get(m.as_str()).is_none())
    {
        return Err(ScribeError::Config(format!(
            "Missing required template variable '{}'",
            missing.as_str()
        )));
    }

    let rendered = PLACEHOLDER_RE.replace_all(template, |caps: &regex::Captures<'_>| {
        inputs.get(&caps[1]).unwrap_or_default().to_string()
    });
    Ok(rendered.into_owned())
}
