//! Credentials and model selection supplied by the user.

use crate::ScribeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Chat models offered in the model picker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelChoice {
    #[default]
    #[serde(rename = "gpt-4o-mini-2024-07-18")]
    Gpt4oMini,
    #[serde(rename = "gpt-4")]
    Gpt4,
    #[serde(rename = "gpt-3.5-turbo")]
    Gpt35Turbo,
}

impl ModelChoice {
    /// All choices in picker order.
    pub const ALL: [ModelChoice; 3] = [
        ModelChoice::Gpt4oMini,
        ModelChoice::Gpt4,
        ModelChoice::Gpt35Turbo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelChoice::Gpt4oMini => "gpt-4o-mini-2024-07-18",
            ModelChoice::Gpt4 => "gpt-4",
            ModelChoice::Gpt35Turbo => "gpt-3.5-turbo",
        }
    }
}

impl fmt::Display for ModelChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelChoice {
    type Err = ScribeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelChoice::ALL
            .into_iter()
            .find(|m| m.as_str() == s.trim())
            .ok_or_else(|| ScribeError::Config(format!("Unknown model: {s}")))
    }
}

/// A credential the pipeline cannot run without.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingCredential {
    SerperApiKey,
    OpenaiApiKey,
}

impl MissingCredential {
    pub fn label(&self) -> &'static str {
        match self {
            MissingCredential::SerperApiKey => "Serper API Key",
            MissingCredential::OpenaiApiKey => "OpenAI API Key",
        }
    }
}

/// Whether a pipeline can be built from a credential set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Readiness {
    Ready,
    Disabled { missing: Vec<MissingCredential> },
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready)
    }
}

/// Keys and model for one pipeline run.
///
/// Passed by value into the pipeline factory; nothing here is ever exported
/// to the process environment.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub serper_api_key: Option<String>,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub model: ModelChoice,
}

impl Credentials {
    pub fn new(
        serper_api_key: impl Into<String>,
        openai_api_key: impl Into<String>,
        model: ModelChoice,
    ) -> Self {
        Self {
            serper_api_key: Some(serper_api_key.into()),
            openai_api_key: Some(openai_api_key.into()),
            model,
        }
    }

    pub fn serper_api_key(&self) -> Option<&str> {
        non_empty(self.serper_api_key.as_deref())
    }

    pub fn openai_api_key(&self) -> Option<&str> {
        non_empty(self.openai_api_key.as_deref())
    }

    /// Presence check for both keys.
    pub fn readiness(&self) -> Readiness {
        let mut missing = Vec::new();
        if self.serper_api_key().is_none() {
            missing.push(MissingCredential::SerperApiKey);
        }
        if self.openai_api_key().is_none() {
            missing.push(MissingCredential::OpenaiApiKey);
        }
        if missing.is_empty() {
            Readiness::Ready
        } else {
            Readiness::Disabled { missing }
        }
    }

    /// Fill empty keys from `fallback`. The model is kept as given.
    pub fn with_fallback(mut self, fallback: &Credentials) -> Self {
        if self.serper_api_key().is_none() {
            self.serper_api_key = fallback.serper_api_key().map(str::to_string);
        }
        if self.openai_api_key().is_none() {
            self.openai_api_key = fallback.openai_api_key().map(str::to_string);
        }
        self
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("serper_api_key", &self.serper_api_key().map(|_| "<redacted>"))
            .field("openai_api_key", &self.openai_api_key().map(|_| "<redacted>"))
            .field("model", &self.model)
            .finish()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
