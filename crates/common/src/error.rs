//! Error types for scribe.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScribeError {
    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ScribeError {
    /// Whether re-running the failed operation could succeed.
    ///
    /// Configuration errors are deterministic: a missing template variable or
    /// an invalid crew layout fails the same way on every attempt.
    pub fn is_transient(&self) -> bool {
        !matches!(self, ScribeError::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, ScribeError>;
