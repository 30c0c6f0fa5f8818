//! Deterministic client for exercising agents without a model provider.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use scribe_common::{Result, ScribeError};

use crate::client::{LlmClient, LlmRequest, LlmResponse, TokenUsage};

enum Scripted {
    Reply(String),
    Fail(String),
}

/// Replays queued replies in order and records every request it receives.
///
/// Once the queue is empty the fallback reply is returned, if one was set;
/// otherwise the call fails.
pub struct ScriptedClient {
    model: String,
    script: Mutex<VecDeque<Scripted>>,
    fallback: Option<String>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self {
            model: "scripted".to_string(),
            script: Mutex::new(VecDeque::new()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn reply(self, content: impl Into<String>) -> Self {
        self.script.lock().push_back(Scripted::Reply(content.into()));
        self
    }

    pub fn fail(self, message: impl Into<String>) -> Self {
        self.script.lock().push_back(Scripted::Fail(message.into()));
        self
    }

    pub fn with_fallback(mut self, content: impl Into<String>) -> Self {
        self.fallback = Some(content.into());
        self
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }
}

impl Default for ScriptedClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        self.requests.lock().push(request);
        let next = self.script.lock().pop_front();
        let content = match next {
            Some(Scripted::Reply(content)) => content,
            Some(Scripted::Fail(message)) => return Err(ScribeError::Llm(message)),
            None => self
                .fallback
                .clone()
                .ok_or_else(|| ScribeError::Llm("Scripted client exhausted".to_string()))?,
        };
        Ok(LlmResponse {
            content,
            model: self.model.clone(),
            usage: Some(TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
            }),
            finish_reason: Some("stop".to_string()),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
