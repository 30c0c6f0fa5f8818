use std::sync::Arc;

use async_trait::async_trait;
use scribe_common::{Result, ScribeError};
use scribe_llm::LlmClient;
use serde_json::{Value, json};
use tracing::info;

use super::{Tool, string_arg};
use crate::agent::AgentDefinition;
use crate::executor::{AgentExecutor, ExecutorSettings};
use crate::prompts;
use crate::task::RenderedTask;

const COWORKER_EXPECTED_OUTPUT: &str =
    "Your best answer to your coworker asking you this, accounting for the context shared.";

/// Lets an agent hand a sub-task to another agent of the same crew.
///
/// The coworker answers in a single pass without tools of its own, so a
/// delegation can never recurse.
pub struct DelegateWorkTool {
    coworkers: Vec<AgentDefinition>,
    llm: Arc<dyn LlmClient>,
    settings: ExecutorSettings,
    description: String,
}

impl DelegateWorkTool {
    pub fn new(
        coworkers: Vec<AgentDefinition>,
        llm: Arc<dyn LlmClient>,
        settings: ExecutorSettings,
    ) -> Self {
        let roles = coworkers
            .iter()
            .map(|c| c.role.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            description: format!(
                "Delegate a specific task to one of the following coworkers: {roles}. \
                 Share all the context they need; they know nothing about your task."
            ),
            coworkers,
            llm,
            settings,
        }
    }
}

#[async_trait]
impl Tool for DelegateWorkTool {
    fn name(&self) -> &str {
        "Delegate work to coworker"
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> Value {
        json!({
            "task": {"type": "string", "description": "The task to delegate"},
            "context": {"type": "string", "description": "Everything the coworker needs to know"},
            "coworker": {"type": "string", "description": "Role of the coworker to delegate to"}
        })
    }

    async fn call(&self, args: Value) -> Result<String> {
        let task = string_arg(&args, "task")?;
        let coworker_role = string_arg(&args, "coworker")?;
        let context = args
            .get("context")
            .and_then(Value::as_str)
            .map(str::to_string);

        let coworker = self
            .coworkers
            .iter()
            .find(|c| c.role.eq_ignore_ascii_case(coworker_role.trim_matches('"')))
            .ok_or_else(|| {
                ScribeError::Tool(format!("No coworker with role '{coworker_role}'"))
            })?;

        info!(coworker = %coworker.role, "Delegating work");

        let rendered = RenderedTask {
            description: task,
            expected_output: COWORKER_EXPECTED_OUTPUT.to_string(),
        };
        let prompt = prompts::task_prompt(&rendered, context.as_deref());
        let execution = AgentExecutor::new(coworker, self.llm.as_ref(), &[], &self.settings)
            .run(prompt)
            .await?;
        Ok(execution.output)
    }
}
