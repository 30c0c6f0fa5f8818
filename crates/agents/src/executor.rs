//! One agent working one task: the Thought / Action / Observation loop.
//!
//! The model is told which tools exist and answers either with an
//! `Action:` + `Action Input:` pair, which is executed and fed back as an
//! `Observation:`, or with `Final Answer:`, which ends the task. Failures of
//! a tool are reported back to the model; failures of the model itself,
//! including a coworker's model call during delegation, end the task with an
//! error.

use std::sync::Arc;

use scribe_common::{Result, ScribeError};
use scribe_llm::{ChatMessage, LlmClient, LlmRequest, TokenUsage};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::agent::AgentDefinition;
use crate::prompts::{
    self, ACTION_INPUT_MARKER, ACTION_MARKER, FINAL_ANSWER_MARKER, FORCE_FINAL_ANSWER,
    FORMAT_REMINDER, OBSERVATION_MARKER, OBSERVATION_STOP,
};
use crate::tools::Tool;

macro_rules! step_log {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            tracing::info!($($arg)+)
        } else {
            tracing::debug!($($arg)+)
        }
    };
}
pub(crate) use step_log;

/// Sampling settings applied to every model request of a crew.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutorSettings {
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AgentStep {
    Final(String),
    Action { tool: String, input: String },
    Malformed,
}

/// Classify one model reply.
pub(crate) fn parse_step(text: &str) -> AgentStep {
    let final_pos = text.find(FINAL_ANSWER_MARKER);
    let action_pos = text.find(ACTION_MARKER);

    if let Some(f) = final_pos {
        if action_pos.is_none_or(|a| f < a) {
            let answer = &text[f + FINAL_ANSWER_MARKER.len()..];
            return AgentStep::Final(answer.trim().to_string());
        }
    }

    if let Some(a) = action_pos {
        let after = &text[a + ACTION_MARKER.len()..];
        if let Some(i) = after.find(ACTION_INPUT_MARKER) {
            let tool = after[..i].lines().next().unwrap_or_default();
            let mut input = &after[i + ACTION_INPUT_MARKER.len()..];
            if let Some(o) = input.find(OBSERVATION_MARKER) {
                input = &input[..o];
            }
            return AgentStep::Action {
                tool: clean_tool_name(tool),
                input: input.trim().to_string(),
            };
        }
    }

    AgentStep::Malformed
}

fn clean_tool_name(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c| c == '`' || c == '"' || c == '\'' || c == '[' || c == ']')
        .trim()
        .to_string()
}

/// Parse the `Action Input:` text, tolerating code fences and bare strings.
fn parse_tool_input(raw: &str) -> Value {
    let trimmed = raw.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|s| s.trim_end().trim_end_matches("```"))
        .unwrap_or(trimmed)
        .trim();

    serde_json::from_str(unfenced).unwrap_or_else(|_| {
        Value::String(unfenced.trim_matches(|c| c == '"' || c == '\'').to_string())
    })
}

fn strip_observation(reply: &str) -> &str {
    match reply.find(OBSERVATION_STOP) {
        Some(i) => &reply[..i],
        None => reply,
    }
}

/// What an agent produced for one task.
#[derive(Debug, Clone, Default)]
pub struct Execution {
    pub output: String,
    pub usage: TokenUsage,
    pub requests: u32,
    pub iterations: usize,
    pub tool_calls: usize,
}

pub struct AgentExecutor<'a> {
    agent: &'a AgentDefinition,
    llm: &'a dyn LlmClient,
    tools: &'a [Arc<dyn Tool>],
    settings: &'a ExecutorSettings,
}

impl<'a> AgentExecutor<'a> {
    pub fn new(
        agent: &'a AgentDefinition,
        llm: &'a dyn LlmClient,
        tools: &'a [Arc<dyn Tool>],
        settings: &'a ExecutorSettings,
    ) -> Self {
        Self {
            agent,
            llm,
            tools,
            settings,
        }
    }

    pub async fn run(&self, task_prompt: String) -> Result<Execution> {
        let system = prompts::system_prompt(self.agent, self.tools);
        let mut messages = vec![ChatMessage::user(task_prompt)];
        let mut execution = Execution::default();
        let mut last_action: Option<(String, String)> = None;

        for iteration in 1..=self.agent.max_iterations {
            let reply = self.ask(&system, &messages, &mut execution).await?;
            execution.iterations = iteration;

            match parse_step(&reply) {
                AgentStep::Final(answer) => {
                    step_log!(
                        self.agent.verbose,
                        agent = %self.agent.role,
                        iteration,
                        answer_len = answer.len(),
                        "Agent gave final answer"
                    );
                    execution.output = answer;
                    return Ok(execution);
                }
                AgentStep::Action { tool, input } => {
                    step_log!(
                        self.agent.verbose,
                        agent = %self.agent.role,
                        iteration,
                        tool = %tool,
                        input = %input,
                        "Agent requested tool"
                    );
                    let observation = self
                        .observe(&tool, &input, &mut last_action, &mut execution)
                        .await?;
                    messages.push(ChatMessage::assistant(strip_observation(&reply).trim_end()));
                    messages.push(ChatMessage::user(format!("{OBSERVATION_MARKER} {observation}")));
                }
                AgentStep::Malformed => {
                    if self.tools.is_empty() && !reply.trim().is_empty() {
                        execution.output = reply.trim().to_string();
                        return Ok(execution);
                    }
                    warn!(agent = %self.agent.role, iteration, "Agent reply did not follow the format");
                    messages.push(ChatMessage::assistant(reply));
                    messages.push(ChatMessage::user(FORMAT_REMINDER));
                }
            }
        }

        warn!(
            agent = %self.agent.role,
            max_iterations = self.agent.max_iterations,
            "Iteration limit reached, forcing final answer"
        );
        messages.push(ChatMessage::user(FORCE_FINAL_ANSWER));
        let reply = self.ask(&system, &messages, &mut execution).await?;
        execution.iterations = self.agent.max_iterations + 1;
        execution.output = match parse_step(&reply) {
            AgentStep::Final(answer) => answer,
            _ => strip_observation(&reply).trim().to_string(),
        };
        Ok(execution)
    }

    async fn ask(
        &self,
        system: &str,
        messages: &[ChatMessage],
        execution: &mut Execution,
    ) -> Result<String> {
        let request = LlmRequest {
            system_prompt: Some(system.to_string()),
            messages: messages.to_vec(),
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            stop: vec![OBSERVATION_STOP.to_string()],
        };
        let response = self.llm.complete(request).await?;
        execution.requests = execution.requests.saturating_add(1);
        if let Some(usage) = response.usage {
            execution.usage.prompt_tokens =
                execution.usage.prompt_tokens.saturating_add(usage.prompt_tokens);
            execution.usage.completion_tokens = execution
                .usage
                .completion_tokens
                .saturating_add(usage.completion_tokens);
        }
        Ok(response.content)
    }

    async fn observe(
        &self,
        tool_name: &str,
        input: &str,
        last_action: &mut Option<(String, String)>,
        execution: &mut Execution,
    ) -> Result<String> {
        let Some(tool) = self
            .tools
            .iter()
            .find(|t| t.name().eq_ignore_ascii_case(tool_name))
        else {
            let names = self.tools.iter().map(|t| t.name()).collect::<Vec<_>>();
            return Ok(format!(
                "Error: tool '{tool_name}' does not exist. Available tools: [{}]",
                names.join(", ")
            ));
        };

        let action = (tool.name().to_string(), input.to_string());
        if last_action.as_ref() == Some(&action) {
            return Ok("I already used this tool with this exact input. Use a different input \
                       or give your Final Answer."
                .to_string());
        }
        *last_action = Some(action);

        execution.tool_calls += 1;
        // A model failure inside a tool (delegation) fails the task like any other.
        match tool.call(parse_tool_input(input)).await {
            Ok(output) => Ok(output),
            Err(e @ ScribeError::Llm(_)) => Err(e),
            Err(e) => {
                warn!(agent = %self.agent.role, tool = %tool.name(), error = %e, "Tool failed");
                Ok(format!("Error: {e}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use scribe_llm::ScriptedClient;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoTool {
        calls: AtomicUsize,
        fail: bool,
    }

    impl EchoTool {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "Echo"
        }
        fn description(&self) -> &str {
            "Echoes the query back"
        }
        fn parameters(&self) -> Value {
            json!({"query": {"type": "string"}})
        }
        async fn call(&self, args: Value) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ScribeError::Tool("upstream down".into()));
            }
            Ok(format!("echo: {}", args["query"].as_str().unwrap_or("?")))
        }
    }

    fn agent() -> AgentDefinition {
        AgentDefinition::new("Researcher", "Find facts", "Curious.").max_iterations(3)
    }

    #[test]
    fn parses_final_answer() {
        let step = parse_step("Thought: done\nFinal Answer:  The post.\n");
        assert_eq!(step, AgentStep::Final("The post.".into()));
    }

    #[test]
    fn parses_action_and_drops_hallucinated_observation() {
        let step = parse_step(
            "Thought: search\nAction: `Search the internet`\nAction Input: {\"search_query\": \"x\"}\nObservation: fake",
        );
        assert_eq!(
            step,
            AgentStep::Action {
                tool: "Search the internet".into(),
                input: "{\"search_query\": \"x\"}".into()
            }
        );
    }

    #[test]
    fn action_before_final_answer_wins() {
        let step = parse_step("Action: Echo\nAction Input: {}\nFinal Answer: guess");
        assert!(matches!(step, AgentStep::Action { .. }));
    }

    #[test]
    fn reply_without_markers_is_malformed() {
        assert_eq!(parse_step("I think the answer is 42."), AgentStep::Malformed);
        assert_eq!(parse_step("Action: Echo but no input"), AgentStep::Malformed);
    }

    #[test]
    fn tool_input_tolerates_fences_and_strings() {
        assert_eq!(parse_tool_input("```json\n{\"a\": 1}\n```"), json!({"a": 1}));
        assert_eq!(parse_tool_input("\"https://x.dev\""), json!("https://x.dev"));
        assert_eq!(parse_tool_input("plain words"), json!("plain words"));
    }

    #[tokio::test]
    async fn runs_tool_then_returns_final_answer() {
        let llm = ScriptedClient::new()
            .reply("Thought: look it up\nAction: Echo\nAction Input: {\"query\": \"rust\"}")
            .reply("Thought: I now know the final answer\nFinal Answer: Rust is fast.");
        let echo: Arc<dyn Tool> = Arc::new(EchoTool::new());
        let tools = vec![echo];
        let agent = agent();
        let settings = ExecutorSettings::default();

        let execution = AgentExecutor::new(&agent, &llm, &tools, &settings)
            .run("Current Task: facts".into())
            .await
            .unwrap();

        assert_eq!(execution.output, "Rust is fast.");
        assert_eq!(execution.tool_calls, 1);
        assert_eq!(execution.iterations, 2);
        assert_eq!(execution.requests, 2);
        assert_eq!(execution.usage.total(), 30);

        let requests = llm.requests();
        let second = &requests[1].messages;
        assert_eq!(second.len(), 3);
        assert_eq!(second[2].content, "Observation: echo: rust");
        assert_eq!(requests[0].stop, vec![OBSERVATION_STOP.to_string()]);
        assert!(requests[0].system_prompt.as_deref().unwrap().contains("Tool Name: Echo"));
    }

    #[tokio::test]
    async fn unknown_tool_and_tool_errors_become_observations() {
        let llm = ScriptedClient::new()
            .reply("Action: Teleport\nAction Input: {}")
            .reply("Action: echo\nAction Input: {\"query\": \"a\"}")
            .reply("Final Answer: gave up");
        let failing: Arc<dyn Tool> = Arc::new(EchoTool {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let tools = vec![failing];
        let agent = agent();
        let settings = ExecutorSettings::default();

        let execution = AgentExecutor::new(&agent, &llm, &tools, &settings)
            .run("task".into())
            .await
            .unwrap();

        assert_eq!(execution.output, "gave up");
        let requests = llm.requests();
        assert!(requests[1].messages[2].content.contains("does not exist"));
        assert!(requests[2].messages[4].content.contains("Error: Tool error: upstream down"));
    }

    #[tokio::test]
    async fn repeated_identical_action_is_not_executed_twice() {
        let llm = ScriptedClient::new()
            .reply("Action: Echo\nAction Input: {\"query\": \"a\"}")
            .reply("Action: Echo\nAction Input: {\"query\": \"a\"}")
            .reply("Final Answer: ok");
        let echo = Arc::new(EchoTool::new());
        let tools: Vec<Arc<dyn Tool>> = vec![echo.clone()];
        let agent = agent();
        let settings = ExecutorSettings::default();

        AgentExecutor::new(&agent, &llm, &tools, &settings)
            .run("task".into())
            .await
            .unwrap();

        assert_eq!(echo.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn forces_final_answer_after_iteration_limit() {
        let llm = ScriptedClient::new()
            .reply("Action: Echo\nAction Input: {\"query\": \"1\"}")
            .reply("Action: Echo\nAction Input: {\"query\": \"2\"}")
            .reply("Action: Echo\nAction Input: {\"query\": \"3\"}")
            .reply("Thought: fine\nFinal Answer: forced answer");
        let tools: Vec<Arc<dyn Tool>> = vec![Arc::new(EchoTool::new())];
        let agent = agent();
        let settings = ExecutorSettings::default();

        let execution = AgentExecutor::new(&agent, &llm, &tools, &settings)
            .run("task".into())
            .await
            .unwrap();

        assert_eq!(execution.output, "forced answer");
        assert_eq!(execution.iterations, 4);
        let last = llm.requests().pop().unwrap();
        assert_eq!(last.messages.last().unwrap().content, FORCE_FINAL_ANSWER);
    }

    #[tokio::test]
    async fn malformed_reply_with_tools_gets_reminder() {
        let llm = ScriptedClient::new()
            .reply("Just some musing")
            .reply("Final Answer: structured");
        let tools: Vec<Arc<dyn Tool>> = vec![Arc::new(EchoTool::new())];
        let agent = agent();
        let settings = ExecutorSettings::default();

        let execution = AgentExecutor::new(&agent, &llm, &tools, &settings)
            .run("task".into())
            .await
            .unwrap();

        assert_eq!(execution.output, "structured");
        assert_eq!(llm.requests()[1].messages[2].content, FORMAT_REMINDER);
    }

    #[tokio::test]
    async fn plain_reply_without_tools_is_accepted() {
        let llm = ScriptedClient::new().reply("  A plain answer.  ");
        let agent = agent();
        let settings = ExecutorSettings::default();

        let execution = AgentExecutor::new(&agent, &llm, &[], &settings)
            .run("task".into())
            .await
            .unwrap();

        assert_eq!(execution.output, "A plain answer.");
    }

    #[tokio::test]
    async fn model_failure_propagates() {
        let llm = ScriptedClient::new().fail("rate limited");
        let agent = agent();
        let settings = ExecutorSettings::default();

        let err = AgentExecutor::new(&agent, &llm, &[], &settings)
            .run("task".into())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("rate limited"));
    }
}
