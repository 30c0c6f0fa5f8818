//! Crew orchestration: agents and tasks executed as one pipeline run.
//!
//! Tasks run one after another in list order. Each task sees the outputs of
//! every task before it as context, and a task with an `output_file` has its
//! answer written there once it completes.
//!
//! # Example
//!
//! ```ignore
//! let crew = Crew::new("blog", llm)
//!     .add_agent(planner.clone())
//!     .add_task(TaskDefinition::new("Plan {topic}", "An outline", planner));
//!
//! let output = crew.kickoff(&Inputs::topic("Rust")).await?;
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use scribe_common::{Inputs, Result, ScribeError};
use scribe_llm::{LlmClient, TokenUsage};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::agent::AgentDefinition;
use crate::executor::{AgentExecutor, ExecutorSettings, step_log};
use crate::prompts;
use crate::task::{TaskDefinition, TaskOutput};
use crate::tools::{DelegateWorkTool, Tool};

const CONTEXT_DIVIDER: &str = "\n\n----------\n\n";

/// Something that can be kicked off with template inputs.
#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn kickoff(&self, inputs: &Inputs) -> Result<CrewOutput>;

    fn name(&self) -> &str;
}

/// Token accounting across a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UsageMetrics {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    pub successful_requests: u32,
}

impl UsageMetrics {
    fn add(&mut self, usage: TokenUsage, requests: u32) {
        self.prompt_tokens = self.prompt_tokens.saturating_add(usage.prompt_tokens);
        self.completion_tokens = self.completion_tokens.saturating_add(usage.completion_tokens);
        self.total_tokens = self.total_tokens.saturating_add(usage.total());
        self.successful_requests = self.successful_requests.saturating_add(requests);
    }
}

/// Result of a crew run.
#[derive(Debug, Clone, Serialize)]
pub struct CrewOutput {
    /// The last task's answer.
    pub raw: String,
    pub tasks_output: Vec<TaskOutput>,
    pub token_usage: UsageMetrics,
    pub duration_ms: u64,
}

impl CrewOutput {
    /// True when the run produced no usable text.
    pub fn is_empty(&self) -> bool {
        self.raw.trim().is_empty()
    }
}

pub struct Crew {
    name: String,
    agents: Vec<Arc<AgentDefinition>>,
    tasks: Vec<TaskDefinition>,
    llm: Arc<dyn LlmClient>,
    settings: ExecutorSettings,
    output_dir: PathBuf,
    verbose: bool,
}

impl Crew {
    pub fn new(name: impl Into<String>, llm: Arc<dyn LlmClient>) -> Self {
        Self {
            name: name.into(),
            agents: Vec::new(),
            tasks: Vec::new(),
            llm,
            settings: ExecutorSettings::default(),
            output_dir: PathBuf::from("."),
            verbose: false,
        }
    }

    pub fn add_agent(mut self, agent: Arc<AgentDefinition>) -> Self {
        self.agents.push(agent);
        self
    }

    pub fn add_task(mut self, task: TaskDefinition) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn with_settings(mut self, settings: ExecutorSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Base directory for relative task output files.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn verbose(mut self, value: bool) -> Self {
        self.verbose = value;
        self
    }

    pub fn agents(&self) -> &[Arc<AgentDefinition>] {
        &self.agents
    }

    pub fn tasks(&self) -> &[TaskDefinition] {
        &self.tasks
    }

    /// Check that the crew can run: at least one task, and every task's
    /// agent is a member of the crew.
    pub fn validate(&self) -> Result<()> {
        if self.tasks.is_empty() {
            return Err(ScribeError::Config(format!(
                "Crew '{}' has no tasks",
                self.name
            )));
        }
        for task in &self.tasks {
            if self.agent_index(&task.agent).is_none() {
                return Err(ScribeError::Config(format!(
                    "Task agent '{}' is not a member of crew '{}'",
                    task.agent.role, self.name
                )));
            }
        }
        Ok(())
    }

    fn agent_index(&self, agent: &Arc<AgentDefinition>) -> Option<usize> {
        self.agents.iter().position(|a| Arc::ptr_eq(a, agent))
    }

    fn resolve_output_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.output_dir.join(path)
        }
    }

    async fn write_output(&self, path: &Path, content: &str) -> Result<()> {
        let path = self.resolve_output_path(path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await?;
        debug!(crew = %self.name, path = %path.display(), "Wrote task output file");
        Ok(())
    }

    fn tools_for(
        &self,
        task: &TaskDefinition,
        agent_index: usize,
        rendered: &[AgentDefinition],
    ) -> Vec<Arc<dyn Tool>> {
        let mut tools = task.tools.clone();
        if rendered[agent_index].allow_delegation && rendered.len() > 1 {
            let coworkers = rendered
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != agent_index)
                .map(|(_, a)| a.clone())
                .collect();
            tools.push(Arc::new(DelegateWorkTool::new(
                coworkers,
                self.llm.clone(),
                self.settings.clone(),
            )));
        }
        tools
    }
}

#[async_trait]
impl Pipeline for Crew {
    async fn kickoff(&self, inputs: &Inputs) -> Result<CrewOutput> {
        let start_time = std::time::Instant::now();
        self.validate()?;

        info!(
            crew = %self.name,
            agent_count = self.agents.len(),
            task_count = self.tasks.len(),
            "Starting crew"
        );

        let rendered_agents = self
            .agents
            .iter()
            .map(|a| a.render(inputs))
            .collect::<Result<Vec<_>>>()?;

        let mut tasks_output: Vec<TaskOutput> = Vec::with_capacity(self.tasks.len());
        let mut usage = UsageMetrics::default();

        for (i, task) in self.tasks.iter().enumerate() {
            let agent_index = self
                .agent_index(&task.agent)
                .ok_or_else(|| ScribeError::Config("Task agent missing from crew".into()))?;
            let agent = &rendered_agents[agent_index];
            let rendered_task = task.render(inputs)?;

            step_log!(
                self.verbose,
                crew = %self.name,
                step = i + 1,
                agent = %agent.role,
                "Executing task"
            );

            let context = (!tasks_output.is_empty()).then(|| {
                tasks_output
                    .iter()
                    .map(|t| t.raw.as_str())
                    .collect::<Vec<_>>()
                    .join(CONTEXT_DIVIDER)
            });
            let prompt = prompts::task_prompt(&rendered_task, context.as_deref());
            let tools = self.tools_for(task, agent_index, &rendered_agents);

            let execution = AgentExecutor::new(agent, self.llm.as_ref(), &tools, &self.settings)
                .run(prompt)
                .await
                .map_err(|e| {
                    error!(
                        crew = %self.name,
                        step = i + 1,
                        agent = %agent.role,
                        error = %e,
                        "Task failed"
                    );
                    e
                })?;

            step_log!(
                self.verbose,
                crew = %self.name,
                step = i + 1,
                agent = %agent.role,
                output_len = execution.output.len(),
                tool_calls = execution.tool_calls,
                "Task completed"
            );

            if let Some(ref path) = task.output_file {
                self.write_output(path, &execution.output).await?;
            }

            usage.add(execution.usage, execution.requests);
            tasks_output.push(TaskOutput {
                description: rendered_task.description,
                agent: agent.role.clone(),
                raw: execution.output,
                iterations: execution.iterations,
                tool_calls: execution.tool_calls,
            });
        }

        let raw = tasks_output
            .last()
            .map(|t| t.raw.clone())
            .unwrap_or_default();

        let duration_ms = start_time.elapsed().as_millis() as u64;
        info!(
            crew = %self.name,
            tasks = tasks_output.len(),
            total_tokens = usage.total_tokens,
            duration_ms,
            "Crew completed"
        );

        Ok(CrewOutput {
            raw,
            tasks_output,
            token_usage: usage,
            duration_ms,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_llm::ScriptedClient;

    fn agent(role: &str) -> Arc<AgentDefinition> {
        Arc::new(AgentDefinition::new(role, format!("{role} on {{topic}}"), "Experienced."))
    }

    #[tokio::test]
    async fn tasks_run_in_order_with_prior_outputs_as_context() {
        let llm = Arc::new(
            ScriptedClient::new()
                .reply("Final Answer: the plan")
                .reply("Final Answer: the draft")
                .reply("Final Answer: the final post"),
        );
        let (a, b, c) = (agent("Planner"), agent("Writer"), agent("Editor"));
        let crew = Crew::new("test", llm.clone())
            .add_agent(a.clone())
            .add_agent(b.clone())
            .add_agent(c.clone())
            .add_task(TaskDefinition::new("Plan {topic}", "outline", a))
            .add_task(TaskDefinition::new("Write {topic}", "draft", b))
            .add_task(TaskDefinition::new("Edit", "post", c));

        let output = crew.kickoff(&Inputs::topic("tides")).await.unwrap();

        assert_eq!(output.raw, "the final post");
        assert_eq!(output.tasks_output.len(), 3);
        assert_eq!(output.tasks_output[0].agent, "Planner");
        assert_eq!(output.tasks_output[1].description, "Write tides");
        assert_eq!(output.token_usage.successful_requests, 3);
        assert_eq!(output.token_usage.total_tokens, 45);

        let requests = llm.requests();
        assert!(requests[0].messages[0].content.contains("Plan tides"));
        assert!(!requests[0].messages[0].content.contains("context you're working with"));
        assert!(requests[1].messages[0].content.contains("the plan"));
        let third = &requests[2].messages[0].content;
        assert!(third.contains("the plan\n\n----------\n\nthe draft"));
        assert!(requests[2].system_prompt.as_deref().unwrap().contains("Editor on tides"));
    }

    #[tokio::test]
    async fn output_file_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(ScriptedClient::new().reply("Final Answer: # Title\n\nBody"));
        let editor = agent("Editor");
        let crew = Crew::new("test", llm)
            .with_output_dir(dir.path())
            .add_agent(editor.clone())
            .add_task(
                TaskDefinition::new("Edit", "post", editor).with_output_file("out/Final.txt"),
            );

        crew.kickoff(&Inputs::topic("x")).await.unwrap();

        let written = std::fs::read_to_string(dir.path().join("out/Final.txt")).unwrap();
        assert_eq!(written, "# Title\n\nBody");
    }

    #[tokio::test]
    async fn failing_task_stops_the_crew() {
        let llm = Arc::new(
            ScriptedClient::new()
                .reply("Final Answer: plan")
                .fail("OpenAI API error 503"),
        );
        let (a, b, c) = (agent("Planner"), agent("Writer"), agent("Editor"));
        let crew = Crew::new("test", llm.clone())
            .add_agent(a.clone())
            .add_agent(b.clone())
            .add_agent(c.clone())
            .add_task(TaskDefinition::new("Plan", "outline", a))
            .add_task(TaskDefinition::new("Write", "draft", b))
            .add_task(TaskDefinition::new("Edit", "post", c));

        let err = crew.kickoff(&Inputs::topic("x")).await.unwrap_err();

        assert!(err.to_string().contains("503"));
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn empty_crew_is_rejected() {
        let crew = Crew::new("empty", Arc::new(ScriptedClient::new()));
        let err = crew.kickoff(&Inputs::topic("x")).await.unwrap_err();
        assert!(matches!(err, ScribeError::Config(_)));
    }

    #[tokio::test]
    async fn task_agent_must_belong_to_crew() {
        let outsider = agent("Outsider");
        let crew = Crew::new("test", Arc::new(ScriptedClient::new()))
            .add_agent(agent("Planner"))
            .add_task(TaskDefinition::new("Plan", "outline", outsider));
        let err = crew.validate().unwrap_err();
        assert!(err.to_string().contains("Outsider"));
    }

    #[tokio::test]
    async fn missing_template_variable_fails_before_any_request() {
        let llm = Arc::new(ScriptedClient::new());
        let planner = agent("Planner");
        let crew = Crew::new("test", llm.clone())
            .add_agent(planner.clone())
            .add_task(TaskDefinition::new("Plan", "outline", planner));

        let err = crew.kickoff(&Inputs::new()).await.unwrap_err();

        assert!(!err.is_transient());
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn delegating_agent_gets_coworker_tool() {
        let llm = Arc::new(ScriptedClient::new().reply("Final Answer: done"));
        let lead = Arc::new(
            AgentDefinition::new("Lead", "Lead {topic}", "Leads.").allow_delegation(true),
        );
        let helper = agent("Helper");
        let crew = Crew::new("test", llm.clone())
            .add_agent(lead.clone())
            .add_agent(helper)
            .add_task(TaskDefinition::new("Lead it", "result", lead));

        crew.kickoff(&Inputs::topic("x")).await.unwrap();

        let system = llm.requests()[0].system_prompt.clone().unwrap();
        assert!(system.contains("Tool Name: Delegate work to coworker"));
        assert!(system.contains("Helper"));
    }

    #[tokio::test]
    async fn model_failure_inside_delegation_fails_the_task() {
        let llm = Arc::new(
            ScriptedClient::new()
                .reply(
                    "Action: Delegate work to coworker\n\
                     Action Input: {\"task\": \"Check facts\", \"coworker\": \"Helper\"}",
                )
                .fail("OpenAI API error 503")
                .reply("Final Answer: done anyway"),
        );
        let lead = Arc::new(
            AgentDefinition::new("Lead", "Lead {topic}", "Leads.").allow_delegation(true),
        );
        let crew = Crew::new("test", llm.clone())
            .add_agent(lead.clone())
            .add_agent(agent("Helper"))
            .add_task(TaskDefinition::new("Lead it", "result", lead));

        let err = crew.kickoff(&Inputs::topic("x")).await.unwrap_err();

        assert!(err.is_transient());
        assert!(err.to_string().contains("503"));
        assert_eq!(llm.call_count(), 2);
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<parking_lot::Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    async fn info_log_for_run(verbose: bool) -> String {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let planner = agent("Planner");
        let crew = Crew::new("test", Arc::new(ScriptedClient::new().reply("Final Answer: plan")))
            .add_agent(planner.clone())
            .add_task(TaskDefinition::new("Plan {topic}", "outline", planner))
            .verbose(verbose);
        crew.kickoff(&Inputs::topic("x")).await.unwrap();

        let bytes = buffer.0.lock().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[tokio::test]
    async fn verbose_crew_logs_task_steps_at_info() {
        let verbose = info_log_for_run(true).await;
        assert!(verbose.contains("Executing task"));
        assert!(verbose.contains("Task completed"));

        let quiet = info_log_for_run(false).await;
        assert!(quiet.contains("Starting crew"));
        assert!(!quiet.contains("Executing task"));
        assert!(!quiet.contains("Task completed"));
    }

    #[test]
    fn usage_metrics_saturate_instead_of_overflowing() {
        let mut metrics = UsageMetrics {
            prompt_tokens: u32::MAX - 1,
            completion_tokens: 0,
            total_tokens: u32::MAX - 1,
            successful_requests: u32::MAX,
        };
        let usage = TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 5,
        };
        metrics.add(usage, 1);

        assert_eq!(metrics.prompt_tokens, u32::MAX);
        assert_eq!(metrics.completion_tokens, 5);
        assert_eq!(metrics.total_tokens, u32::MAX);
        assert_eq!(metrics.successful_requests, u32::MAX);
    }

    #[test]
    fn empty_output_is_falsy() {
        let output = CrewOutput {
            raw: "  \n".into(),
            tasks_output: vec![],
            token_usage: UsageMetrics::default(),
            duration_ms: 0,
        };
        assert!(output.is_empty());
    }
}
