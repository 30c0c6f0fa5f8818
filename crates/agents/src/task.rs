//! Task definitions and their outputs.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use scribe_common::{Inputs, Result, interpolate};
use serde::Serialize;

use crate::agent::AgentDefinition;
use crate::tools::Tool;

/// A unit of work bound to one agent.
#[derive(Clone)]
pub struct TaskDefinition {
    pub description: String,
    pub expected_output: String,
    pub tools: Vec<Arc<dyn Tool>>,
    pub agent: Arc<AgentDefinition>,
    /// Where the task's final answer is persisted. Relative paths resolve
    /// against the crew's output directory.
    pub output_file: Option<PathBuf>,
}

impl TaskDefinition {
    pub fn new(
        description: impl Into<String>,
        expected_output: impl Into<String>,
        agent: Arc<AgentDefinition>,
    ) -> Self {
        Self {
            description: description.into(),
            expected_output: expected_output.into(),
            tools: Vec::new(),
            agent,
            output_file: None,
        }
    }

    pub fn with_tools(mut self, tools: Vec<Arc<dyn Tool>>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_file = Some(path.into());
        self
    }

    /// Description and expected output with templates filled in.
    pub fn render(&self, inputs: &Inputs) -> Result<RenderedTask> {
        Ok(RenderedTask {
            description: interpolate(&self.description, inputs)?,
            expected_output: interpolate(&self.expected_output, inputs)?,
        })
    }
}

impl fmt::Debug for TaskDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDefinition")
            .field("description", &self.description)
            .field("expected_output", &self.expected_output)
            .field(
                "tools",
                &self.tools.iter().map(|t| t.name().to_string()).collect::<Vec<_>>(),
            )
            .field("agent", &self.agent.role)
            .field("output_file", &self.output_file)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTask {
    pub description: String,
    pub expected_output: String,
}

/// What one task produced.
#[derive(Debug, Clone, Serialize)]
pub struct TaskOutput {
    pub description: String,
    /// Role of the agent that produced it.
    pub agent: String,
    pub raw: String,
    /// Model round-trips spent on the task.
    pub iterations: usize,
    pub tool_calls: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_fills_description_template() {
        let agent = Arc::new(AgentDefinition::new("Planner", "Plan", "Plans"));
        let task = TaskDefinition::new("Research {topic}.", "An outline.", agent)
            .with_output_file("out.txt");

        let rendered = task.render(&Inputs::topic("solar power")).unwrap();

        assert_eq!(rendered.description, "Research solar power.");
        assert_eq!(rendered.expected_output, "An outline.");
        assert_eq!(task.output_file, Some(PathBuf::from("out.txt")));
    }

    #[test]
    fn debug_lists_agent_role() {
        let agent = Arc::new(AgentDefinition::new("Planner", "Plan", "Plans"));
        let task = TaskDefinition::new("Research", "An outline.", agent);
        assert!(format!("{task:?}").contains("Planner"));
    }
}
