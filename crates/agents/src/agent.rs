//! Agent definitions: the persona each pipeline stage runs under.

use scribe_common::{Inputs, Result, interpolate};
use serde::{Deserialize, Serialize};

fn default_max_iterations() -> usize {
    15
}

/// A configured persona. Goal and backstory (and the role itself) may carry
/// `{placeholder}` templates that are filled in at kickoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDefinition {
    pub role: String,
    pub goal: String,
    pub backstory: String,
    /// Whether the agent may hand sub-questions to its coworkers.
    #[serde(default)]
    pub allow_delegation: bool,
    /// Log thoughts and tool calls at `info` instead of `debug`.
    #[serde(default)]
    pub verbose: bool,
    /// Tool-use rounds before the agent is forced to answer.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

impl AgentDefinition {
    pub fn new(
        role: impl Into<String>,
        goal: impl Into<String>,
        backstory: impl Into<String>,
    ) -> Self {
        Self {
            role: role.into(),
            goal: goal.into(),
            backstory: backstory.into(),
            allow_delegation: false,
            verbose: false,
            max_iterations: default_max_iterations(),
        }
    }

    pub fn allow_delegation(mut self, value: bool) -> Self {
        self.allow_delegation = value;
        self
    }

    pub fn verbose(mut self, value: bool) -> Self {
        self.verbose = value;
        self
    }

    pub fn max_iterations(mut self, value: usize) -> Self {
        self.max_iterations = value;
        self
    }

    /// A copy with every template field interpolated.
    pub fn render(&self, inputs: &Inputs) -> Result<Self> {
        Ok(Self {
            role: interpolate(&self.role, inputs)?,
            goal: interpolate(&self.goal, inputs)?,
            backstory: interpolate(&self.backstory, inputs)?,
            ..self.clone()
        })
    }
}
