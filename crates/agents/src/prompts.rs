//! Prompt text for the text-protocol agent loop.

use std::sync::Arc;

use crate::agent::AgentDefinition;
use crate::task::RenderedTask;
use crate::tools::Tool;

pub const FINAL_ANSWER_MARKER: &str = "Final Answer:";
pub const ACTION_MARKER: &str = "Action:";
pub const ACTION_INPUT_MARKER: &str = "Action Input:";
pub const OBSERVATION_MARKER: &str = "Observation:";

/// Stop sequence that keeps the model from inventing tool results.
pub const OBSERVATION_STOP: &str = "\nObservation:";

pub const FORMAT_REMINDER: &str = "Your last reply did not follow the required format. \
Either call one of the tools with `Action:` and `Action Input:` lines, or give your \
answer on a line starting with `Final Answer:`.";

pub const FORCE_FINAL_ANSWER: &str = "You have used all the tool calls available for \
this task. Do not call any more tools. Reply now with `Final Answer:` followed by the \
best complete answer you can give with the information gathered so far.";

pub fn system_prompt(agent: &AgentDefinition, tools: &[Arc<dyn Tool>]) -> String {
    let mut prompt = format!(
        "You are {}. {}\nYour personal goal is: {}\n",
        agent.role, agent.backstory, agent.goal
    );

    if tools.is_empty() {
        prompt.push_str(
            "\nRespond using exactly this format:\n\n\
             Thought: I now can give a great answer\n\
             Final Answer: your complete answer, covering everything the task asks for.\n",
        );
        return prompt;
    }

    prompt.push_str(
        "\nYou ONLY have access to the following tools and must never make up tools \
         that are not listed here:\n\n",
    );
    for tool in tools {
        prompt.push_str(&format!(
            "Tool Name: {}\nTool Arguments: {}\nTool Description: {}\n\n",
            tool.name(),
            tool.parameters(),
            tool.description()
        ));
    }

    let names = tools.iter().map(|t| t.name()).collect::<Vec<_>>().join(", ");
    prompt.push_str(&format!(
        "To use a tool, respond with:\n\n\
         Thought: what you should do next and why\n\
         Action: the tool to use, exactly one of [{names}]\n\
         Action Input: the tool arguments as a single JSON object\n\n\
         You will then receive the tool result as a message starting with `Observation:`. \
         Repeat as often as needed.\n\n\
         Once you have everything you need, respond with:\n\n\
         Thought: I now know the final answer\n\
         Final Answer: your complete answer\n"
    ));
    prompt
}

pub fn task_prompt(task: &RenderedTask, context: Option<&str>) -> String {
    let mut prompt = format!(
        "Current Task: {}\n\n\
         This is the expected criteria for your final answer: {}\n\
         You MUST return the actual complete content as the final answer, not a summary.\n",
        task.description, task.expected_output
    );
    if let Some(context) = context.filter(|c| !c.trim().is_empty()) {
        prompt.push_str(&format!(
            "\nThis is the context you're working with:\n{context}\n"
        ));
    }
    prompt.push_str("\nBegin! Give your best Final Answer.\n\nThought:");
    prompt
}
