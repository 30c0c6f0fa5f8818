use std::sync::Arc;

use crate::agent::AgentDefinition;
use crate::task::TaskDefinition;
use crate::tools::Tool;

use super::FINAL_ARTICLE_FILE;

pub const EDITOR_ROLE: &str = "Editor";

pub fn editor() -> AgentDefinition {
    AgentDefinition::new(
        EDITOR_ROLE,
        concat!(
            "Edit a given blog post to align with ",
            "the writing style of the organization. "
        ),
        concat!(
            "You are an editor who receives a blog post ",
            "from the Content Writer. ",
            "Your goal is to review the blog post ",
            "to ensure that it follows journalistic best practices,",
            "provides balanced viewpoints ",
            "when providing opinions or assertions, ",
            "and also avoids major controversial topics ",
            "or opinions when possible."
        ),
    )
    .allow_delegation(false)
    .verbose(true)
}

/// The final task; its answer is the article and is also saved to
/// [`FINAL_ARTICLE_FILE`].
pub fn edit_task(agent: Arc<AgentDefinition>, tools: Vec<Arc<dyn Tool>>) -> TaskDefinition {
    TaskDefinition::new(
        concat!(
            "Proofread the given blog post for ",
            "grammatical errors, checks plagiarism and ",
            "alignment with the brand's voice."
        ),
        concat!(
            "A well-written blog post, ",
            "ready for publication, ",
            "each section should have 2 or 3 paragraphs."
        ),
        agent,
    )
    .with_tools(tools)
    .with_output_file(FINAL_ARTICLE_FILE)
}
