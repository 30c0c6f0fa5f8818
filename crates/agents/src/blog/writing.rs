use std::sync::Arc;

use crate::agent::AgentDefinition;
use crate::task::TaskDefinition;
use crate::tools::Tool;

pub const WRITER_ROLE: &str = "Content Writer";

pub fn writer() -> AgentDefinition {
    AgentDefinition::new(
        WRITER_ROLE,
        concat!(
            "Write insightful and factually accurate ",
            "opinion piece about the topic: {topic}"
        ),
        concat!(
            "You're working on a writing ",
            "a new opinion piece about the topic: {topic}. ",
            "You base your writing on the work of ",
            "the Research & Content Planner, who provides an outline ",
            "and relevant context about the topic. ",
            "You follow the main objectives and ",
            "direction of the outline, ",
            "as provide by the Content Planner. ",
            "You also provide objective and impartial insights ",
            "and back them up with information ",
            "provide by the Content Planner. ",
            "You acknowledge in your opinion piece ",
            "when your statements are opinions ",
            "as opposed to objective statements."
        ),
    )
    .allow_delegation(false)
    .verbose(true)
}

pub fn write_task(agent: Arc<AgentDefinition>, tools: Vec<Arc<dyn Tool>>) -> TaskDefinition {
    TaskDefinition::new(
        concat!(
            "1. Use the content plan to craft a compelling ",
            "blog post on {topic}.\n",
            "2. Incorporate SEO keywords naturally.\n",
            "3. Sections/Subtitles are properly named ",
            "in an engaging manner.\n",
            "4. Adding necessary Hyperlinks and bolding for important sentances/words/statements.\n",
            "5. If required you can add comparision tables/table and data if it is necessary for the topic.\n",
            "6. Ensure the post is structured with an ",
            "engaging introduction, insightful body, ",
            "and a summarizing conclusion.\n",
            "7. Proofread for grammatical errors and ",
            "alignment with the brand's voice.\n"
        ),
        concat!(
            "A well-written blog post ",
            "in markdown format, ready for publication, ",
            "each section should have 2 or 3 paragraphs."
        ),
        agent,
    )
    .with_tools(tools)
}
