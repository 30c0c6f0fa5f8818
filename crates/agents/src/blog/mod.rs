//! The blog crew: a research planner, a writer and an editor working one
//! topic in sequence.
//!
//! All three tasks share the web search and scraping tools. The editor's
//! answer is the finished article.

mod editing;
mod planning;
mod writing;

use std::sync::Arc;

use scribe_common::Result;
use scribe_llm::LlmClient;

pub use editing::{EDITOR_ROLE, edit_task, editor};
pub use planning::{PLANNER_ROLE, plan_task, planner};
pub use writing::{WRITER_ROLE, write_task, writer};

use crate::crew::Crew;
use crate::tools::{ScrapeWebsiteTool, SerperDevTool, Tool, ToolSettings};

pub const BLOG_CREW_NAME: &str = "blog";

/// File name the edited article is saved under, relative to the crew's
/// output directory.
pub const FINAL_ARTICLE_FILE: &str = "Final_Article.txt";

/// Search and scrape tools, in that order.
pub fn blog_tools(serper_api_key: &str, settings: &ToolSettings) -> Result<Vec<Arc<dyn Tool>>> {
    let tools: Vec<Arc<dyn Tool>> = vec![
        Arc::new(SerperDevTool::new(serper_api_key, settings)?),
        Arc::new(ScrapeWebsiteTool::new(settings)?),
    ];
    Ok(tools)
}

/// Planner, writer and editor with the plan, write and edit tasks.
pub fn blog_crew(llm: Arc<dyn LlmClient>, tools: Vec<Arc<dyn Tool>>) -> Crew {
    let planner = Arc::new(planner());
    let writer = Arc::new(writer());
    let editor = Arc::new(editor());

    Crew::new(BLOG_CREW_NAME, llm)
        .add_agent(planner.clone())
        .add_agent(writer.clone())
        .add_agent(editor.clone())
        .add_task(plan_task(planner, tools.clone()))
        .add_task(write_task(writer, tools.clone()))
        .add_task(edit_task(editor, tools))
        .verbose(true)
}
