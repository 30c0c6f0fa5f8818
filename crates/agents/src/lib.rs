//! Agents, tasks and crews for generating blog posts.
//!
//! A crew runs its tasks one after another, each task handled by one agent
//! that may call tools through a Thought / Action / Observation loop:
//!
//! - **Research & Content Planner**: researches the topic and outlines the post
//! - **Content Writer**: drafts the post from the outline
//! - **Editor**: proofreads the draft into the final article
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                       BLOG CREW                          │
//! ├──────────────────────────────────────────────────────────┤
//! │                                                          │
//! │  ┌─────────┐  plan   ┌─────────┐  draft  ┌─────────┐     │
//! │  │ Planner │ ──────▶ │ Writer  │ ──────▶ │ Editor  │ ──▶ article
//! │  └────┬────┘         └────┬────┘         └────┬────┘     │
//! │       │                   │                   │          │
//! │       ▼                   ▼                   ▼          │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │      Serper search  ·  website scraping            │  │
//! │  └────────────────────────────────────────────────────┘  │
//! │                                                          │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod agent;
pub mod blog;
pub mod crew;
pub mod executor;
pub mod prompts;
pub mod retry;
pub mod task;
pub mod tools;

pub use agent::AgentDefinition;
pub use blog::{FINAL_ARTICLE_FILE, blog_crew, blog_tools};
pub use crew::{Crew, CrewOutput, Pipeline, UsageMetrics};
pub use executor::{AgentExecutor, Execution, ExecutorSettings};
pub use retry::{RetryPolicy, kickoff_with_retry};
pub use task::{RenderedTask, TaskDefinition, TaskOutput};
pub use tools::{DelegateWorkTool, ScrapeWebsiteTool, SerperDevTool, Tool, ToolSettings};
