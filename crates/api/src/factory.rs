//! Builds a pipeline for one set of user credentials.

use std::path::PathBuf;
use std::sync::Arc;

use scribe_agents::{ExecutorSettings, Pipeline, ToolSettings, blog_crew, blog_tools};
use scribe_common::{Credentials, Result, ScribeError};
use scribe_llm::{LlmConfig, build_shared_llm_client};
use tokio::sync::Semaphore;
use tracing::debug;

use crate::config::ServerConfig;

pub trait PipelineFactory: Send + Sync {
    fn build(&self, credentials: &Credentials) -> Result<Box<dyn Pipeline>>;
}

/// The planner / writer / editor crew against OpenAI and Serper.
///
/// Every crew it builds shares one pool of model request permits.
#[derive(Debug, Clone)]
pub struct BlogCrewFactory {
    llm: LlmConfig,
    llm_permits: Arc<Semaphore>,
    tools: ToolSettings,
    executor: ExecutorSettings,
    output_dir: PathBuf,
}

impl BlogCrewFactory {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            llm: config.llm.clone(),
            llm_permits: config.llm.request_semaphore(),
            tools: config.pipeline.tools.clone(),
            executor: config.executor_settings(),
            output_dir: config.pipeline.output_dir.clone(),
        }
    }
}

impl PipelineFactory for BlogCrewFactory {
    fn build(&self, credentials: &Credentials) -> Result<Box<dyn Pipeline>> {
        let serper_key = credentials
            .serper_api_key()
            .ok_or_else(|| ScribeError::Config("Serper API key is required".into()))?;
        let openai_key = credentials
            .openai_api_key()
            .ok_or_else(|| ScribeError::Config("OpenAI API key is required".into()))?;

        let llm = build_shared_llm_client(
            &self.llm,
            credentials.model.as_str(),
            openai_key,
            self.llm_permits.clone(),
        )?;
        let tools = blog_tools(serper_key, &self.tools)?;

        debug!(model = %credentials.model, output_dir = %self.output_dir.display(), "Built blog crew");

        Ok(Box::new(
            blog_crew(llm, tools)
                .with_output_dir(&self.output_dir)
                .with_settings(self.executor.clone()),
        ))
    }
}
