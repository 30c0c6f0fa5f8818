//! Tools agents can call while working on a task.
//!
//! - **Search the internet**: Serper (Google) search results
//! - **Read website content**: fetch a page and reduce it to text
//! - **Delegate work to coworker**: ask another agent of the crew
//!
//! Arguments arrive as the JSON object the model wrote after
//! `Action Input:`; a bare JSON string is accepted for single-argument tools.

pub mod delegate;
pub mod scrape;
pub mod search;

use async_trait::async_trait;
use scribe_common::{Result, ScribeError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use delegate::DelegateWorkTool;
pub use scrape::ScrapeWebsiteTool;
pub use search::SerperDevTool;

#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the model uses in `Action:`.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Argument schema shown to the model.
    fn parameters(&self) -> Value;

    async fn call(&self, args: Value) -> Result<String>;
}

/// Settings shared by the search and scrape tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSettings {
    #[serde(default = "default_search_url")]
    pub search_url: String,
    #[serde(default = "default_search_results")]
    pub search_results: usize,
    #[serde(default = "default_scrape_max_chars")]
    pub scrape_max_chars: usize,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_search_url() -> String {
    search::DEFAULT_SEARCH_URL.to_string()
}

fn default_search_results() -> usize {
    10
}

fn default_scrape_max_chars() -> usize {
    20_000
}

fn default_request_timeout_ms() -> u64 {
    20_000
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            search_url: default_search_url(),
            search_results: default_search_results(),
            scrape_max_chars: default_scrape_max_chars(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Extract a string argument by key, or the whole value if it is a string.
pub(crate) fn string_arg(args: &Value, key: &str) -> Result<String> {
    let value = match args {
        Value::String(s) => Some(s.as_str()),
        Value::Object(map) => map.get(key).and_then(Value::as_str),
        _ => None,
    };
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ScribeError::Tool(format!("Missing required argument '{key}'")))
}

pub(crate) fn http_client(timeout_ms: u64, user_agent: Option<&str>) -> Result<reqwest::Client> {
    let mut builder =
        reqwest::Client::builder().timeout(std::time::Duration::from_millis(timeout_ms));
    if let Some(agent) = user_agent {
        builder = builder.user_agent(agent);
    }
    builder
        .build()
        .map_err(|e| ScribeError::Config(format!("Failed to build HTTP client: {e}")))
}
