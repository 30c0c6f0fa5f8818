use async_trait::async_trait;
use scribe_common::{Result, ScribeError};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{Tool, ToolSettings, http_client, string_arg};

pub const DEFAULT_SEARCH_URL: &str = "https://google.serper.dev/search";

#[derive(Serialize)]
struct SerperRequest<'a> {
    q: &'a str,
    num: usize,
}

#[derive(Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<SerperResult>,
}

#[derive(Deserialize)]
struct SerperResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

/// Web search through the Serper API.
pub struct SerperDevTool {
    api_key: String,
    search_url: String,
    num_results: usize,
    http_client: reqwest::Client,
}

impl SerperDevTool {
    pub fn new(api_key: impl Into<String>, settings: &ToolSettings) -> Result<Self> {
        Ok(Self {
            api_key: api_key.into(),
            search_url: settings.search_url.clone(),
            num_results: settings.search_results.max(1),
            http_client: http_client(settings.request_timeout_ms, None)?,
        })
    }

    fn format_results(results: &[SerperResult]) -> String {
        if results.is_empty() {
            return "No results found.".to_string();
        }

        results
            .iter()
            .map(|r| format!("Title: {}\nLink: {}\nSnippet: {}", r.title, r.link, r.snippet))
            .collect::<Vec<_>>()
            .join("\n---\n")
    }
}

#[async_trait]
impl Tool for SerperDevTool {
    fn name(&self) -> &str {
        "Search the internet"
    }

    fn description(&self) -> &str {
        "Search the internet with a query and return the top results (title, link, snippet)."
    }

    fn parameters(&self) -> Value {
        json!({
            "search_query": {
                "type": "string",
                "description": "Mandatory search query you want to use to search the internet"
            }
        })
    }

    async fn call(&self, args: Value) -> Result<String> {
        let query = string_arg(&args, "search_query")?;

        let response = self
            .http_client
            .post(&self.search_url)
            .header("X-API-KEY", &self.api_key)
            .json(&SerperRequest {
                q: &query,
                num: self.num_results,
            })
            .send()
            .await
            .map_err(|e| ScribeError::Tool(format!("Search request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScribeError::Tool(format!("Search API error {status}: {body}")));
        }

        let parsed: SerperResponse = response
            .json()
            .await
            .map_err(|e| ScribeError::Tool(format!("Failed to parse search response: {e}")))?;

        let results: Vec<_> = parsed.organic.into_iter().take(self.num_results).collect();
        Ok(format!(
            "Search results for '{query}':\n\n{}",
            Self::format_results(&results)
        ))
    }
}
