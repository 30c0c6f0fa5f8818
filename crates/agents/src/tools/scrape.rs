use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use scribe_common::{Result, ScribeError};
use serde_json::{Value, json};

use super::{Tool, ToolSettings, http_client, string_arg};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

static SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script[^>]*>.*?</script>").expect("valid regex"));
static STYLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style[^>]*>.*?</style>").expect("valid regex"));
static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));
static BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</?(p|div|br|li|h[1-6]|tr|section|article|header|footer)[^>]*>")
        .expect("valid regex")
});
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static SPACES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\r\f\v]+").expect("valid regex"));
static BLANK_LINES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n+").expect("valid regex"));

/// Fetches a web page and returns its readable text.
pub struct ScrapeWebsiteTool {
    max_chars: usize,
    http_client: reqwest::Client,
}

impl ScrapeWebsiteTool {
    pub fn new(settings: &ToolSettings) -> Result<Self> {
        Ok(Self {
            max_chars: settings.scrape_max_chars,
            http_client: http_client(settings.request_timeout_ms, Some(USER_AGENT))?,
        })
    }

    /// Reduce an HTML document to text: drop scripts, styles and comments,
    /// break lines at block elements, strip the remaining tags, decode the
    /// common entities and collapse whitespace.
    pub fn html_to_text(html: &str) -> String {
        let text = SCRIPT_RE.replace_all(html, "");
        let text = STYLE_RE.replace_all(&text, "");
        let text = COMMENT_RE.replace_all(&text, "");
        let text = BLOCK_RE.replace_all(&text, "\n");
        let text = TAG_RE.replace_all(&text, "");

        let text = text
            .replace("&nbsp;", " ")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#39;", "'")
            .replace("&amp;", "&");

        let text = SPACES_RE.replace_all(&text, " ");
        let text = BLANK_LINES_RE.replace_all(&text, "\n");
        text.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn truncate(&self, text: String) -> String {
        match text.char_indices().nth(self.max_chars) {
            Some((cut, _)) => format!("{}\n\n[content truncated]", &text[..cut]),
            None => text,
        }
    }
}

#[async_trait]
impl Tool for ScrapeWebsiteTool {
    fn name(&self) -> &str {
        "Read website content"
    }

    fn description(&self) -> &str {
        "Read the text content of a website given its URL."
    }

    fn parameters(&self) -> Value {
        json!({
            "website_url": {
                "type": "string",
                "description": "Mandatory website url to read the file"
            }
        })
    }

    async fn call(&self, args: Value) -> Result<String> {
        let url = string_arg(&args, "website_url")?;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ScribeError::Tool(format!(
                "Unsupported URL '{url}': only http and https are allowed"
            )));
        }

        let response = self
            .http_client
            .get(&url)
            .header("Accept", "text/html,application/xhtml+xml")
            .send()
            .await
            .map_err(|e| ScribeError::Tool(format!("Failed to fetch {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScribeError::Tool(format!("Fetching {url} returned {status}")));
        }

        let html = response
            .text()
            .await
            .map_err(|e| ScribeError::Tool(format!("Failed to read {url}: {e}")))?;

        Ok(self.truncate(Self::html_to_text(&html)))
    }
}
