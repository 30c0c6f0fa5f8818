//! One press of "Generate Article": checks, the retried crew run, and the
//! outcome shown to the user.

use axum::http::StatusCode;
use scribe_agents::{FINAL_ARTICLE_FILE, RetryPolicy, kickoff_with_retry};
use scribe_common::{Credentials, Inputs, MissingCredential, ModelChoice, Readiness};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::factory::PipelineFactory;

pub const EMPTY_TOPIC_WARNING: &str = "Please enter a topic before generating.";
pub const EMPTY_RESULT_MESSAGE: &str = "Failed to generate the article. Please try again.";
pub const DOWNLOAD_MIME: &str = "text/plain";

/// Marker some models leave in front of a fenced markdown answer.
const MARKDOWN_MARKER: &str = "markdown ```";

/// Body of `POST /api/v1/articles`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub serper_api_key: Option<String>,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub model: Option<ModelChoice>,
}

impl GenerateRequest {
    /// The request's credentials, with empty keys and an absent model taken
    /// from `defaults`.
    pub fn credentials(&self, defaults: &Credentials) -> Credentials {
        Credentials {
            serper_api_key: self.serper_api_key.clone(),
            openai_api_key: self.openai_api_key.clone(),
            model: self.model.unwrap_or(defaults.model),
        }
        .with_fallback(defaults)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedArticle {
    pub article: String,
    pub filename: &'static str,
    pub mime: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Credentials missing; nothing was run.
    Disabled {
        message: String,
        missing: Vec<MissingCredential>,
    },
    Warning { message: String },
    /// The pipeline raised.
    Error { message: String },
    /// The pipeline finished without text.
    Failure { message: String },
    Generated(GeneratedArticle),
}

impl Outcome {
    pub fn disabled(missing: Vec<MissingCredential>) -> Self {
        let labels = missing.iter().map(|m| m.label()).collect::<Vec<_>>();
        Outcome::Disabled {
            message: format!(
                "Enter your {} in the sidebar to enable article generation.",
                labels.join(" and ")
            ),
            missing,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Outcome::Disabled { .. } => StatusCode::PRECONDITION_FAILED,
            Outcome::Warning { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Outcome::Error { .. } | Outcome::Failure { .. } => StatusCode::BAD_GATEWAY,
            Outcome::Generated(_) => StatusCode::OK,
        }
    }
}

/// Trim, drop every `markdown ``` ` marker, trim again.
pub fn clean_article(raw: &str) -> String {
    raw.trim().replace(MARKDOWN_MARKER, "").trim().to_string()
}

/// Run the pipeline for `topic` and turn the result into an [`Outcome`].
///
/// Credentials are checked before the topic; neither check failing may
/// reach the factory.
pub async fn generate_article(
    factory: &dyn PipelineFactory,
    policy: &RetryPolicy,
    credentials: &Credentials,
    topic: &str,
) -> Outcome {
    if let Readiness::Disabled { missing } = credentials.readiness() {
        warn!(?missing, "Generation requested without credentials");
        return Outcome::disabled(missing);
    }

    if topic.is_empty() {
        return Outcome::Warning {
            message: EMPTY_TOPIC_WARNING.to_string(),
        };
    }

    let pipeline = match factory.build(credentials) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!(error = %e, "Failed to build pipeline");
            return Outcome::Error {
                message: format!("An error occurred: {e}"),
            };
        }
    };

    info!(topic = %topic, model = %credentials.model, "Generating article");

    match kickoff_with_retry(pipeline.as_ref(), &Inputs::topic(topic), policy).await {
        Ok(output) if output.is_empty() => {
            warn!(topic = %topic, "Pipeline returned no article");
            Outcome::Failure {
                message: EMPTY_RESULT_MESSAGE.to_string(),
            }
        }
        Ok(output) => {
            info!(
                topic = %topic,
                tokens = output.token_usage.total_tokens,
                duration_ms = output.duration_ms,
                "Article generated"
            );
            Outcome::Generated(GeneratedArticle {
                article: clean_article(&output.raw),
                filename: FINAL_ARTICLE_FILE,
                mime: DOWNLOAD_MIME,
            })
        }
        Err(e) => {
            error!(topic = %topic, error = %e, "Article generation failed");
            Outcome::Error {
                message: format!("An error occurred: {e}"),
            }
        }
    }
}
