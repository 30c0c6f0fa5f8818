//! HTTP route handlers for the API.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json,
    extract::{ConnectInfo, Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use scribe_common::{ModelChoice, Readiness};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::AppState;
use crate::extract::JsonBody;
use crate::generate::{GenerateRequest, Outcome, generate_article};
use crate::rate_limit::{ConcurrentGuard, Rejection};

const INDEX_HTML: &str = include_str!("../static/index.html");

/// The single page.
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub running_generations: u32,
}

/// Health check endpoint.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.uptime_seconds(),
        running_generations: state.limiter.stats().running_generations,
    })
}

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<&'static str>,
    pub default: &'static str,
}

/// Model choices in picker order.
pub async fn models(State(state): State<Arc<AppState>>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: ModelChoice::ALL.iter().map(ModelChoice::as_str).collect(),
        default: state.config.credentials.model.as_str(),
    })
}

/// Whether the given keys (with server fallbacks) are enough to generate.
pub async fn status(
    State(state): State<Arc<AppState>>,
    JsonBody(request): JsonBody<GenerateRequest>,
) -> Json<Readiness> {
    Json(request.credentials(&state.config.credentials).readiness())
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    #[serde(flatten)]
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

fn rejected(rejection: Rejection) -> Response {
    match rejection {
        Rejection::TooManyRequests { retry_after } => {
            let secs = retry_after.as_secs().max(1);
            let mut response = (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({
                    "status": "rate_limited",
                    "message": format!("Too many requests. Try again in {secs} seconds."),
                })),
            )
                .into_response();
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
            response
        }
        Rejection::Busy => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "status": "busy",
                "message": "An article is already being generated. Wait for it to finish.",
            })),
        )
            .into_response(),
    }
}

/// Generate an article. Held open for the whole crew run.
pub async fn generate(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    JsonBody(request): JsonBody<GenerateRequest>,
) -> Response {
    let ip = addr.ip();

    if let Err(rejection) = state.limiter.check_request(ip) {
        warn!(%ip, ?rejection, "Generation rate limited");
        return rejected(rejection);
    }
    let _guard = match ConcurrentGuard::new(state.limiter.clone(), ip) {
        Ok(guard) => guard,
        Err(rejection) => {
            warn!(%ip, "Generation already running for client");
            return rejected(rejection);
        }
    };

    info!(
        %ip,
        topic_preview = %request.topic.chars().take(50).collect::<String>(),
        "Received generation request"
    );

    let credentials = request.credentials(&state.config.credentials);
    let outcome = generate_article(
        state.factory.as_ref(),
        &state.config.retry,
        &credentials,
        &request.topic,
    )
    .await;

    let status = outcome.status_code();
    let id = match &outcome {
        Outcome::Generated(article) => Some(state.articles.insert(article.article.as_str())),
        _ => None,
    };

    (
        status,
        Json(GenerateResponse {
            download_url: id.as_ref().map(|id| format!("/api/v1/articles/{id}/download")),
            id,
            outcome,
        }),
    )
        .into_response()
}

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

/// The cleaned article as a `Final_Article.txt` attachment.
pub async fn download(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    debug!(%id, "Article download");

    let Some(article) = state.articles.get(&id) else {
        return (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Article '{id}' not found"),
                code: "ARTICLE_NOT_FOUND",
            }),
        )
            .into_response();
    };

    (
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", scribe_agents::FINAL_ARTICLE_FILE),
            ),
        ],
        article.to_string(),
    )
        .into_response()
}
