//! Web front end and JSON API for the scribe article generator.
//!
//! # Endpoints
//!
//! - `GET /` - The generator page
//! - `GET /health` - Health check
//! - `GET /api/v1/models` - Model choices and the default
//! - `POST /api/v1/status` - Whether the given keys are enough to generate
//! - `POST /api/v1/articles` - Run the blog crew for a topic
//! - `GET /api/v1/articles/{id}/download` - The cleaned article as `Final_Article.txt`
//!
//! # Limits
//!
//! - Per-IP sliding-window budget for generation requests
//! - Per-IP cap on generations running at once
//! - Request body size limit
//!
//! # Architecture
//!
//! ```text
//! Browser
//!    │
//!    ▼
//! ┌─────────────────┐
//! │   Scribe API    │ ◄── This crate
//! │     (Axum)      │
//! └────────┬────────┘
//!          │ retry (5 attempts)
//!          ▼
//! ┌─────────────────┐      ┌─────────────────┐
//! │    Blog Crew    │ ───▶ │ OpenAI / Serper │
//! │ plan→write→edit │      │  / web pages    │
//! └─────────────────┘      └─────────────────┘
//! ```

pub mod config;
pub mod extract;
pub mod factory;
pub mod generate;
pub mod rate_limit;
pub mod routes;
pub mod state;
pub mod store;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub use config::ServerConfig;
pub use factory::{BlogCrewFactory, PipelineFactory};
pub use generate::{GenerateRequest, Outcome, clean_article, generate_article};
pub use rate_limit::{ConcurrentGuard, RateLimitConfig, RateLimiter};
pub use state::AppState;
pub use store::ArticleStore;

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// Create the router with all routes configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);
    let body_limit = state.config.limits.max_body_bytes;

    Router::new()
        .route("/", get(routes::index))
        .route("/health", get(routes::health))
        .route("/api/v1/models", get(routes::models))
        .route("/api/v1/status", post(routes::status))
        .route("/api/v1/articles", post(routes::generate))
        .route("/api/v1/articles/{id}/download", get(routes::download))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve on an already bound listener. Client addresses are tracked for the
/// per-IP limits.
pub async fn serve_listener(
    state: Arc<AppState>,
    listener: tokio::net::TcpListener,
) -> anyhow::Result<()> {
    let router = create_router(state);

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Start the server on the given address.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "Starting scribe server");
    serve_listener(state, listener).await
}
