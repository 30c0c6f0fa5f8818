//! Application state for the API server.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::factory::{BlogCrewFactory, PipelineFactory};
use crate::rate_limit::RateLimiter;
use crate::store::ArticleStore;

/// Shared application state for the API server.
pub struct AppState {
    pub config: ServerConfig,

    /// Builds a fresh pipeline for each generation request
    pub factory: Arc<dyn PipelineFactory>,

    /// Cleaned articles served by the download route
    pub articles: ArticleStore,

    pub limiter: Arc<RateLimiter>,

    /// Server start time (for health checks)
    pub start_time: std::time::Instant,
}

impl AppState {
    /// State that generates with the blog crew.
    pub fn new(config: ServerConfig) -> Self {
        let factory = Arc::new(BlogCrewFactory::new(&config));
        Self::with_factory(config, factory)
    }

    pub fn with_factory(config: ServerConfig, factory: Arc<dyn PipelineFactory>) -> Self {
        Self {
            articles: ArticleStore::new(config.limits.max_articles),
            limiter: Arc::new(RateLimiter::new(config.limits.rate_limit_config())),
            factory,
            config,
            start_time: std::time::Instant::now(),
        }
    }

    /// Get the uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
