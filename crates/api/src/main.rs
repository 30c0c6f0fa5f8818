//! scribe server binary.
//!
//! Usage:
//!   scribe
//!   scribe --config scribe.toml
//!   scribe --port 8080 --bind 0.0.0.0
//!
//! # Environment Variables
//!
//! - `SERPER_API_KEY` - Serper key used when the page leaves it empty
//! - `OPENAI_API_KEY` - OpenAI key used when the page leaves it empty
//! - `OPENAI_MODEL_NAME` - Default model choice
//! - `SCRIBE_CONFIG`, `SCRIBE_BIND_ADDR`, `SCRIBE_PORT` - Same as the flags

use clap::Parser;
use scribe_api::{AppState, ServerConfig, serve};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "scribe", version, about = "AI-powered blog content generator")]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long, env = "SCRIBE_CONFIG")]
    config: Option<PathBuf>,

    /// Bind address (default: 127.0.0.1)
    #[arg(short, long, env = "SCRIBE_BIND_ADDR")]
    bind: Option<String>,

    /// Port to listen on (default: 8501)
    #[arg(short, long, env = "SCRIBE_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,scribe_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = if let Some(path) = &args.config {
        tracing::info!(path = %path.display(), "Loading configuration");
        ServerConfig::from_file(path)?
    } else {
        tracing::info!("Using default configuration");
        ServerConfig::default()
    };
    config = config.with_env_fallbacks();

    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    if config.server.bind == "0.0.0.0" {
        tracing::warn!(
            "Server binding to 0.0.0.0. This exposes the generator, and any server-side \
             API keys, to all network interfaces."
        );
    }

    match config.credentials.readiness() {
        scribe_common::Readiness::Ready => {
            tracing::info!(model = %config.credentials.model, "Server-side API keys configured")
        }
        scribe_common::Readiness::Disabled { missing } => tracing::info!(
            ?missing,
            "No server-side API keys for some services; the page must supply them"
        ),
    }

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    serve(Arc::new(AppState::new(config)), addr).await?;

    Ok(())
}
