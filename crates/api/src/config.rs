//! Server configuration.
//!
//! # Security
//!
//! - Config file permission validation on Unix systems
//! - Rejects world-readable files that carry API keys
//! - Warns about API keys stored in config files

use std::path::{Path, PathBuf};
use std::time::Duration;

use scribe_agents::{ExecutorSettings, RetryPolicy, ToolSettings};
use scribe_common::{Credentials, ModelChoice};
use scribe_llm::LlmConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::rate_limit::RateLimitConfig;

pub const SERPER_API_KEY_ENV: &str = "SERPER_API_KEY";
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const OPENAI_MODEL_ENV: &str = "OPENAI_MODEL_NAME";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSection,

    /// Chat-completion endpoint settings
    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub retry: RetryPolicy,

    #[serde(default)]
    pub pipeline: PipelineSection,

    #[serde(default)]
    pub limits: LimitsSection,

    /// Used for any key the page leaves empty.
    #[serde(default)]
    pub credentials: Credentials,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins. Empty allows any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_bind() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    8501
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSection {
    /// Directory `Final_Article.txt` is written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default)]
    pub tools: ToolSettings,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            tools: ToolSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsSection {
    /// Generation requests allowed per client IP within `window_secs`
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Generations one client IP may have running at once
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: u32,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Articles kept for download; the oldest is dropped first
    #[serde(default = "default_max_articles")]
    pub max_articles: usize,
}

fn default_max_requests() -> u32 {
    10
}

fn default_window_secs() -> u64 {
    60
}

fn default_max_concurrent() -> u32 {
    1
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

fn default_max_articles() -> usize {
    100
}

impl Default for LimitsSection {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
            max_concurrent: default_max_concurrent(),
            max_body_bytes: default_max_body_bytes(),
            max_articles: default_max_articles(),
        }
    }
}

impl LimitsSection {
    pub fn rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            max_requests: self.max_requests,
            window: Duration::from_secs(self.window_secs),
            max_concurrent: self.max_concurrent,
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file.
    ///
    /// On Unix the file must be a regular file that is not world-writable,
    /// and it must not be world-readable if it stores an API key.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();

        #[cfg(unix)]
        let mode = validate_config_file_permissions(path)?;

        let config = Self::from_file_unchecked(path)?;
        let has_api_key =
            config.credentials.serper_api_key().is_some() || config.credentials.openai_api_key().is_some();

        if has_api_key {
            #[cfg(unix)]
            check_key_file_mode(path, mode)?;

            warn!(
                "API key found in config file '{}'. For better security, \
                 use environment variables instead ({}, {}).",
                path.display(),
                SERPER_API_KEY_ENV,
                OPENAI_API_KEY_ENV
            );
        }

        Ok(config)
    }

    /// Load configuration from a TOML file without permission checks.
    pub fn from_file_unchecked(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Fill credentials the file left empty from the process environment.
    pub fn with_env_fallbacks(self) -> Self {
        self.with_fallbacks_from(|name| std::env::var(name).ok())
    }

    /// Fill empty credentials from `lookup`. A model name that is not one of
    /// the offered choices is ignored with a warning.
    pub fn with_fallbacks_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let env = Credentials {
            serper_api_key: lookup(SERPER_API_KEY_ENV),
            openai_api_key: lookup(OPENAI_API_KEY_ENV),
            model: self.credentials.model,
        };
        self.credentials = self.credentials.with_fallback(&env);

        if let Some(name) = lookup(OPENAI_MODEL_ENV).filter(|n| !n.trim().is_empty()) {
            match name.parse::<ModelChoice>() {
                Ok(model) => self.credentials.model = model,
                Err(e) => warn!(error = %e, "Ignoring {}", OPENAI_MODEL_ENV),
            }
        }
        self
    }

    /// Sampling settings for every agent request.
    pub fn executor_settings(&self) -> ExecutorSettings {
        ExecutorSettings {
            temperature: self.llm.temperature,
            max_tokens: self.llm.max_tokens,
        }
    }
}

/// Validate the config file itself and return its permission bits.
#[cfg(unix)]
fn validate_config_file_permissions(path: &Path) -> anyhow::Result<u32> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = std::fs::symlink_metadata(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;

    if !metadata.is_file() {
        anyhow::bail!(
            "Config path '{}' is not a regular file. Symlinks and directories are not allowed.",
            path.display()
        );
    }

    let permission_bits = metadata.permissions().mode() & 0o777;

    if permission_bits & 0o002 != 0 {
        anyhow::bail!(
            "Config file '{}' is world-writable (mode {:04o}). \
             This is a security risk. Fix with: chmod o-w {}",
            path.display(),
            permission_bits,
            path.display()
        );
    }

    Ok(permission_bits)
}

#[cfg(unix)]
fn check_key_file_mode(path: &Path, permission_bits: u32) -> anyhow::Result<()> {
    if permission_bits & 0o004 != 0 {
        anyhow::bail!(
            "Config file '{}' contains an API key but is world-readable (mode {:04o}). \
             This is a security risk. Fix with: chmod 600 {}",
            path.display(),
            permission_bits,
            path.display()
        );
    }

    if permission_bits & 0o040 != 0 {
        warn!(
            "Config file '{}' contains an API key and is group-readable (mode {:04o}). \
             Consider restricting access with: chmod 600 {}",
            path.display(),
            permission_bits,
            path.display()
        );
    }

    Ok(())
}
