use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use scribe_common::{Result, ScribeError};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::client::{LlmClient, LlmRequest, LlmResponse};
use crate::openai::OpenAiClient;

/// Connection settings for the chat-completion endpoint.
///
/// The model name and API key are not part of this struct: they arrive with
/// each user's credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
}

fn default_timeout_ms() -> u64 {
    120_000
}

fn default_max_concurrent() -> usize {
    2
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            temperature: None,
            max_tokens: None,
            timeout_ms: default_timeout_ms(),
            max_concurrent_requests: default_max_concurrent(),
        }
    }
}

impl LlmConfig {
    /// Permit pool for outbound model requests. Share one across every
    /// client built from this config.
    pub fn request_semaphore(&self) -> Arc<Semaphore> {
        Arc::new(Semaphore::new(self.max_concurrent_requests.max(1)))
    }
}

pub struct SemaphoredClient {
    inner: Arc<dyn LlmClient>,
    semaphore: Arc<Semaphore>,
}

impl SemaphoredClient {
    pub fn new(inner: Arc<dyn LlmClient>, max_concurrent: usize) -> Self {
        Self::with_semaphore(inner, Arc::new(Semaphore::new(max_concurrent.max(1))))
    }

    pub fn with_semaphore(inner: Arc<dyn LlmClient>, semaphore: Arc<Semaphore>) -> Self {
        Self { inner, semaphore }
    }
}

#[async_trait]
impl LlmClient for SemaphoredClient {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| ScribeError::Llm(format!("Semaphore acquire failed: {e}")))?;
        self.inner.complete(request).await
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

pub fn build_llm_client(
    config: &LlmConfig,
    model: &str,
    api_key: &str,
) -> Result<Arc<dyn LlmClient>> {
    build_shared_llm_client(config, model, api_key, config.request_semaphore())
}

/// Like [`build_llm_client`], but requests wait on the given permit pool.
pub fn build_shared_llm_client(
    config: &LlmConfig,
    model: &str,
    api_key: &str,
    semaphore: Arc<Semaphore>,
) -> Result<Arc<dyn LlmClient>> {
    if api_key.is_empty() {
        return Err(ScribeError::Config("OpenAI requires an API key".to_string()));
    }

    let base_client = OpenAiClient::with_timeout(
        config.api_url.clone(),
        model.to_string(),
        Some(api_key.to_string()),
        Duration::from_millis(config.timeout_ms),
    )?;

    let semaphored = SemaphoredClient::with_semaphore(Arc::new(base_client), semaphore);

    Ok(Arc::new(semaphored))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOML_CONFIG: &str = r#"
api_url = "http://localhost:11434"
temperature = 0.2
max_concurrent_requests = 4
timeout_ms = 5000
"#;

    #[test]
    fn deserialize_config_from_toml() {
        let config: LlmConfig = toml::from_str(TOML_CONFIG).unwrap();
        assert_eq!(config.api_url.as_deref(), Some("http://localhost:11434"));
        assert_eq!(config.temperature, Some(0.2));
        assert_eq!(config.max_concurrent_requests, 4);
        assert_eq!(config.timeout_ms, 5000);
        assert!(config.max_tokens.is_none());
    }

    #[test]
    fn deserialize_config_defaults() {
        let config: LlmConfig = toml::from_str("").unwrap();
        assert!(config.api_url.is_none());
        assert_eq!(config.max_concurrent_requests, 2);
        assert_eq!(config.timeout_ms, 120_000);
    }

    #[test]
    fn build_openai_client() {
        let client = build_llm_client(&LlmConfig::default(), "gpt-4", "sk-test").unwrap();
        assert_eq!(client.model_name(), "gpt-4");
    }

    #[test]
    fn build_without_key_fails() {
        let err = build_llm_client(&LlmConfig::default(), "gpt-4", "").err().unwrap();
        assert!(matches!(err, ScribeError::Config(_)));
    }

    #[tokio::test]
    async fn semaphored_client_limits_concurrency() {
        use std::sync::atomic::{AtomicU32, Ordering};

        struct CountingClient {
            concurrent: Arc<AtomicU32>,
            max_seen: Arc<AtomicU32>,
        }

        #[async_trait]
        impl LlmClient for CountingClient {
            async fn complete(&self, _request: LlmRequest) -> Result<LlmResponse> {
                let current = self.concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_seen.fetch_max(current, Ordering::SeqCst);
                tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
                self.concurrent.fetch_sub(1, Ordering::SeqCst);
                Ok(LlmResponse {
                    content: "ok".to_string(),
                    model: "test".to_string(),
                    usage: None,
                    finish_reason: None,
                })
            }
            fn model_name(&self) -> &str {
                "test"
            }
        }

        let concurrent = Arc::new(AtomicU32::new(0));
        let max_seen = Arc::new(AtomicU32::new(0));

        let inner = Arc::new(CountingClient {
            concurrent: concurrent.clone(),
            max_seen: max_seen.clone(),
        });

        let semaphored = Arc::new(SemaphoredClient::new(inner, 2));

        let mut handles = vec![];
        for _ in 0..6 {
            let client = semaphored.clone();
            handles.push(tokio::spawn(async move {
                client.complete(LlmRequest::default()).await.unwrap();
            }));
        }

        for h in handles {
            h.await.unwrap();
        }

        assert!(max_seen.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn clients_sharing_a_semaphore_limit_each_other() {
        use std::sync::atomic::{AtomicU32, Ordering};

        struct SlowClient {
            concurrent: Arc<AtomicU32>,
            max_seen: Arc<AtomicU32>,
        }

        #[async_trait]
        impl LlmClient for SlowClient {
            async fn complete(&self, _request: LlmRequest) -> Result<LlmResponse> {
                let current = self.concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_seen.fetch_max(current, Ordering::SeqCst);
                tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
                self.concurrent.fetch_sub(1, Ordering::SeqCst);
                Ok(LlmResponse {
                    content: "ok".to_string(),
                    model: "test".to_string(),
                    usage: None,
                    finish_reason: None,
                })
            }
            fn model_name(&self) -> &str {
                "test"
            }
        }

        let concurrent = Arc::new(AtomicU32::new(0));
        let max_seen = Arc::new(AtomicU32::new(0));
        let config = LlmConfig {
            max_concurrent_requests: 1,
            ..LlmConfig::default()
        };
        let semaphore = config.request_semaphore();

        let mut handles = vec![];
        for _ in 0..4 {
            let inner = Arc::new(SlowClient {
                concurrent: concurrent.clone(),
                max_seen: max_seen.clone(),
            });
            let client = SemaphoredClient::with_semaphore(inner, semaphore.clone());
            handles.push(tokio::spawn(async move {
                client.complete(LlmRequest::default()).await.unwrap();
            }));
        }

        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn shared_builder_holds_the_given_semaphore() {
        let config = LlmConfig::default();
        let semaphore = config.request_semaphore();
        let a = build_shared_llm_client(&config, "gpt-4", "sk-a", semaphore.clone()).unwrap();
        let b = build_shared_llm_client(&config, "gpt-4", "sk-b", semaphore.clone()).unwrap();
        assert_eq!(Arc::strong_count(&semaphore), 3);
        drop((a, b));
        assert_eq!(Arc::strong_count(&semaphore), 1);
    }
}
