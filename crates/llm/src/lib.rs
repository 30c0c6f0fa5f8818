pub mod client;
pub mod config;
pub mod mock;
pub mod openai;

pub use client::{ChatMessage, LlmClient, LlmRequest, LlmResponse, Role, TokenUsage};
pub use config::{LlmConfig, SemaphoredClient, build_llm_client, build_shared_llm_client};
pub use mock::ScriptedClient;
pub use openai::OpenAiClient;
