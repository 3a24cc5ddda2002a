//! LLM client factory.
//!
//! Centralizes provider-specific logic for creating LLM clients.

use crate::config::LlmConfig;
use crate::error::{NlqError, Result};
use crate::llm::{LlmClient, LlmProvider, MockLlmClient, OpenAiClient, OpenAiConfig};

/// Creates an LLM client for the configured provider.
///
/// For providers that require an API key, the key is resolved in order:
/// 1. `llm.api_key` (config file, `--api-key` or `LLM_API_KEY`)
/// 2. The provider's environment variable (`GROQ_API_KEY` or `OPENAI_API_KEY`)
pub fn create_client(config: &LlmConfig) -> Result<Box<dyn LlmClient>> {
    create_client_with(config, |name| std::env::var(name).ok())
}

/// Same as `create_client`, reading environment variables through `lookup`.
fn create_client_with(
    config: &LlmConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Box<dyn LlmClient>> {
    let provider: LlmProvider = config.provider.parse().map_err(NlqError::config)?;

    if !provider.requires_api_key() {
        return Ok(Box::new(MockLlmClient::new()));
    }

    let key = config
        .api_key
        .clone()
        .filter(|k| !k.is_empty())
        .or_else(|| lookup(provider.api_key_env()).filter(|k| !k.is_empty()))
        .ok_or_else(|| NlqError::config(format!("{} not configured", provider.api_key_env())))?;

    let mut client_config = match provider {
        LlmProvider::OpenAi => OpenAiConfig::new(key, &config.model),
        _ => OpenAiConfig::groq(key, &config.model),
    }
    .with_temperature(config.temperature)
    .with_timeout(config.timeout_secs);

    if let Some(base_url) = &config.base_url {
        client_config = client_config.with_base_url(base_url);
    }

    Ok(Box::new(OpenAiClient::new(client_config)?))
}
