//! OpenAI-compatible chat-completions client.
//!
//! Implements the LlmClient trait for OpenAI and for providers that expose
//! the same wire format (Groq).

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{NlqError, Result};
use crate::llm::types::Message;
use crate::llm::{LlmClient, LlmProvider};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// OpenAI chat-completions endpoint.
pub const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Groq's OpenAI-compatible chat-completions endpoint.
pub const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Maximum number of retry attempts for transient errors.
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base delay for exponential backoff (milliseconds).
const RETRY_BASE_DELAY_MS: u64 = 500;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Which provider this endpoint belongs to; used in error messages.
    pub provider: LlmProvider,
    pub api_key: String,
    pub model: String,
    /// Full chat-completions URL.
    pub base_url: String,
    pub temperature: f32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl OpenAiConfig {
    /// Creates a config for OpenAI with the given API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: LlmProvider::OpenAi,
            api_key: api_key.into(),
            model: model.into(),
            base_url: OPENAI_API_URL.to_string(),
            temperature: 0.1,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Creates a config for Groq with the given API key and model.
    pub fn groq(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: LlmProvider::Groq,
            base_url: GROQ_API_URL.to_string(),
            ..Self::new(api_key, model)
        }
    }

    /// Points the client at a different endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// OpenAI-compatible LLM client.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiClient {
    /// Creates a new client with the given configuration.
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NlqError::llm(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    fn build_request(&self, messages: &[Message], stream: bool) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: Self::convert_messages(messages),
            temperature: self.config.temperature,
            stream,
        }
    }

    /// Converts internal messages to the wire format.
    fn convert_messages(messages: &[Message]) -> Vec<WireMessage> {
        messages
            .iter()
            .map(|m| WireMessage {
                role: m.role.as_str().to_string(),
                content: Some(m.content.clone()),
            })
            .collect()
    }

    async fn send(&self, request: &ChatRequest) -> reqwest::Result<reqwest::Response> {
        self.client
            .post(&self.config.base_url)
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await
    }

    /// Parses an API error response and returns (error, is_retryable).
    fn parse_error(
        provider: LlmProvider,
        status: reqwest::StatusCode,
        body: &str,
    ) -> (NlqError, bool) {
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return (
                NlqError::llm(format!(
                    "Authentication failed. Check your {}.",
                    provider.api_key_env()
                )),
                false,
            );
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return (
                NlqError::llm("Rate limited by the model provider. Please wait and try again."),
                true,
            );
        }

        let is_retryable = status.is_server_error();

        if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(body) {
            return (
                NlqError::llm(format!("{provider} API error: {}", error_response.error.message)),
                is_retryable,
            );
        }

        (
            NlqError::llm(format!("{provider} API error ({status}): {body}")),
            is_retryable,
        )
    }

    fn map_request_error(&self, e: &reqwest::Error) -> NlqError {
        if e.is_timeout() {
            NlqError::llm("Model request timed out")
        } else if e.is_connect() {
            NlqError::llm(format!(
                "Failed to connect to the {} API. Check your network.",
                self.config.provider
            ))
        } else {
            NlqError::llm(format!("Request failed: {e}"))
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        let request = self.build_request(messages, false);

        let mut last_error = None;
        let mut delay = Duration::from_millis(RETRY_BASE_DELAY_MS);

        for attempt in 1..=MAX_RETRY_ATTEMPTS {
            debug!(
                provider = %self.config.provider,
                model = %self.config.model,
                "Chat completion attempt {} of {}",
                attempt,
                MAX_RETRY_ATTEMPTS
            );

            let is_retryable = match self.send(&request).await {
                Ok(response) => {
                    let status = response.status();
                    let body = response
                        .text()
                        .await
                        .map_err(|e| NlqError::llm(format!("Failed to read response: {e}")))?;

                    if status.is_success() {
                        let response: ChatResponse = serde_json::from_str(&body).map_err(|e| {
                            NlqError::llm(format!("Failed to parse response: {e}"))
                        })?;

                        return response
                            .choices
                            .into_iter()
                            .next()
                            .map(|c| c.message.content.unwrap_or_default())
                            .ok_or_else(|| NlqError::llm("Model returned no choices"));
                    }

                    let (error, is_retryable) =
                        Self::parse_error(self.config.provider, status, &body);
                    last_error = Some(error);
                    is_retryable
                }
                Err(e) => {
                    last_error = Some(self.map_request_error(&e));
                    e.is_timeout() || e.is_connect()
                }
            };

            if !is_retryable || attempt >= MAX_RETRY_ATTEMPTS {
                break;
            }

            warn!(
                "Chat completion failed (attempt {}), retrying in {:?}",
                attempt, delay
            );
            tokio::time::sleep(delay).await;
            delay *= 2;
        }

        Err(last_error.unwrap_or_else(|| NlqError::llm("Model request was not attempted")))
    }

    async fn complete_stream(
        &self,
        messages: &[Message],
    ) -> Result<BoxStream<'static, Result<String>>> {
        let request = self.build_request(messages, true);

        let response = self
            .send(&request)
            .await
            .map_err(|e| self.map_request_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let (error, _) = Self::parse_error(self.config.provider, status, &body);
            return Err(error);
        }

        let mut decoder = SseDecoder::default();
        let parsed_stream = response
            .bytes_stream()
            .map(move |chunk| {
                chunk
                    .map_err(|e| NlqError::llm(format!("Stream error: {e}")))
                    .map(|bytes| decoder.feed(&bytes))
            })
            .filter_map(|result| async move {
                match result {
                    Ok(Some(content)) => Some(Ok(content)),
                    Ok(None) => None,
                    Err(e) => Some(Err(e)),
                }
            });

        Ok(parsed_stream.boxed())
    }
}

/// Incremental decoder for the chat-completions event stream.
///
/// Network chunks do not align with SSE lines, so bytes are buffered until a
/// full line is available.
#[derive(Debug, Default)]
struct SseDecoder {
    buffer: Vec<u8>,
    finished: bool,
}

impl SseDecoder {
    /// Consumes a network chunk and returns the delta text it completed, if any.
    fn feed(&mut self, bytes: &[u8]) -> Option<String> {
        if self.finished {
            return None;
        }
        self.buffer.extend_from_slice(bytes);

        let mut content = String::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim();

            if line.is_empty() || line.starts_with(':') {
                continue;
            }

            let Some(data) = line.strip_prefix("data:").map(str::trim_start) else {
                continue;
            };

            if data == "[DONE]" {
                self.finished = true;
                self.buffer.clear();
                break;
            }

            match serde_json::from_str::<StreamEvent>(data) {
                Ok(event) => {
                    let delta = event.choices.into_iter().next().and_then(|c| c.delta.content);
                    if let Some(delta) = delta {
                        content.push_str(&delta);
                    }
                }
                Err(e) => debug!("Ignoring unparseable stream line: {e}"),
            }
        }

        (!content.is_empty()).then_some(content)
    }
}

// Wire types

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
struct StreamEvent {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: Delta,
}

#[derive(Debug, Deserialize)]
struct Delta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}
