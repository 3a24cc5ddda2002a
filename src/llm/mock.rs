//! Mock LLM clients for testing.
//!
//! Provides deterministic responses based on the question in the prompt.

use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use futures::StreamExt;

use crate::error::{NlqError, Result};
use crate::llm::types::{Message, Role};
use crate::llm::LlmClient;

/// Mock LLM client that returns canned responses based on input patterns.
///
/// Matching runs against the `Question:` line of the user prompt when there is
/// one, so table names in the schema block do not trigger patterns.
#[derive(Debug, Clone, Default)]
pub struct MockLlmClient {
    /// Custom response mappings (pattern -> response).
    custom_responses: Vec<(String, String)>,
}

impl MockLlmClient {
    /// Creates a new mock client with default responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a custom response mapping.
    ///
    /// When the question contains `pattern`, the mock will return `response`.
    pub fn with_response(
        mut self,
        pattern: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        self.custom_responses.push((pattern.into(), response.into()));
        self
    }

    fn mock_response(&self, question: &str) -> String {
        let question = question.to_lowercase();

        for (pattern, response) in &self.custom_responses {
            if question.contains(&pattern.to_lowercase()) {
                return response.clone();
            }
        }

        let counting = question.contains("how many") || question.contains("count");

        if counting && question.contains("customer") {
            return "Here is the query:\n```sql\nSELECT COUNT(*) FROM Customer\n```".to_string();
        }

        if counting && question.contains("invoice") {
            return "```sql\nSELECT COUNT(*) FROM Invoice;\n```".to_string();
        }

        if question.contains("total") && question.contains("customer") {
            return "```sql\nSELECT c.name, SUM(i.total) AS total\nFROM Invoice i\nJOIN Customer c ON c.id = i.customerId\nGROUP BY c.name\nORDER BY total DESC\n```".to_string();
        }

        if question.contains("invoice") {
            return "```sql\nSELECT * FROM Invoice;\n```".to_string();
        }

        if question.contains("customer") {
            return "```sql\nSELECT * FROM Customer;\n```".to_string();
        }

        "I don't understand that question. Could you please rephrase it?".to_string()
    }

    /// Extracts the question from the last user message.
    fn extract_question(messages: &[Message]) -> String {
        let content = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        content
            .lines()
            .find_map(|line| line.strip_prefix("Question:"))
            .unwrap_or(content)
            .trim()
            .to_string()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        let question = Self::extract_question(messages);
        Ok(self.mock_response(&question))
    }

    async fn complete_stream(
        &self,
        messages: &[Message],
    ) -> Result<BoxStream<'static, Result<String>>> {
        let response = self.complete(messages).await?;

        // Simulate streaming by yielding chunks
        let chunks: Vec<String> = response
            .chars()
            .collect::<Vec<_>>()
            .chunks(10)
            .map(|c| c.iter().collect())
            .collect();

        Ok(stream::iter(chunks.into_iter().map(Ok)).boxed())
    }
}

/// LLM client that always fails, optionally after emitting some stream chunks.
#[derive(Debug, Clone)]
pub struct FailingLlmClient {
    message: String,
    chunks_before_failure: Vec<String>,
}

impl FailingLlmClient {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            chunks_before_failure: Vec::new(),
        }
    }

    /// Streams the given chunks successfully before the error is raised.
    pub fn after_chunks(mut self, chunks: &[&str]) -> Self {
        self.chunks_before_failure = chunks.iter().map(|c| c.to_string()).collect();
        self
    }
}

#[async_trait]
impl LlmClient for FailingLlmClient {
    async fn complete(&self, _messages: &[Message]) -> Result<String> {
        Err(NlqError::llm(self.message.clone()))
    }

    async fn complete_stream(
        &self,
        _messages: &[Message],
    ) -> Result<BoxStream<'static, Result<String>>> {
        if self.chunks_before_failure.is_empty() {
            return Err(NlqError::llm(self.message.clone()));
        }

        let items = self
            .chunks_before_failure
            .clone()
            .into_iter()
            .map(Ok)
            .chain(std::iter::once(Err(NlqError::llm(self.message.clone()))));
        Ok(stream::iter(items).boxed())
    }
}
