//! Question answering pipeline.
//!
//! Turns a natural-language question into executed SQL, either as a single
//! answer or as an ordered stream of events.
//!
//! # Pipeline
//!
//! schema snapshot → prompt → model → SQL extraction → normalization →
//! execution. Both modes share every stage; they differ only in how model
//! output and failures are delivered.
//!
//! # Streaming termination
//!
//! The streaming pipeline runs on its own task under a supervisor task. The
//! supervisor converts any failure, including a panic, into one `Error`
//! event and always sends `Done` last. When the client goes away the
//! supervisor aborts the pipeline so no further model or database work is
//! done for that request.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, BoxStream};
use futures::StreamExt;
use tokio::sync::mpsc;

use crate::db::{DatabaseClient, QueryResult};
use crate::error::{NlqError, Result};
use crate::llm::{build_messages, extract_sql, find_fenced_sql, LlmClient, Message};
use crate::query::{QueryExecutor, DEFAULT_QUERY_TIMEOUT};
use crate::safety::SqlNormalizer;

use super::events::{ChatAnswer, StreamEvent};

/// Default bound on a model call.
pub const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(60);

/// Events buffered between the pipeline and a slow client.
const STREAM_BUFFER: usize = 32;

/// Shared service answering questions against one database and one model.
pub struct ChatService {
    db: Arc<dyn DatabaseClient>,
    llm: Option<Arc<dyn LlmClient>>,
    missing_llm_reason: String,
    normalizer: SqlNormalizer,
    llm_timeout: Duration,
    query_timeout: Duration,
}

impl ChatService {
    /// Creates a service. `llm` is `None` when no model client could be built;
    /// questions then fail with a configuration error.
    pub fn new(db: Arc<dyn DatabaseClient>, llm: Option<Arc<dyn LlmClient>>) -> Self {
        Self {
            db,
            llm,
            missing_llm_reason: "LLM client not configured".to_string(),
            normalizer: SqlNormalizer::default(),
            llm_timeout: DEFAULT_LLM_TIMEOUT,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    /// Message reported when a question arrives without a model client.
    pub fn with_missing_llm_reason(mut self, reason: impl Into<String>) -> Self {
        self.missing_llm_reason = reason.into();
        self
    }

    pub fn with_normalizer(mut self, normalizer: SqlNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn with_llm_timeout(mut self, timeout: Duration) -> Self {
        self.llm_timeout = timeout;
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Checks that the database answers a trivial query.
    pub async fn health(&self) -> Result<()> {
        self.db.ping().await
    }

    /// Answers a question with a single result.
    pub async fn answer(&self, question: &str) -> Result<ChatAnswer> {
        let start = Instant::now();
        let llm = self.llm()?;
        let messages = self.prepare_messages(question).await?;

        let text = self
            .with_llm_timeout_applied(llm.complete(&messages))
            .await?;
        tracing::debug!(response_len = text.len(), "Received model response");

        let sql = self.finalize_sql(&text).await?;
        let result = self.run_query(&sql).await?;

        tracing::info!(
            total_duration_ms = start.elapsed().as_millis() as u64,
            rows = result.row_count,
            "Answered question"
        );
        Ok(ChatAnswer::new(sql, result))
    }

    /// Answers a question as a stream of events that always ends with `Done`.
    ///
    /// Dropping the returned stream cancels the remaining work.
    pub fn answer_stream(self: Arc<Self>, question: String) -> BoxStream<'static, StreamEvent> {
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        tokio::spawn(supervise(self, question, tx));

        stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        })
        .boxed()
    }

    fn llm(&self) -> Result<&Arc<dyn LlmClient>> {
        self.llm
            .as_ref()
            .ok_or_else(|| NlqError::config(self.missing_llm_reason.clone()))
    }

    /// Takes a fresh schema snapshot and builds the prompt from it.
    async fn prepare_messages(&self, question: &str) -> Result<Vec<Message>> {
        let schema = self.db.introspect_schema().await?;
        let messages = build_messages(&schema, question, self.db.backend().dialect());

        tracing::debug!(
            tables = schema.tables.len(),
            message_count = messages.len(),
            "Sending request to model"
        );
        Ok(messages)
    }

    async fn with_llm_timeout_applied<T>(
        &self,
        call: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        tokio::time::timeout(self.llm_timeout, call)
            .await
            .map_err(|_| {
                NlqError::llm(format!(
                    "Model request timed out after {}s",
                    self.llm_timeout.as_secs()
                ))
            })?
    }

    /// Extracts SQL from model output and normalizes it for execution.
    async fn finalize_sql(&self, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Err(NlqError::llm("Model returned an empty response"));
        }

        if find_fenced_sql(text).is_none() {
            tracing::debug!("No fenced SQL block in model output, using raw text");
        }
        let candidate = extract_sql(text);

        let known_tables = self.known_tables().await;
        let sql = self.normalizer.normalize(&candidate, &known_tables);
        tracing::debug!(sql_len = sql.len(), "Normalized SQL");
        Ok(sql)
    }

    /// Table names for quoting. Falls back to none, which only disables the
    /// table-name pass.
    async fn known_tables(&self) -> Vec<String> {
        match self.db.table_names().await {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!("Could not list tables, quoting without them: {e}");
                Vec::new()
            }
        }
    }

    async fn run_query(&self, sql: &str) -> Result<QueryResult> {
        QueryExecutor::new(self.db.as_ref(), self.query_timeout)
            .execute(sql)
            .await
    }

    /// Streaming pipeline body. Any error returned here is reported by the
    /// supervisor.
    async fn run_stream(&self, question: &str, tx: &mpsc::Sender<StreamEvent>) -> Result<()> {
        let llm = Arc::clone(self.llm()?);
        let messages = self.prepare_messages(question).await?;

        let text = self
            .with_llm_timeout_applied(forward_deltas(llm.as_ref(), &messages, tx))
            .await?;

        let sql = self.finalize_sql(&text).await?;
        emit(tx, StreamEvent::Sql(sql.clone())).await?;

        let result = self.run_query(&sql).await?;
        emit(tx, StreamEvent::result(result)).await
    }
}

/// Forwards every non-empty model chunk as a `Delta` and returns the full text.
async fn forward_deltas(
    llm: &dyn LlmClient,
    messages: &[Message],
    tx: &mpsc::Sender<StreamEvent>,
) -> Result<String> {
    let mut chunks = llm.complete_stream(messages).await?;
    let mut text = String::new();

    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        if chunk.is_empty() {
            continue;
        }
        text.push_str(&chunk);
        emit(tx, StreamEvent::Delta(chunk)).await?;
    }

    tracing::debug!(response_len = text.len(), "Model stream finished");
    Ok(text)
}

async fn emit(tx: &mpsc::Sender<StreamEvent>, event: StreamEvent) -> Result<()> {
    tx.send(event)
        .await
        .map_err(|_| NlqError::internal("Stream receiver dropped"))
}

/// Runs the streaming pipeline and guarantees the terminal events.
async fn supervise(service: Arc<ChatService>, question: String, tx: mpsc::Sender<StreamEvent>) {
    let pipeline_tx = tx.clone();
    let mut pipeline =
        tokio::spawn(async move { service.run_stream(&question, &pipeline_tx).await });

    let outcome = tokio::select! {
        joined = &mut pipeline => joined,
        _ = tx.closed() => {
            pipeline.abort();
            tracing::debug!("Client disconnected, cancelled streaming pipeline");
            return;
        }
    };

    let failure = match outcome {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(e.to_string()),
        Err(join_error) => {
            tracing::error!("Streaming pipeline task failed: {join_error}");
            Some(NlqError::internal("Streaming pipeline failed unexpectedly").to_string())
        }
    };

    if let Some(message) = failure {
        let _ = tx.send(StreamEvent::Error(message)).await;
    }
    let _ = tx.send(StreamEvent::Done).await;
}
