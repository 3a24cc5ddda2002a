//! Answer and stream event types produced by the chat pipeline.

use serde::Serialize;
use serde_json::json;

use crate::db::{QueryResult, Row};

/// Result of answering a question synchronously.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatAnswer {
    /// The statement that was executed, after normalization.
    pub sql: String,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl ChatAnswer {
    pub fn new(sql: impl Into<String>, result: QueryResult) -> Self {
        Self {
            sql: sql.into(),
            columns: result.column_names(),
            rows: result.rows,
        }
    }
}

/// One event of a streamed answer, in emission order.
///
/// A stream is zero or more `Delta`s, then either `Sql` followed by exactly
/// one `Result` or `Error`, or a lone `Error`; `Done` always comes last.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A fragment of model output, forwarded as soon as it arrives.
    Delta(String),
    /// The normalized statement about to be executed.
    Sql(String),
    /// Rows returned by the executed statement.
    Result { columns: Vec<String>, rows: Vec<Row> },
    /// A failure at any stage.
    Error(String),
    /// End of stream.
    Done,
}

impl StreamEvent {
    pub fn result(result: QueryResult) -> Self {
        Self::Result {
            columns: result.column_names(),
            rows: result.rows,
        }
    }

    /// Event name used on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Delta(_) => "delta",
            Self::Sql(_) => "sql",
            Self::Result { .. } => "result",
            Self::Error(_) => "error",
            Self::Done => "done",
        }
    }

    /// JSON payload sent as the event data.
    pub fn payload(&self) -> serde_json::Value {
        match self {
            Self::Delta(text) | Self::Sql(text) | Self::Error(text) => json!(text),
            Self::Result { columns, rows } => json!({ "columns": columns, "rows": rows }),
            Self::Done => json!({}),
        }
    }
}
