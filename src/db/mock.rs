//! Mock database clients for testing.
//!
//! Provides in-memory implementations so the query pipeline can be exercised
//! without a database server.

use super::{snapshot_tables, DatabaseBackend, DatabaseClient, QueryResult, Schema};
use crate::error::{NlqError, Result};
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

/// A mock database client that returns a canned result for every query.
///
/// Executed statements are recorded so tests can assert on the SQL that
/// actually reached the database.
pub struct MockDatabaseClient {
    schema: Schema,
    result: QueryResult,
    failure: Option<String>,
    table_names_failure: Option<String>,
    unreadable: Vec<String>,
    executed: Mutex<Vec<String>>,
}

impl MockDatabaseClient {
    /// Creates a new mock database client with an empty schema.
    pub fn new() -> Self {
        Self {
            schema: Schema::default(),
            result: QueryResult::new(),
            failure: None,
            table_names_failure: None,
            unreadable: Vec::new(),
            executed: Mutex::new(Vec::new()),
        }
    }

    /// Creates a new mock database client with the given schema.
    pub fn with_schema(schema: Schema) -> Self {
        Self {
            schema,
            ..Self::new()
        }
    }

    /// Sets the result returned by `execute_query`.
    pub fn with_result(mut self, result: QueryResult) -> Self {
        self.result = result;
        self
    }

    /// Makes `execute_query` fail with the given database message.
    pub fn with_query_error(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Makes `table_names` fail with the given message.
    pub fn with_table_names_error(mut self, message: impl Into<String>) -> Self {
        self.table_names_failure = Some(message.into());
        self
    }

    /// Makes reading the columns of `table` fail during introspection.
    pub fn with_unreadable_table(mut self, table: impl Into<String>) -> Self {
        self.unreadable.push(table.into());
        self
    }

    /// Returns every statement passed to `execute_query`, oldest first.
    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl Default for MockDatabaseClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Postgres
    }

    async fn introspect_schema(&self) -> Result<Schema> {
        let names = self.schema.table_names();
        Ok(snapshot_tables(names, |name| async move {
            if self.unreadable.contains(&name) {
                return Err(NlqError::query(format!("permission denied for table {name}")));
            }
            Ok(self
                .schema
                .tables
                .iter()
                .find(|t| t.name == name)
                .map(|t| t.columns.clone())
                .unwrap_or_default())
        })
        .await)
    }

    async fn table_names(&self) -> Result<Vec<String>> {
        match &self.table_names_failure {
            Some(message) => Err(NlqError::query(message.clone())),
            None => Ok(self.schema.table_names()),
        }
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(sql.to_string());
        }

        match &self.failure {
            Some(message) => Err(NlqError::query(message.clone())),
            None => Ok(self
                .result
                .clone()
                .with_execution_time(Duration::from_millis(1))),
        }
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// A database client whose every operation fails, as if the server were down.
#[derive(Debug, Clone)]
pub struct FailingDatabaseClient {
    message: String,
}

impl FailingDatabaseClient {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Default for FailingDatabaseClient {
    fn default() -> Self {
        Self::new("connection refused")
    }
}

#[async_trait]
impl DatabaseClient for FailingDatabaseClient {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Postgres
    }

    async fn introspect_schema(&self) -> Result<Schema> {
        Err(NlqError::connection(self.message.clone()))
    }

    async fn table_names(&self) -> Result<Vec<String>> {
        Err(NlqError::connection(self.message.clone()))
    }

    async fn execute_query(&self, _sql: &str) -> Result<QueryResult> {
        Err(NlqError::connection(self.message.clone()))
    }

    async fn ping(&self) -> Result<()> {
        Err(NlqError::connection(self.message.clone()))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
