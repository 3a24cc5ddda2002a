//! Execution of normalized SQL.
//!
//! Runs one statement against the shared database client and turns every
//! failure into an execution error that carries the attempted SQL.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::db::{DatabaseClient, QueryResult};
use crate::error::{NlqError, Result};

/// Default bound on statement execution time.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Query executor bound to a database client.
pub struct QueryExecutor<'a> {
    db: &'a dyn DatabaseClient,
    timeout: Duration,
}

impl<'a> QueryExecutor<'a> {
    /// Creates a new query executor.
    pub fn new(db: &'a dyn DatabaseClient, timeout: Duration) -> Self {
        Self { db, timeout }
    }

    /// Executes `sql` once and materializes the full result.
    ///
    /// Database errors and timeouts become `NlqError::Execution`. Nothing is
    /// retried. The pooled connection is held only for the duration of the
    /// call and is returned on every exit path.
    pub async fn execute(&self, sql: &str) -> Result<QueryResult> {
        let start = Instant::now();
        debug!(sql_len = sql.len(), "Executing generated SQL");

        let outcome = tokio::time::timeout(self.timeout, self.db.execute_query(sql)).await;
        let elapsed = start.elapsed();

        match outcome {
            Ok(Ok(result)) => {
                info!(
                    rows = result.row_count,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Query executed"
                );
                Ok(result)
            }
            Ok(Err(e)) => {
                debug!(elapsed_ms = elapsed.as_millis() as u64, "Query failed: {e}");
                Err(NlqError::execution(sql, e.detail()))
            }
            Err(_) => Err(NlqError::execution(
                sql,
                format!("Query timed out after {}s", self.timeout.as_secs()),
            )),
        }
    }
}
