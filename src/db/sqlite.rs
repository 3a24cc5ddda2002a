//! SQLite database client implementation.
//!
//! Mirrors `PostgresClient` for local files and in-memory databases
//! (`sqlite::memory:`), which makes the whole pipeline runnable without a
//! database server.

use crate::config::DatabaseConfig;
use crate::db::{
    snapshot_tables, Column, ColumnInfo, DatabaseBackend, DatabaseClient, QueryResult, Row,
    Schema, Value,
};
use crate::error::{NlqError, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column as SqlxColumn, Executor, Row as SqlxRow, Statement, TypeInfo, ValueRef};
use std::time::Instant;
use tracing::debug;

/// SQLite database client.
#[derive(Debug, Clone)]
pub struct SqliteClient {
    pool: SqlitePool,
}

impl SqliteClient {
    /// Opens the configured database.
    ///
    /// In-memory databases live inside a single connection, so the pool is
    /// pinned to one connection that is never recycled.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| NlqError::config("DATABASE_URL not configured"))?;

        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let mut options = SqlitePoolOptions::new().acquire_timeout(config.acquire_timeout());
        options = if in_memory {
            options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            options.max_connections(config.max_connections)
        };

        let pool = options
            .connect(url)
            .await
            .map_err(|e| NlqError::connection(format!("Cannot open {url}: {e}")))?;

        debug!(in_memory, "Opened SQLite database");
        Ok(Self { pool })
    }

    /// Runs a batch of statements, e.g. to seed an in-memory database.
    pub async fn execute_batch(&self, sql: &str) -> Result<()> {
        sqlx::raw_sql(sql)
            .execute(&self.pool)
            .await
            .map_err(|e| NlqError::query(format!("Failed to run batch: {e}")))?;
        Ok(())
    }

    async fn fetch_table_names(&self) -> Result<Vec<String>> {
        sqlx::query_scalar(
            r#"
            SELECT name
            FROM sqlite_master
            WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| NlqError::query(format!("Failed to fetch tables: {e}")))
    }

    async fn fetch_columns(&self, table_name: &str) -> Result<Vec<Column>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT name, type
            FROM pragma_table_info(?1)
            ORDER BY cid
            "#,
        )
        .bind(table_name)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| NlqError::query(format!("Failed to fetch columns for {table_name}: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|(name, data_type)| Column { name, data_type })
            .collect())
    }
}

#[async_trait]
impl DatabaseClient for SqliteClient {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Sqlite
    }

    async fn introspect_schema(&self) -> Result<Schema> {
        let table_names = self.fetch_table_names().await?;
        Ok(snapshot_tables(table_names, |name| async move {
            self.fetch_columns(&name).await
        })
        .await)
    }

    async fn table_names(&self) -> Result<Vec<String>> {
        self.fetch_table_names().await
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        let start = Instant::now();

        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| NlqError::connection(format!("Failed to acquire connection: {e}")))?;

        let rows: Vec<SqliteRow> = sqlx::query(sql)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| NlqError::query(e.to_string()))?;

        let execution_time = start.elapsed();

        let columns: Vec<ColumnInfo> = match rows.first() {
            Some(first_row) => first_row
                .columns()
                .iter()
                .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
                .collect(),
            None => match (&mut *conn).prepare(sql).await {
                Ok(statement) => statement
                    .columns()
                    .iter()
                    .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
                    .collect(),
                Err(e) => {
                    debug!("Could not describe empty result: {e}");
                    Vec::new()
                }
            },
        };

        let rows: Vec<Row> = rows.iter().map(convert_row).collect();
        let row_count = rows.len();

        Ok(QueryResult {
            columns,
            rows,
            execution_time,
            row_count,
        })
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| NlqError::query(format!("Health check failed: {e}")))?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

fn convert_row(row: &SqliteRow) -> Row {
    (0..row.columns().len())
        .map(|i| convert_value(row, i))
        .collect()
}

/// Decodes by the stored value's runtime type, since SQLite columns are
/// dynamically typed and expressions carry no declared type. Booleans are
/// stored as integers and come back as `Value::Int`.
fn convert_value(row: &SqliteRow, index: usize) -> Value {
    let type_name = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_uppercase(),
        Err(_) => return Value::Null,
    };

    match type_name.as_str() {
        "INTEGER" | "INT8" | "BIGINT" => row
            .try_get_unchecked::<i64, _>(index)
            .map(Value::Int)
            .unwrap_or(Value::Null),

        "REAL" | "FLOAT" | "DOUBLE" => row
            .try_get_unchecked::<f64, _>(index)
            .map(Value::Float)
            .unwrap_or(Value::Null),

        "BLOB" => row
            .try_get_unchecked::<Vec<u8>, _>(index)
            .map(Value::Bytes)
            .unwrap_or(Value::Null),

        _ => row
            .try_get_unchecked::<String, _>(index)
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}
