//! Database abstraction layer.
//!
//! Provides a trait-based interface for database operations, allowing
//! different database backends to be used interchangeably.

mod mock;
mod postgres;
mod schema;
mod sqlite;
mod types;

pub use mock::{FailingDatabaseClient, MockDatabaseClient};
pub use postgres::PostgresClient;
pub use schema::{Column, Schema, Table};
pub use sqlite::SqliteClient;
pub use types::{ColumnInfo, QueryResult, Row, Value};

use crate::config::DatabaseConfig;
use crate::error::{NlqError, Result};
use async_trait::async_trait;
use std::future::Future;
use tracing::warn;

/// Supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DatabaseBackend {
    #[default]
    Postgres,
    Sqlite,
}

impl DatabaseBackend {
    /// Detects the backend from a connection URL scheme.
    pub fn from_url(url: &str) -> Option<Self> {
        let (scheme, _) = url.split_once(':')?;
        match scheme.to_lowercase().as_str() {
            "postgres" | "postgresql" => Some(Self::Postgres),
            "sqlite" => Some(Self::Sqlite),
            _ => None,
        }
    }

    /// Returns the SQL dialect name used when prompting the model.
    pub fn dialect(&self) -> &'static str {
        match self {
            Self::Postgres => "PostgreSQL",
            Self::Sqlite => "SQLite",
        }
    }
}

/// Creates a database client for the configured URL.
///
/// This is the central factory function for database connections.
pub async fn connect(config: &DatabaseConfig) -> Result<Box<dyn DatabaseClient>> {
    let url = config
        .url
        .as_deref()
        .ok_or_else(|| NlqError::config("DATABASE_URL not configured"))?;

    let backend = DatabaseBackend::from_url(url).ok_or_else(|| {
        NlqError::config(format!(
            "Unsupported database URL '{}'. Expected postgres:// or sqlite:",
            config.display_url()
        ))
    })?;

    match backend {
        DatabaseBackend::Postgres => Ok(Box::new(PostgresClient::connect(config).await?)),
        DatabaseBackend::Sqlite => Ok(Box::new(SqliteClient::connect(config).await?)),
    }
}

/// Builds a schema snapshot from the listed tables. A table whose columns
/// cannot be read is logged and left out; the rest of the snapshot survives.
pub(crate) async fn snapshot_tables<F, Fut>(names: Vec<String>, mut fetch_columns: F) -> Schema
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<Vec<Column>>>,
{
    let mut tables = Vec::with_capacity(names.len());

    for name in names {
        match fetch_columns(name.clone()).await {
            Ok(columns) => tables.push(Table { name, columns }),
            Err(e) => warn!(table = %name, "Skipping table in schema snapshot: {e}"),
        }
    }

    Schema { tables }
}

/// Trait defining the interface for database clients.
///
/// Implementations hold a connection pool and must be safe to share across
/// concurrent requests.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Returns which backend this client talks to.
    fn backend(&self) -> DatabaseBackend;

    /// Introspects the database schema, returning every user table and its columns.
    async fn introspect_schema(&self) -> Result<Schema>;

    /// Lists the names of all user tables, in the case the database stores them.
    async fn table_names(&self) -> Result<Vec<String>>;

    /// Executes a single SQL statement and materializes the full result.
    async fn execute_query(&self, sql: &str) -> Result<QueryResult>;

    /// Runs a trivial query to check the database is reachable.
    async fn ping(&self) -> Result<()>;

    /// Closes the connection pool.
    async fn close(&self) -> Result<()>;
}
