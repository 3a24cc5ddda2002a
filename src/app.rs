//! Application wiring.
//!
//! Creates the long-lived database pool and model client, injects them into
//! the chat service, and runs the HTTP server until shutdown.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::chat::ChatService;
use crate::config::{Config, DatabaseConfig};
use crate::db::{self, DatabaseBackend, DatabaseClient, SqliteClient};
use crate::error::{NlqError, Result};
use crate::llm::{create_client, LlmClient};
use crate::safety::SqlNormalizer;
use crate::server::{self, AppState};

/// Builds the chat service from configuration.
///
/// A model client that cannot be created (missing API key, unknown provider)
/// is not fatal: the service starts and reports the reason on each question.
pub fn build_service(config: &Config, db: Arc<dyn DatabaseClient>) -> ChatService {
    let (llm, missing_reason): (Option<Arc<dyn LlmClient>>, Option<String>) =
        match create_client(&config.llm) {
            Ok(client) => {
                info!(
                    provider = %config.llm.provider,
                    model = %config.llm.model,
                    "LLM client ready"
                );
                (Some(Arc::from(client)), None)
            }
            Err(e) => {
                warn!("LLM client unavailable, questions will fail: {}", e.detail());
                (None, Some(e.detail().to_string()))
            }
        };

    let mut service = ChatService::new(db, llm)
        .with_normalizer(SqlNormalizer::new(config.query.row_limit))
        .with_llm_timeout(config.llm.timeout())
        .with_query_timeout(config.database.query_timeout());

    if let Some(reason) = missing_reason {
        service = service.with_missing_llm_reason(reason);
    }
    service
}

/// Connects to the configured database, optionally running a seed script.
///
/// Seeding is limited to SQLite, where it is used to stand up a local or
/// in-memory database.
pub async fn connect_database(
    config: &DatabaseConfig,
    seed: Option<&Path>,
) -> Result<Arc<dyn DatabaseClient>> {
    let Some(path) = seed else {
        return Ok(Arc::from(db::connect(config).await?));
    };

    let backend = config.url.as_deref().and_then(DatabaseBackend::from_url);
    if backend != Some(DatabaseBackend::Sqlite) {
        return Err(NlqError::config("--seed is only supported for sqlite databases"));
    }

    let sql = tokio::fs::read_to_string(path).await.map_err(|e| {
        NlqError::config(format!("Failed to read seed file {}: {e}", path.display()))
    })?;

    let client = SqliteClient::connect(config).await?;
    client.execute_batch(&sql).await?;
    info!(path = %path.display(), "Seeded database");

    Ok(Arc::new(client))
}

/// Validates configuration, connects, and serves until a shutdown signal.
///
/// The database pool is closed once the server has drained.
pub async fn run(config: Config, seed: Option<PathBuf>) -> Result<()> {
    config.validate()?;

    info!(database = %config.database.display_url(), "Connecting to database");
    let db = connect_database(&config.database, seed.as_deref()).await?;

    let service = build_service(&config, Arc::clone(&db));
    let router = server::create_router(AppState::new(service), &config.server.cors_origins);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| NlqError::config(format!("Failed to bind {addr}: {e}")))?;

    let served = server::serve(listener, router, server::shutdown_signal()).await;

    db.close().await?;
    info!("Database pool closed");

    served.map_err(|e| NlqError::internal(format!("Server error: {e}")))
}
