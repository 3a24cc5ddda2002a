//! Shared fixtures for integration tests.

use std::sync::Arc;

use nlq::chat::ChatService;
use nlq::config::DatabaseConfig;
use nlq::db::{DatabaseClient, SqliteClient};
use nlq::llm::MockLlmClient;
use nlq::server::{create_router, serve, AppState};
use tokio::net::TcpListener;

/// Seed data shared by the SQLite-backed tests.
///
/// Mixed-case table and column names exercise identifier quoting.
pub const SEED_SQL: &str = r#"
CREATE TABLE "Customer" (id INTEGER PRIMARY KEY, name TEXT NOT NULL, country TEXT);
CREATE TABLE "Invoice" (
    id INTEGER PRIMARY KEY,
    "customerId" INTEGER NOT NULL REFERENCES "Customer"(id),
    total REAL NOT NULL,
    paid BOOLEAN NOT NULL
);
INSERT INTO "Customer" (id, name, country) VALUES (1, 'Acme', 'US'), (2, 'Globex', NULL);
INSERT INTO "Invoice" ("customerId", total, paid) VALUES (1, 120.5, 1), (1, 79.5, 0), (2, 80.0, 0);
"#;

/// Opens a fresh in-memory database loaded with `SEED_SQL`.
pub async fn seeded_sqlite() -> Arc<dyn DatabaseClient> {
    let client = SqliteClient::connect(&DatabaseConfig::from_url("sqlite::memory:"))
        .await
        .expect("open in-memory database");
    client.execute_batch(SEED_SQL).await.expect("seed database");
    Arc::new(client)
}

/// Chat service over the seeded database and the mock model.
pub async fn seeded_service(llm: MockLlmClient) -> ChatService {
    ChatService::new(seeded_sqlite().await, Some(Arc::new(llm)))
}

/// Starts the HTTP server on an ephemeral port and returns its base URL.
///
/// The server task runs until the test runtime shuts down.
pub async fn spawn_server(service: ChatService, cors_origins: &[String]) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let router = create_router(AppState::new(service), cors_origins);

    tokio::spawn(serve(listener, router, std::future::pending::<()>()));
    format!("http://{addr}")
}

/// Parses an SSE body into `(event, data)` pairs, skipping keep-alive comments.
pub fn parse_sse(body: &str) -> Vec<(String, serde_json::Value)> {
    body.split("\n\n")
        .filter_map(|block| {
            let mut name = None;
            let mut data = String::new();
            for line in block.lines() {
                if let Some(value) = line.strip_prefix("event:") {
                    name = Some(value.trim_start().to_string());
                } else if let Some(value) = line.strip_prefix("data:") {
                    data.push_str(value.strip_prefix(' ').unwrap_or(value));
                }
            }
            let name = name?;
            let data = serde_json::from_str(&data).expect("event data is JSON");
            Some((name, data))
        })
        .collect()
}

/// Event names in order of arrival.
pub fn event_names(events: &[(String, serde_json::Value)]) -> Vec<&str> {
    events.iter().map(|(name, _)| name.as_str()).collect()
}

/// Concatenates every `delta` payload.
pub fn joined_deltas(events: &[(String, serde_json::Value)]) -> String {
    events
        .iter()
        .filter(|(name, _)| name == "delta")
        .filter_map(|(_, data)| data.as_str())
        .collect()
}
