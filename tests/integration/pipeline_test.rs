//! Pipeline tests over a real SQLite database.
//!
//! These drive `ChatService` directly: schema snapshot, prompt, model,
//! extraction, normalization and execution, without the HTTP layer.

use std::sync::Arc;

use futures::StreamExt;
use nlq::chat::{ChatService, StreamEvent};
use nlq::db::Value;
use nlq::error::NlqError;
use nlq::llm::MockLlmClient;
use nlq::safety::SqlNormalizer;
use pretty_assertions::assert_eq;

use super::common::{seeded_service, seeded_sqlite};

#[tokio::test]
async fn test_lowercase_table_names_resolve_to_schema_spelling() {
    let llm = MockLlmClient::new().with_response(
        "unpaid",
        "```sql\nselect id, total from invoice where paid = 0 order by id\n```",
    );
    let service = seeded_service(llm).await;

    let answer = service.answer("Which invoices are unpaid?").await.unwrap();

    assert_eq!(
        answer.sql,
        r#"select id, total from "Invoice" where paid = 0 order by id LIMIT 200;"#
    );
    assert_eq!(answer.columns, vec!["id", "total"]);
    assert_eq!(
        answer.rows,
        vec![
            vec![Value::Int(2), Value::Float(79.5)],
            vec![Value::Int(3), Value::Float(80.0)],
        ]
    );
}

#[tokio::test]
async fn test_empty_result_keeps_columns() {
    let llm = MockLlmClient::new().with_response(
        "huge",
        "```sql\nSELECT id, name FROM Customer WHERE id > 1000\n```",
    );
    let service = seeded_service(llm).await;

    let answer = service.answer("Customers with huge ids").await.unwrap();

    assert_eq!(answer.columns, vec!["id", "name"]);
    assert!(answer.rows.is_empty());
}

#[tokio::test]
async fn test_existing_limit_is_kept() {
    let llm = MockLlmClient::new().with_response(
        "first",
        "```sql\nSELECT name FROM Customer ORDER BY id LIMIT 1;\n```",
    );
    let service = seeded_service(llm).await;

    let answer = service.answer("The first customer").await.unwrap();

    assert_eq!(answer.sql, r#"SELECT name FROM "Customer" ORDER BY id LIMIT 1;"#);
    assert_eq!(answer.rows, vec![vec![Value::String("Acme".to_string())]]);
}

#[tokio::test]
async fn test_row_limit_caps_results() {
    let service = seeded_service(MockLlmClient::new())
        .await
        .with_normalizer(SqlNormalizer::new(2));

    let answer = service.answer("Show every invoice").await.unwrap();

    assert_eq!(answer.sql, r#"SELECT * FROM "Invoice" LIMIT 2;"#);
    assert_eq!(answer.rows.len(), 2);
    assert_eq!(answer.columns, vec!["id", "customerId", "total", "paid"]);
}

#[tokio::test]
async fn test_nulls_and_literals_survive() {
    let llm = MockLlmClient::new().with_response(
        "country",
        "```sql\nSELECT name, country FROM Customer WHERE name <> 'FROM Customer' ORDER BY id\n```",
    );
    let service = seeded_service(llm).await;

    let answer = service.answer("Which country is each customer in?").await.unwrap();

    assert!(answer.sql.contains("'FROM Customer'"));
    assert_eq!(
        answer.rows,
        vec![
            vec![Value::String("Acme".to_string()), Value::String("US".to_string())],
            vec![Value::String("Globex".to_string()), Value::Null],
        ]
    );
}

#[tokio::test]
async fn test_execution_error_carries_attempted_sql() {
    let llm = MockLlmClient::new()
        .with_response("vendors", "```sql\nSELECT * FROM vendors\n```");
    let service = seeded_service(llm).await;

    let err = service.answer("List vendors").await.unwrap_err();

    assert_eq!(err.attempted_sql(), Some("SELECT * FROM vendors LIMIT 200;"));
    assert!(matches!(err, NlqError::Execution { .. }));
    assert!(err.detail().contains("no such table"));
}

#[tokio::test]
async fn test_stream_matches_sync_answer() {
    let service = Arc::new(seeded_service(MockLlmClient::new()).await);

    let sync = service.answer("How many invoices are there?").await.unwrap();
    let events: Vec<StreamEvent> = service
        .clone()
        .answer_stream("How many invoices are there?".to_string())
        .collect()
        .await;

    let tail = &events[events.len() - 3..];
    assert_eq!(tail[0], StreamEvent::Sql(sync.sql.clone()));
    assert_eq!(
        tail[1],
        StreamEvent::Result {
            columns: sync.columns.clone(),
            rows: sync.rows.clone(),
        }
    );
    assert_eq!(tail[2], StreamEvent::Done);
    assert_eq!(sync.rows, vec![vec![Value::Int(3)]]);
}

#[tokio::test]
async fn test_schema_changes_are_picked_up_per_question() {
    let db = seeded_sqlite().await;
    let llm = MockLlmClient::new()
        .with_response("vendors", "```sql\nSELECT COUNT(*) FROM Vendor\n```");
    let service = ChatService::new(db.clone(), Some(Arc::new(llm)));

    assert!(service.answer("Count vendors").await.is_err());

    db.execute_query(r#"CREATE TABLE "Vendor" (id INTEGER PRIMARY KEY)"#)
        .await
        .unwrap();
    let answer = service.answer("Count vendors").await.unwrap();

    assert_eq!(answer.sql, r#"SELECT COUNT(*) FROM "Vendor" LIMIT 200;"#);
    assert_eq!(answer.rows, vec![vec![Value::Int(0)]]);
}

#[tokio::test]
async fn test_demo_seed_script() {
    let seed = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/seed.sql");
    let db = nlq::app::connect_database(
        &nlq::config::DatabaseConfig::from_url("sqlite::memory:"),
        Some(&seed),
    )
    .await
    .unwrap();
    let service = ChatService::new(db, Some(Arc::new(MockLlmClient::new())));

    let customers = service.answer("How many customers are there?").await.unwrap();
    let invoices = service.answer("How many invoices are there?").await.unwrap();

    assert_eq!(customers.rows, vec![vec![Value::Int(3)]]);
    assert_eq!(invoices.rows, vec![vec![Value::Int(4)]]);
}
