//! PostgreSQL tests.
//!
//! These tests require a running PostgreSQL database and are skipped unless
//! DATABASE_URL points at one. Each test creates and drops its own table.

use std::sync::Arc;

use nlq::chat::ChatService;
use nlq::config::DatabaseConfig;
use nlq::db::{DatabaseClient, PostgresClient, Value};
use nlq::llm::MockLlmClient;

fn get_test_database_url() -> Option<String> {
    std::env::var("DATABASE_URL")
        .ok()
        .filter(|url| url.starts_with("postgres://") || url.starts_with("postgresql://"))
}

async fn get_test_client() -> Option<Arc<PostgresClient>> {
    let url = get_test_database_url()?;
    let client = PostgresClient::connect(&DatabaseConfig::from_url(url))
        .await
        .expect("connect to DATABASE_URL");
    Some(Arc::new(client))
}

/// Table name unique to this process and test.
fn table_name(test: &str) -> String {
    format!("NlqOrder_{}_{}", test, std::process::id())
}

async fn create_orders(client: &PostgresClient, table: &str) {
    client
        .execute_query(&format!(
            r#"CREATE TABLE "{table}" (id SERIAL PRIMARY KEY, "orderTotal" DOUBLE PRECISION NOT NULL, note TEXT)"#
        ))
        .await
        .unwrap();
    client
        .execute_query(&format!(
            r#"INSERT INTO "{table}" ("orderTotal", note) VALUES (10.5, 'first'), (4.5, NULL)"#
        ))
        .await
        .unwrap();
}

async fn drop_orders(client: &PostgresClient, table: &str) {
    let _ = client
        .execute_query(&format!(r#"DROP TABLE IF EXISTS "{table}""#))
        .await;
}

#[tokio::test]
async fn test_introspects_mixed_case_table() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let table = table_name("schema");
    create_orders(&client, &table).await;

    let schema = client.introspect_schema().await.unwrap();
    let names = client.table_names().await.unwrap();
    drop_orders(&client, &table).await;

    assert!(names.contains(&table));
    let orders = schema.tables.iter().find(|t| t.name == table).unwrap();
    let columns: Vec<&str> = orders.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(columns, ["id", "orderTotal", "note"]);
}

/// Scenario: Model writes unquoted mixed-case names
///   Given a table "NlqOrder_..." with a column "orderTotal"
///   When the model refers to both without quotes and in lower case
///   Then normalization restores the spelling and the query runs
#[tokio::test]
async fn test_answer_quotes_mixed_case_identifiers() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let table = table_name("answer");
    create_orders(&client, &table).await;

    let response = format!(
        "```sql\nSELECT o.orderTotal, o.note FROM {} o ORDER BY o.id\n```",
        table.to_lowercase()
    );
    let llm = MockLlmClient::new().with_response("orders", response);
    let service = ChatService::new(client.clone(), Some(Arc::new(llm)));

    let answer = service.answer("List the orders").await;
    drop_orders(&client, &table).await;
    let answer = answer.unwrap();

    assert_eq!(
        answer.sql,
        format!(r#"SELECT o."orderTotal", o."note" FROM "{table}" o ORDER BY o."id" LIMIT 200;"#)
    );
    assert_eq!(answer.columns, vec!["orderTotal", "note"]);
    assert_eq!(
        answer.rows,
        vec![
            vec![Value::Float(10.5), Value::String("first".to_string())],
            vec![Value::Float(4.5), Value::Null],
        ]
    );
}

#[tokio::test]
async fn test_execution_error_from_postgres() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let llm = MockLlmClient::new()
        .with_response("missing", "```sql\nSELECT * FROM nlq_missing_table\n```");
    let service = ChatService::new(client, Some(Arc::new(llm)));

    let err = service.answer("Show the missing table").await.unwrap_err();

    assert_eq!(err.attempted_sql(), Some("SELECT * FROM nlq_missing_table LIMIT 200;"));
    assert!(err.detail().contains("does not exist"));
}

#[tokio::test]
async fn test_aggregates_and_dates_are_not_null() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = client
        .execute_query(
            "SELECT AVG(x), SUM(x::bigint), 12.50::numeric, DATE '2024-01-31', \
             now()::timestamp IS NOT NULL, date_trunc('month', TIMESTAMP '2024-03-05 10:00') \
             FROM (VALUES (1),(2)) v(x) LIMIT 200;",
        )
        .await
        .unwrap();

    assert_eq!(
        result.rows,
        vec![vec![
            Value::Float(1.5),
            Value::Int(3),
            Value::Float(12.5),
            Value::String("2024-01-31".to_string()),
            Value::Bool(true),
            Value::String("2024-03-01T00:00:00".to_string()),
        ]]
    );
}

#[tokio::test]
async fn test_time_json_and_uuid_render_as_text() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = client
        .execute_query(
            "SELECT TIME '10:30', TIMESTAMPTZ '2024-03-05 10:00+00', \
             '{\"a\": 1}'::jsonb, '{\"b\": [true]}'::json, \
             'a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11'::uuid, \
             1.0000000000000000000000001::numeric",
        )
        .await
        .unwrap();

    assert_eq!(
        result.rows,
        vec![vec![
            Value::String("10:30:00".to_string()),
            Value::String("2024-03-05T10:00:00+00:00".to_string()),
            Value::String(r#"{"a":1}"#.to_string()),
            Value::String(r#"{"b":[true]}"#.to_string()),
            Value::String("a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11".to_string()),
            Value::String("1.0000000000000000000000001".to_string()),
        ]]
    );
}
