//! End-to-end HTTP tests.
//!
//! Each test starts the router on an ephemeral port over an in-memory SQLite
//! database and talks to it with a real HTTP client.

use std::sync::Arc;

use nlq::chat::ChatService;
use nlq::db::FailingDatabaseClient;
use nlq::llm::{FailingLlmClient, MockLlmClient};
use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use serde_json::{json, Value};

use super::common::{event_names, joined_deltas, parse_sse, seeded_service, seeded_sqlite, spawn_server};

fn any_origin() -> Vec<String> {
    vec!["*".to_string()]
}

/// Scenario: Health check against a reachable database
///   Given the server is running over a working database
///   When GET /health is requested
///   Then the response is 200 with {"ok": true}
#[tokio::test]
async fn test_health_ok() {
    let base = spawn_server(seeded_service(MockLlmClient::new()).await, &any_origin()).await;

    let resp = reqwest::get(format!("{base}/health")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.json::<Value>().await.unwrap(), json!({ "ok": true }));
}

/// Scenario: Health check against an unreachable database
///   Given every database call fails with "connection refused"
///   When GET /health is requested
///   Then the response is 500 and carries the failure message
#[tokio::test]
async fn test_health_reports_database_failure() {
    let service = ChatService::new(
        Arc::new(FailingDatabaseClient::new("connection refused")),
        Some(Arc::new(MockLlmClient::new())),
    );
    let base = spawn_server(service, &any_origin()).await;

    let resp = reqwest::get(format!("{base}/health")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        resp.json::<Value>().await.unwrap(),
        json!({ "error": "connection refused" })
    );
}

/// Scenario: Counting customers
///   Given a database with two customers
///   When POST /chat asks "How many customers are there?"
///   Then the normalized SQL, its column and the count come back
#[tokio::test]
async fn test_chat_answers_question() {
    let base = spawn_server(seeded_service(MockLlmClient::new()).await, &any_origin()).await;

    let resp = reqwest::Client::new()
        .post(format!("{base}/chat"))
        .json(&json!({ "question": "How many customers are there?" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.json::<Value>().await.unwrap(),
        json!({
            "sql": "SELECT COUNT(*) FROM \"Customer\" LIMIT 200;",
            "columns": ["COUNT(*)"],
            "rows": [[2]],
        })
    );
}

/// Scenario: Joined query over mixed-case columns
///   Given invoices referencing customers through "customerId"
///   When the model writes the join with unquoted identifiers
///   Then quoting makes it run and totals come back per customer
#[tokio::test]
async fn test_chat_join_with_mixed_case_columns() {
    let base = spawn_server(seeded_service(MockLlmClient::new()).await, &any_origin()).await;

    let resp = reqwest::Client::new()
        .post(format!("{base}/chat"))
        .json(&json!({ "question": "What is the total invoiced per customer?" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert!(body["sql"].as_str().unwrap().contains(r#"i."customerId""#));
    assert_eq!(body["columns"], json!(["name", "total"]));
    assert_eq!(body["rows"], json!([["Acme", 200.0], ["Globex", 80.0]]));
}

/// Scenario: Model output that is not SQL
///   Given the model answers with prose only
///   When POST /chat is requested
///   Then the response is 400 with the attempted SQL and the database error
#[tokio::test]
async fn test_chat_execution_error_is_bad_request() {
    let base = spawn_server(seeded_service(MockLlmClient::new()).await, &any_origin()).await;

    let resp = reqwest::Client::new()
        .post(format!("{base}/chat"))
        .json(&json!({ "question": "What is the meaning of life?" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body["sql"],
        "I don't understand that question. Could you please rephrase it? LIMIT 200;"
    );
    assert!(!body["error"].as_str().unwrap().is_empty());
}

/// Scenario: No model configured
///   Given the service started without an API key
///   When POST /chat is requested
///   Then the response is 500 naming the missing key
#[tokio::test]
async fn test_chat_without_llm_is_server_error() {
    let service = ChatService::new(seeded_sqlite().await, None)
        .with_missing_llm_reason("GROQ_API_KEY not configured");
    let base = spawn_server(service, &any_origin()).await;

    let resp = reqwest::Client::new()
        .post(format!("{base}/chat"))
        .json(&json!({ "question": "How many customers are there?" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        resp.json::<Value>().await.unwrap(),
        json!({ "error": "GROQ_API_KEY not configured" })
    );
}

#[tokio::test]
async fn test_chat_rejects_missing_question() {
    let base = spawn_server(seeded_service(MockLlmClient::new()).await, &any_origin()).await;

    let resp = reqwest::Client::new()
        .post(format!("{base}/chat"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();

    assert!(resp.status().is_client_error());
}

/// Scenario: Streaming a successful answer
///   Given a database with two customers
///   When GET /chat-stream asks to count them
///   Then deltas spell the model output, then sql, result and done follow
#[tokio::test]
async fn test_chat_stream_success() {
    let base = spawn_server(seeded_service(MockLlmClient::new()).await, &any_origin()).await;

    let resp = reqwest::Client::new()
        .get(format!("{base}/chat-stream"))
        .query(&[("question", "How many customers are there?")])
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));

    let events = parse_sse(&resp.text().await.unwrap());
    let names = event_names(&events);
    let tail = &names[names.len() - 3..];

    assert!(names[..names.len() - 3].iter().all(|n| *n == "delta"));
    assert_eq!(tail, ["sql", "result", "done"]);
    assert_eq!(
        joined_deltas(&events),
        "Here is the query:\n```sql\nSELECT COUNT(*) FROM Customer\n```"
    );

    let (_, sql) = &events[events.len() - 3];
    assert_eq!(sql, &json!("SELECT COUNT(*) FROM \"Customer\" LIMIT 200;"));
    let (_, result) = &events[events.len() - 2];
    assert_eq!(result, &json!({ "columns": ["COUNT(*)"], "rows": [[2]] }));
    let (_, done) = &events[events.len() - 1];
    assert_eq!(done, &json!({}));
}

/// Scenario: Streaming when execution fails
///   Given the model answers with prose only
///   When GET /chat-stream is requested
///   Then sql is followed by a single error and done
#[tokio::test]
async fn test_chat_stream_execution_error() {
    let base = spawn_server(seeded_service(MockLlmClient::new()).await, &any_origin()).await;

    let resp = reqwest::Client::new()
        .get(format!("{base}/chat-stream"))
        .query(&[("question", "What is the meaning of life?")])
        .send()
        .await
        .unwrap();

    let events = parse_sse(&resp.text().await.unwrap());
    let names = event_names(&events);

    assert_eq!(&names[names.len() - 3..], ["sql", "error", "done"]);
    assert_eq!(names.iter().filter(|n| **n == "error").count(), 1);
    assert!(!names.contains(&"result"));
}

/// Scenario: Model stream fails midway
///   Given the model emits two chunks and then errors
///   When GET /chat-stream is requested
///   Then both deltas arrive, then one error, then done, and no sql
#[tokio::test]
async fn test_chat_stream_model_failure() {
    let llm = FailingLlmClient::new("upstream closed").after_chunks(&["SELECT ", "1"]);
    let service = ChatService::new(seeded_sqlite().await, Some(Arc::new(llm)));
    let base = spawn_server(service, &any_origin()).await;

    let resp = reqwest::Client::new()
        .get(format!("{base}/chat-stream"))
        .query(&[("question", "anything")])
        .send()
        .await
        .unwrap();

    let events = parse_sse(&resp.text().await.unwrap());

    assert_eq!(event_names(&events), ["delta", "delta", "error", "done"]);
    assert_eq!(joined_deltas(&events), "SELECT 1");
    assert!(events[2].1.as_str().unwrap().contains("upstream closed"));
}

#[tokio::test]
async fn test_chat_stream_without_llm() {
    let service = ChatService::new(seeded_sqlite().await, None)
        .with_missing_llm_reason("GROQ_API_KEY not configured");
    let base = spawn_server(service, &any_origin()).await;

    let resp = reqwest::get(format!("{base}/chat-stream?question=hi")).await.unwrap();
    let events = parse_sse(&resp.text().await.unwrap());

    assert_eq!(event_names(&events), ["error", "done"]);
    assert!(events[0].1.as_str().unwrap().contains("GROQ_API_KEY not configured"));
}

#[tokio::test]
async fn test_cors_any_origin() {
    let base = spawn_server(seeded_service(MockLlmClient::new()).await, &any_origin()).await;

    let resp = reqwest::Client::new()
        .get(format!("{base}/health"))
        .header("Origin", "http://somewhere.test")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
}

#[tokio::test]
async fn test_cors_explicit_origins() {
    let origins = vec!["http://app.test".to_string()];
    let base = spawn_server(seeded_service(MockLlmClient::new()).await, &origins).await;
    let client = reqwest::Client::new();

    let allowed = client
        .get(format!("{base}/health"))
        .header("Origin", "http://app.test")
        .send()
        .await
        .unwrap();
    assert_eq!(allowed.headers()["access-control-allow-origin"], "http://app.test");
    assert_eq!(allowed.headers()["access-control-allow-credentials"], "true");

    let other = client
        .get(format!("{base}/health"))
        .header("Origin", "http://evil.test")
        .send()
        .await
        .unwrap();
    assert!(other.headers().get("access-control-allow-origin").is_none());
}
