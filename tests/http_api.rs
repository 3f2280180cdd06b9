//! Black-box tests of the HTTP adapter over the in-memory store.

use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use ledger_transaction_server::{
    routes::{AppState, router},
    services::{QueryService, TransactionEngine},
    store::{LedgerStore, MemoryStore},
};
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use tower::ServiceExt;

async fn app() -> Router {
    let store = MemoryStore::new();
    store.open_account(dec!(100.00)).await.unwrap();
    store.open_account(dec!(200.00)).await.unwrap();

    let engine = TransactionEngine::new(store.clone(), Duration::from_secs(1));
    let queries = QueryService::new(store.clone(), 100);
    router(AppState::new(engine, queries, store))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(match body {
            Some(body) => Body::from(body.to_string()),
            None => Body::empty(),
        })
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn health_reports_connected_store() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn transfer_returns_created_entry() {
    let app = app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/transactions/transfer",
        Some(json!({ "from_account_id": 1, "to_account_id": 2, "amount": "50.00" })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["kind"], "transfer");
    assert_eq!(body["from_account_balance"], "50.00");
    assert_eq!(body["to_account_balance"], "250.00");
    assert_eq!(body["amount"], "50.00");
}

#[tokio::test]
async fn insufficient_balance_is_bad_request() {
    let app = app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/transactions/withdraw",
        Some(json!({ "account_id": 1, "amount": "150.00" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "insufficient_balance");
    assert_eq!(body["error"]["retryable"], false);

    let (_, account) = send(&app, Method::GET, "/api/v1/accounts/1", None).await;
    assert_eq!(account["balance"], "100.00");
}

#[tokio::test]
async fn unknown_account_is_not_found() {
    let app = app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/transactions/deposit",
        Some(json!({ "account_id": 99, "amount": "1.00" })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "account_not_found");
}

#[tokio::test]
async fn self_transfer_is_rejected() {
    let app = app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/transactions/transfer",
        Some(json!({ "from_account_id": 2, "to_account_id": 2, "amount": "1.00" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_argument");
}

#[tokio::test]
async fn deposit_then_history_for_account() {
    let app = app().await;
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/transactions/deposit",
        Some(json!({ "account_id": 1, "amount": "50.00", "details": "top up" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, Method::GET, "/api/v1/transactions?account_id=1", None).await;
    assert_eq!(status, StatusCode::OK);

    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["amount"], "50.00");
    assert_eq!(entries[0]["to_account_balance"], "150.00");
    assert_eq!(entries[0]["details"], "top up");

    let (_, other) = send(&app, Method::GET, "/api/v1/transactions?account_id=2", None).await;
    assert!(other.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn open_account_then_list() {
    let app = app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/accounts",
        Some(json!({ "opening_balance": "12.50" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], 3);

    let (_, accounts) = send(&app, Method::GET, "/api/v1/accounts", None).await;
    assert_eq!(accounts.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn history_for_non_positive_account_is_bad_request() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, "/api/v1/transactions?account_id=0", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_argument");
}
