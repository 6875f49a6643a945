#![allow(dead_code)]

use std::sync::Arc;

use inventory_ledger::api::routes::{AppState, app_router};
use inventory_ledger::ledger::LedgerService;
use inventory_ledger::persistence::MemoryStore;
use rust_decimal_macros::dec;

pub const JWT_SECRET: &[u8] = b"test-jwt-secret";

pub fn test_app_state() -> AppState<MemoryStore> {
    AppState {
        ledger: LedgerService::new(Arc::new(MemoryStore::new())),
        jwt_secret: JWT_SECRET.into(),
        starting_cash: dec!(10000),
    }
}

/// Spawn app on a random port and return (base_url, guard that keeps server running).
pub async fn spawn_app(state: AppState<MemoryStore>) -> (String, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{}", addr);
    let app = app_router(state);
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (base_url, handle)
}

/// Register `username` and log in, returning the bearer token.
pub async fn register_and_login(
    client: &reqwest::Client,
    base_url: &str,
    username: &str,
) -> String {
    let reg = client
        .post(format!("{}/auth/register", base_url))
        .json(&serde_json::json!({ "username": username, "password": "secret123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(reg.status().as_u16(), 201);

    let login = client
        .post(format!("{}/auth/login", base_url))
        .json(&serde_json::json!({ "username": username, "password": "secret123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(login.status().as_u16(), 200);
    let json: serde_json::Value = login.json().await.unwrap();
    json["token"].as_str().unwrap().to_string()
}
