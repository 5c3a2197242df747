//! Integration tests for the HTTP surface: status codes, error codes and response bodies.

use std::sync::Arc;

use portfolio_ledger::Ledger;
use portfolio_ledger::api::routes::{AppState, app_router};
use portfolio_ledger::oracle::NoOracle;
use portfolio_ledger::persistence::MemoryStore;
use serde_json::{Value, json};

fn test_app_state(balance: f64) -> AppState {
    let ledger = Ledger::new(
        Arc::new(MemoryStore::with_balance(balance)),
        Arc::new(NoOracle),
    );
    AppState {
        ledger: Arc::new(ledger),
    }
}

/// Spawn app on a random port and return (base_url, guard that keeps server running).
async fn spawn_app(state: AppState) -> (String, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{}", addr);
    let app = app_router(state);
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (base_url, handle)
}

async fn add_asset(client: &reqwest::Client, base_url: &str, body: Value) -> reqwest::Response {
    client
        .post(format!("{}/api/assets", base_url))
        .json(&body)
        .send()
        .await
        .unwrap()
}

fn apple(shares: f64, price: f64) -> Value {
    json!({
        "assetName": "Apple Inc.",
        "assetSymbol": "aapl",
        "shares": shares,
        "purchasePrice": price,
        "purchaseDate": "2024-06-01",
        "category": "stocks"
    })
}

#[tokio::test]
async fn add_asset_returns_201_with_ids_and_balance() {
    let (base_url, _handle) = spawn_app(test_app_state(1000.0)).await;
    let client = reqwest::Client::new();

    let res = add_asset(&client, &base_url, apple(2.0, 150.0)).await;
    assert_eq!(res.status().as_u16(), 201);
    let json: Value = res.json().await.unwrap();
    assert_eq!(json["message"], "Asset added successfully");
    assert!(json["assetId"].as_str().is_some());
    assert!(json["transactionId"].as_str().is_some());
    assert_eq!(json["balance"].as_f64(), Some(700.0));

    let assets: Value = client
        .get(format!("{}/api/assets", base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let assets = assets.as_array().unwrap();
    assert_eq!(assets.len(), 1);
    assert_eq!(assets[0]["symbol"], "AAPL");
    assert_eq!(assets[0]["quantity"].as_f64(), Some(2.0));
}

#[tokio::test]
async fn add_asset_without_funds_returns_400_insufficient_funds() {
    let (base_url, _handle) = spawn_app(test_app_state(100.0)).await;
    let client = reqwest::Client::new();

    let res = add_asset(&client, &base_url, apple(1.0, 150.0)).await;
    assert_eq!(res.status().as_u16(), 400);
    let json: Value = res.json().await.unwrap();
    assert_eq!(json["code"], "INSUFFICIENT_FUNDS");

    let log: Value = client
        .get(format!("{}/api/transactions", base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(log.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn add_asset_with_bad_date_returns_400() {
    let (base_url, _handle) = spawn_app(test_app_state(1000.0)).await;
    let client = reqwest::Client::new();

    let mut body = apple(1.0, 10.0);
    body["purchaseDate"] = json!("last tuesday");
    let res = add_asset(&client, &base_url, body).await;
    assert_eq!(res.status().as_u16(), 400);
    let json: Value = res.json().await.unwrap();
    assert_eq!(json["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn sell_unknown_asset_returns_404() {
    let (base_url, _handle) = spawn_app(test_app_state(1000.0)).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/assets/{}/sell", base_url, uuid::Uuid::new_v4()))
        .json(&json!({ "volumeSold": 1.0, "salePrice": 10.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 404);
    let json: Value = res.json().await.unwrap();
    assert_eq!(json["code"], "NOT_FOUND");
}

#[tokio::test]
async fn sell_flow_updates_then_deletes() {
    let (base_url, _handle) = spawn_app(test_app_state(1000.0)).await;
    let client = reqwest::Client::new();

    let created: Value = add_asset(&client, &base_url, apple(4.0, 100.0))
        .await
        .json()
        .await
        .unwrap();
    let id = created["assetId"].as_str().unwrap().to_string();
    let sell_url = format!("{}/api/assets/{}/sell", base_url, id);

    let res = client
        .post(&sell_url)
        .json(&json!({ "volumeSold": 1.0, "salePrice": 120.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let json: Value = res.json().await.unwrap();
    assert_eq!(json["status"], "updated");
    assert_eq!(json["message"], "Asset updated successfully");
    assert_eq!(json["remainingQuantity"].as_f64(), Some(3.0));
    assert_eq!(json["balance"].as_f64(), Some(720.0));

    let res = client
        .post(&sell_url)
        .json(&json!({ "volumeSold": 5.0, "salePrice": 120.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);
    let json: Value = res.json().await.unwrap();
    assert_eq!(json["code"], "INSUFFICIENT_QUANTITY");

    let res = client
        .post(&sell_url)
        .json(&json!({ "volumeSold": 3.0, "salePrice": 90.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let json: Value = res.json().await.unwrap();
    assert_eq!(json["status"], "deleted");
    assert_eq!(json["id"].as_str(), Some(id.as_str()));
    assert_eq!(json["balance"].as_f64(), Some(990.0));

    let log: Value = client
        .get(format!("{}/api/transactions", base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let kinds: Vec<&str> = log
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["type"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["sell", "sell", "buy"]);
}

#[tokio::test]
async fn sell_without_price_and_no_oracle_returns_502() {
    let (base_url, _handle) = spawn_app(test_app_state(1000.0)).await;
    let client = reqwest::Client::new();

    let created: Value = add_asset(&client, &base_url, apple(1.0, 100.0))
        .await
        .json()
        .await
        .unwrap();
    let res = client
        .post(format!(
            "{}/api/assets/{}/sell",
            base_url,
            created["assetId"].as_str().unwrap()
        ))
        .json(&json!({ "volumeSold": 1.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 502);
    let json: Value = res.json().await.unwrap();
    assert_eq!(json["code"], "PRICE_UNAVAILABLE");
}

#[tokio::test]
async fn wallet_credit_and_balance() {
    let (base_url, _handle) = spawn_app(test_app_state(10.0)).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/wallet/credit", base_url))
        .json(&json!({ "amount": 40.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let json: Value = res.json().await.unwrap();
    assert_eq!(json["balance"].as_f64(), Some(50.0));

    let res = client
        .post(format!("{}/api/wallet/credit", base_url))
        .json(&json!({ "amount": -1.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);

    let json: Value = client
        .get(format!("{}/api/wallet", base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(json["balance"].as_f64(), Some(50.0));
}

#[tokio::test]
async fn quote_without_oracle_returns_502() {
    let (base_url, _handle) = spawn_app(test_app_state(0.0)).await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/api/quotes/aapl", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 502);
}

#[tokio::test]
async fn audit_reports_consistent_ledger() {
    let (base_url, _handle) = spawn_app(test_app_state(1000.0)).await;
    let client = reqwest::Client::new();
    add_asset(&client, &base_url, apple(2.0, 100.0)).await;
    add_asset(&client, &base_url, apple(2.0, 200.0)).await;

    let json: Value = client
        .get(format!("{}/api/audit", base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(json["consistent"], true);
    assert_eq!(json["transactions"].as_u64(), Some(2));
    assert_eq!(json["openPositions"].as_u64(), Some(1));
}

#[tokio::test]
async fn malformed_bodies_return_400_with_error_envelope() {
    let (base_url, _handle) = spawn_app(test_app_state(1000.0)).await;
    let client = reqwest::Client::new();

    let mut crypto = apple(1.0, 10.0);
    crypto["category"] = json!("crypto");
    let mut missing_shares = apple(1.0, 10.0);
    missing_shares.as_object_mut().unwrap().remove("shares");

    for body in [crypto, missing_shares] {
        let res = add_asset(&client, &base_url, body).await;
        assert_eq!(res.status().as_u16(), 400);
        let json: Value = res.json().await.unwrap();
        assert_eq!(json["code"], "INVALID_REQUEST");
        assert!(json["error"].as_str().is_some());
    }

    let res = client
        .post(format!("{}/api/wallet/credit", base_url))
        .json(&json!({ "amount": "lots" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);
    let json: Value = res.json().await.unwrap();
    assert_eq!(json["code"], "INVALID_REQUEST");

    let res = client
        .post(format!("{}/api/assets/not-a-uuid/sell", base_url))
        .json(&json!({ "volumeSold": 1.0, "salePrice": 10.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);
    let json: Value = res.json().await.unwrap();
    assert_eq!(json["code"], "INVALID_REQUEST");
}
