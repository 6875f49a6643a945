//! HTTP flow tests: buy, sell, portfolio, history and CSV export.

mod common;

use std::str::FromStr;

use common::{register_and_login, spawn_app, test_app_state};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn decimal(value: &serde_json::Value) -> Decimal {
    match value {
        serde_json::Value::String(s) => Decimal::from_str(s).unwrap(),
        other => Decimal::from_str(&other.to_string()).unwrap(),
    }
}

async fn post_json(
    client: &reqwest::Client,
    url: String,
    token: &str,
    body: serde_json::Value,
) -> reqwest::Response {
    client
        .post(url)
        .bearer_auth(token)
        .json(&body)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let (base_url, _handle) = spawn_app(test_app_state()).await;
    let res = reqwest::get(format!("{}/health", base_url)).await.unwrap();
    assert_eq!(res.status().as_u16(), 200);
    assert_eq!(
        res.headers()["cache-control"],
        "no-cache, no-store, must-revalidate"
    );
    assert_eq!(res.headers()["expires"], "0");
    assert_eq!(res.headers()["pragma"], "no-cache");
    assert_eq!(res.text().await.unwrap(), "healthy");
}

#[tokio::test]
async fn new_user_starts_with_configured_cash() {
    let (base_url, _handle) = spawn_app(test_app_state()).await;
    let client = reqwest::Client::new();
    let token = register_and_login(&client, &base_url, "erin").await;

    let res = client
        .get(format!("{}/portfolio", base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let json: serde_json::Value = res.json().await.unwrap();
    assert_eq!(decimal(&json["cash"]), dec!(10000));
    assert_eq!(decimal(&json["total"]), dec!(10000));
    assert!(json["holdings"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn buy_then_sell_updates_portfolio() {
    let (base_url, _handle) = spawn_app(test_app_state()).await;
    let client = reqwest::Client::new();
    let token = register_and_login(&client, &base_url, "frank").await;

    for price in ["10.00", "20.00"] {
        let res = post_json(
            &client,
            format!("{}/buy", base_url),
            &token,
            serde_json::json!({
                "symbol": "Widget",
                "display_name": "Acme",
                "shares": 10,
                "price": price
            }),
        )
        .await;
        assert_eq!(res.status().as_u16(), 200);
    }

    let res = post_json(
        &client,
        format!("{}/sell", base_url),
        &token,
        serde_json::json!({ "symbol": "WIDGET", "shares": 5 }),
    )
    .await;
    assert_eq!(res.status().as_u16(), 200);
    let exec: serde_json::Value = res.json().await.unwrap();
    assert_eq!(exec["event"]["share_delta"], -5);
    assert_eq!(decimal(&exec["event"]["price"]), dec!(15));
    assert_eq!(decimal(&exec["cash_after"]), dec!(9775));

    let json: serde_json::Value = client
        .get(format!("{}/portfolio", base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let holdings = json["holdings"].as_array().unwrap();
    assert_eq!(holdings.len(), 1);
    assert_eq!(holdings[0]["symbol"], "widget");
    assert_eq!(holdings[0]["shares"], 15);
    assert_eq!(decimal(&holdings[0]["average_price"]), dec!(15));
    assert_eq!(decimal(&json["holdings_value"]), dec!(225));
    assert_eq!(decimal(&json["total"]), dec!(10000));
}

#[tokio::test]
async fn business_rule_violations_map_to_status_codes() {
    let (base_url, _handle) = spawn_app(test_app_state()).await;
    let client = reqwest::Client::new();
    let token = register_and_login(&client, &base_url, "gina").await;

    let too_expensive = post_json(
        &client,
        format!("{}/buy", base_url),
        &token,
        serde_json::json!({
            "symbol": "yacht",
            "display_name": "Boats",
            "shares": 1,
            "price": "10000.01"
        }),
    )
    .await;
    assert_eq!(too_expensive.status().as_u16(), 422);
    let json: serde_json::Value = too_expensive.json().await.unwrap();
    assert_eq!(json["kind"], "insufficient_funds");

    let unheld = post_json(
        &client,
        format!("{}/sell", base_url),
        &token,
        serde_json::json!({ "symbol": "yacht", "shares": 1 }),
    )
    .await;
    assert_eq!(unheld.status().as_u16(), 404);
    let json: serde_json::Value = unheld.json().await.unwrap();
    assert_eq!(json["kind"], "no_such_holding");

    let invalid = post_json(
        &client,
        format!("{}/buy", base_url),
        &token,
        serde_json::json!({
            "symbol": "yacht",
            "display_name": "",
            "shares": 1,
            "price": "1"
        }),
    )
    .await;
    assert_eq!(invalid.status().as_u16(), 400);
    let json: serde_json::Value = invalid.json().await.unwrap();
    assert_eq!(json["kind"], "invalid_argument");

    post_json(
        &client,
        format!("{}/buy", base_url),
        &token,
        serde_json::json!({
            "symbol": "yacht",
            "display_name": "Boats",
            "shares": 2,
            "price": "1"
        }),
    )
    .await;
    let oversold = post_json(
        &client,
        format!("{}/sell", base_url),
        &token,
        serde_json::json!({ "symbol": "yacht", "shares": 3 }),
    )
    .await;
    assert_eq!(oversold.status().as_u16(), 422);
    let json: serde_json::Value = oversold.json().await.unwrap();
    assert_eq!(json["kind"], "insufficient_shares");
}

#[tokio::test]
async fn history_and_export_list_every_event_in_order() {
    let (base_url, _handle) = spawn_app(test_app_state()).await;
    let client = reqwest::Client::new();
    let token = register_and_login(&client, &base_url, "hank").await;

    post_json(
        &client,
        format!("{}/buy", base_url),
        &token,
        serde_json::json!({
            "symbol": "gear",
            "display_name": "Cogs, Ltd",
            "shares": 5,
            "price": "2.5"
        }),
    )
    .await;
    post_json(
        &client,
        format!("{}/sell", base_url),
        &token,
        serde_json::json!({ "symbol": "gear", "shares": 5 }),
    )
    .await;

    let history: serde_json::Value = client
        .get(format!("{}/history", base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let events = history.as_array().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["share_delta"], 5);
    assert_eq!(events[1]["share_delta"], -5);

    let res = client
        .get(format!("{}/export", base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    assert_eq!(res.headers()["content-type"], "text/csv");
    assert!(
        res.headers()["content-disposition"]
            .to_str()
            .unwrap()
            .contains("log.csv")
    );
    let body = res.text().await.unwrap();
    assert_eq!(
        body,
        "company,product,quantity,price\n\"Cogs, Ltd\",gear,5,2.5\n\"Cogs, Ltd\",gear,-5,2.5\n"
    );
}

#[tokio::test]
async fn users_only_see_their_own_rows() {
    let (base_url, _handle) = spawn_app(test_app_state()).await;
    let client = reqwest::Client::new();
    let ivy = register_and_login(&client, &base_url, "ivy").await;
    let jack = register_and_login(&client, &base_url, "jack").await;

    post_json(
        &client,
        format!("{}/buy", base_url),
        &ivy,
        serde_json::json!({
            "symbol": "gear",
            "display_name": "Cogs",
            "shares": 1,
            "price": "1"
        }),
    )
    .await;

    let history: serde_json::Value = client
        .get(format!("{}/history", base_url))
        .bearer_auth(&jack)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(history.as_array().unwrap().is_empty());

    let export = client
        .get(format!("{}/export", base_url))
        .bearer_auth(&jack)
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(export, "company,product,quantity,price\n");
}

#[tokio::test]
async fn malformed_trade_bodies_are_invalid_arguments() {
    let (base_url, _handle) = spawn_app(test_app_state()).await;
    let client = reqwest::Client::new();
    let token = register_and_login(&client, &base_url, "kate").await;

    let cases = [
        (
            "buy",
            serde_json::json!({
                "symbol": "gear",
                "display_name": "Cogs",
                "shares": -1,
                "price": "1"
            }),
        ),
        (
            "buy",
            serde_json::json!({
                "symbol": "gear",
                "display_name": "Cogs",
                "shares": 1,
                "price": "abc"
            }),
        ),
        ("sell", serde_json::json!({ "symbol": "gear", "shares": -3 })),
        ("sell", serde_json::json!({ "symbol": "gear" })),
    ];
    for (path, body) in cases {
        let res = post_json(&client, format!("{}/{}", base_url, path), &token, body.clone()).await;
        assert_eq!(res.status().as_u16(), 400, "{path} {body}");
        assert!(
            res.headers()["content-type"]
                .to_str()
                .unwrap()
                .starts_with("application/json")
        );
        let json: serde_json::Value = res.json().await.unwrap();
        assert_eq!(json["kind"], "invalid_argument", "{path} {body}");
        assert!(json["error"].as_str().unwrap().contains("invalid request body"));
    }

    let portfolio: serde_json::Value = client
        .get(format!("{}/portfolio", base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(decimal(&portfolio["cash"]), dec!(10000));
}

#[tokio::test]
async fn non_json_login_body_is_rejected_with_error_body() {
    let (base_url, _handle) = spawn_app(test_app_state()).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/auth/login", base_url))
        .header("content-type", "application/json")
        .body("not json")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 400);
    let json: serde_json::Value = res.json().await.unwrap();
    assert_eq!(json["kind"], "invalid_argument");
}
