//! Promotion management over HTTP: validation, associations and cascade rules.
#![cfg(feature = "mock-tests")]

mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp};
use serde_json::{json, Value};

async fn create_unit(app: &TestApp, name: &str, base_rate: i64) -> i64 {
    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/units",
            Some(json!({
                "name": name,
                "year": 2022,
                "capacity": 7,
                "base_rate": base_rate,
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    response_json(response).await["data"]["id"].as_i64().unwrap()
}

async fn create_package(app: &TestApp, name: &str, base_rate: i64) -> i64 {
    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/packages",
            Some(json!({ "name": name, "base_rate": base_rate })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    response_json(response).await["data"]["id"].as_i64().unwrap()
}

fn ids(value: &Value) -> Vec<i64> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn create_and_fetch_discount_with_associations() {
    let app = TestApp::new().await;
    let unit = create_unit(&app, "Avanza", 100_000).await;
    let package = create_package(&app, "Ubud Day Trip", 500_000).await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/promotions",
            Some(json!({
                "name": "Dry season",
                "discount_type": "PERCENTAGE",
                "discount_value": "20",
                "validity": { "start_date": "2020-01-01", "end_date": null },
                "unit_ids": [unit, unit],
                "package_ids": [package],
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = response_json(response).await;
    let id = created["data"]["id"].as_i64().unwrap();
    assert_eq!(ids(&created["data"]["unit_ids"]), vec![unit]);
    assert_eq!(ids(&created["data"]["package_ids"]), vec![package]);

    let fetched = response_json(
        app.request(Method::GET, &format!("/api/v1/promotions/{}", id), None)
            .await,
    )
    .await;
    assert_eq!(fetched["data"]["name"], "Dry season");
    assert_eq!(fetched["data"]["discount_type"], "PERCENTAGE");
    assert_eq!(fetched["data"]["validity"]["start_date"], "2020-01-01");

    let unit_view = response_json(
        app.request(Method::GET, &format!("/api/v1/units/{}", unit), None)
            .await,
    )
    .await;
    assert_eq!(unit_view["data"]["pricing"]["discounted_price"], "80000");
    assert_eq!(unit_view["data"]["pricing"]["has_discount"], true);
}

#[tokio::test]
async fn mutations_require_authentication() {
    let app = TestApp::new().await;
    let response = app
        .request(
            Method::POST,
            "/api/v1/promotions",
            Some(json!({ "name": "x", "discount_type": "FIX_VALUE", "discount_value": 1 })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = response_json(response).await;
    assert_eq!(body["error"]["code"], "AUTH_MISSING");
}

#[tokio::test]
async fn rejects_invalid_terms_and_unknown_ids() {
    let app = TestApp::new().await;

    let too_much = app
        .request_authenticated(
            Method::POST,
            "/api/v1/promotions",
            Some(json!({ "name": "x", "discount_type": "PERCENTAGE", "discount_value": 120 })),
        )
        .await;
    assert_eq!(too_much.status(), StatusCode::BAD_REQUEST);

    let reversed = app
        .request_authenticated(
            Method::POST,
            "/api/v1/promotions",
            Some(json!({
                "name": "x",
                "discount_type": "FIX_VALUE",
                "discount_value": 10,
                "validity": { "start_date": "2026-02-01", "end_date": "2026-01-01" },
            })),
        )
        .await;
    assert_eq!(reversed.status(), StatusCode::BAD_REQUEST);

    let unknown = app
        .request_authenticated(
            Method::POST,
            "/api/v1/promotions",
            Some(json!({
                "name": "x",
                "discount_type": "FIX_VALUE",
                "discount_value": 10,
                "unit_ids": [9999],
            })),
        )
        .await;
    assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);

    // Nothing was written by the failed attempts
    let list = response_json(app.request(Method::GET, "/api/v1/promotions", None).await).await;
    assert_eq!(list["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn update_replaces_associations_only_when_present() {
    let app = TestApp::new().await;
    let first = create_unit(&app, "Avanza", 100_000).await;
    let second = create_unit(&app, "Innova", 150_000).await;

    let created = response_json(
        app.request_authenticated(
            Method::POST,
            "/api/v1/promotions",
            Some(json!({
                "name": "Weekend",
                "discount_type": "FIX_VALUE",
                "discount_value": "5000",
                "unit_ids": [first],
            })),
        )
        .await,
    )
    .await;
    let id = created["data"]["id"].as_i64().unwrap();
    let uri = format!("/api/v1/promotions/{}", id);

    let renamed = response_json(
        app.request_authenticated(Method::PUT, &uri, Some(json!({ "name": "Long weekend" })))
            .await,
    )
    .await;
    assert_eq!(renamed["data"]["name"], "Long weekend");
    assert_eq!(ids(&renamed["data"]["unit_ids"]), vec![first]);

    let swapped = response_json(
        app.request_authenticated(Method::PUT, &uri, Some(json!({ "unit_ids": [second] })))
            .await,
    )
    .await;
    assert_eq!(ids(&swapped["data"]["unit_ids"]), vec![second]);

    let cleared = response_json(
        app.request_authenticated(Method::PUT, &uri, Some(json!({ "unit_ids": null })))
            .await,
    )
    .await;
    assert!(cleared["data"]["unit_ids"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn deleting_discount_keeps_units() {
    let app = TestApp::new().await;
    let unit = create_unit(&app, "Avanza", 100_000).await;

    let created = response_json(
        app.request_authenticated(
            Method::POST,
            "/api/v1/promotions",
            Some(json!({
                "name": "Flash",
                "discount_type": "FIX_VALUE",
                "discount_value": 150000,
                "unit_ids": [unit],
            })),
        )
        .await,
    )
    .await;
    let id = created["data"]["id"].as_i64().unwrap();

    // Unclamped: a fixed discount above the base rate prices below zero
    let priced = response_json(
        app.request(Method::GET, &format!("/api/v1/units/{}", unit), None)
            .await,
    )
    .await;
    assert_eq!(priced["data"]["pricing"]["discounted_price"], "-50000");

    let deleted = app
        .request_authenticated(Method::DELETE, &format!("/api/v1/promotions/{}", id), None)
        .await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let unit_view = response_json(
        app.request(Method::GET, &format!("/api/v1/units/{}", unit), None)
            .await,
    )
    .await;
    assert!(unit_view["data"]["discounts"].as_array().unwrap().is_empty());
    assert_eq!(unit_view["data"]["pricing"]["has_discount"], false);

    let missing = app
        .request(Method::GET, &format!("/api/v1/promotions/{}", id), None)
        .await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}
