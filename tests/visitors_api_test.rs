//! Visit tracking and the visitor report over HTTP.
#![cfg(feature = "mock-tests")]

mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, FixedLocator, TestApp};
use serde_json::json;

const PHONE_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0) Mobile/15E148";
const DESKTOP_UA: &str = "Mozilla/5.0 (X11; Linux x86_64) Firefox/128.0";

#[tokio::test]
async fn tracks_visit_with_forwarded_ip_and_location() {
    let app = TestApp::new().await;

    let response = app
        .send(
            Method::POST,
            "/api/track-visitor",
            Some(json!({ "uuid": "visitor-1", "userAgent": PHONE_UA })),
            None,
            &[("x-forwarded-for", "203.0.113.7, 10.0.0.1")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["device"], "mobile");
    assert_eq!(body["data"]["city"], "Denpasar");
    assert_eq!(body["data"]["country"], "Indonesia");
    assert_eq!(
        app.locator.seen.lock().unwrap().as_slice(),
        ["203.0.113.7".to_string()]
    );
}

#[tokio::test]
async fn user_agent_header_is_the_fallback() {
    let app = TestApp::new().await;
    let body = response_json(
        app.send(
            Method::POST,
            "/api/track-visitor",
            Some(json!({ "uuid": "visitor-2" })),
            None,
            &[("user-agent", DESKTOP_UA)],
        )
        .await,
    )
    .await;
    assert_eq!(body["data"]["device"], "desktop");

    // No forwarded header: ip stays unknown and no lookup is attempted
    assert!(app.locator.seen.lock().unwrap().is_empty());
    assert_eq!(body["data"]["city"], "unknown");
}

#[tokio::test]
async fn geolocation_failure_still_records_the_visit() {
    let app = TestApp::with_locator(FixedLocator::failing()).await;
    let response = app
        .send(
            Method::POST,
            "/api/track-visitor",
            Some(json!({ "uuid": "visitor-3", "userAgent": DESKTOP_UA })),
            None,
            &[("x-forwarded-for", "198.51.100.4")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["data"]["region"], "unknown");
    assert_eq!(body["data"]["country"], "unknown");
}

#[tokio::test]
async fn forwarded_value_that_is_not_an_ip_is_never_looked_up() {
    let app = TestApp::new().await;
    let response = app
        .send(
            Method::POST,
            "/api/track-visitor",
            Some(json!({ "uuid": "visitor-4", "userAgent": DESKTOP_UA })),
            None,
            &[("x-forwarded-for", "../admin?x=")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["data"]["city"], "unknown");
    assert!(app.locator.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn rejects_missing_uuid() {
    let app = TestApp::new().await;
    let response = app
        .request(Method::POST, "/api/track-visitor", Some(json!({ "uuid": "" })))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn report_requires_authentication() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/api/track-visitor", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn report_summarises_recent_visits() {
    let app = TestApp::new().await;
    for (uuid, ua) in [
        ("returning", PHONE_UA),
        ("returning", PHONE_UA),
        ("once", DESKTOP_UA),
    ] {
        let response = app
            .send(
                Method::POST,
                "/api/track-visitor",
                Some(json!({ "uuid": uuid, "userAgent": ua })),
                None,
                &[("x-forwarded-for", "203.0.113.7")],
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let report = response_json(
        app.request_authenticated(Method::GET, "/api/track-visitor", None)
            .await,
    )
    .await;
    assert!(report.get("success").is_none());

    let graph = report["graph"].as_array().unwrap();
    assert_eq!(graph.len(), 7);
    assert_eq!(graph.last().unwrap()["visitors"], 3);

    let summary = &report["summary"];
    assert_eq!(summary["total"], 3);
    assert_eq!(summary["device"][0], json!({ "device": "mobile", "value": 2 }));
    assert_eq!(summary["device"][1], json!({ "device": "desktop", "value": 1 }));
    assert_eq!(
        summary["region"][0],
        json!({ "region": "Bali Indonesia", "value": 3 })
    );
    // one of two unique visitors returned
    assert_eq!(summary["returningVisitorPercentage"], 50);

    let yearly = response_json(
        app.request_authenticated(Method::GET, "/api/track-visitor?range=1year", None)
            .await,
    )
    .await;
    assert_eq!(yearly["graph"].as_array().unwrap().len(), 12);

    let fallback = response_json(
        app.request_authenticated(Method::GET, "/api/track-visitor?range=bogus", None)
            .await,
    )
    .await;
    assert_eq!(fallback["graph"].as_array().unwrap().len(), 12);
}
