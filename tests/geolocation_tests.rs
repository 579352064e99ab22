//! IpInfoLocator against a mock geolocation endpoint.

use std::time::Duration;

use rentdesk_api::services::geolocation::{
    locate_or_unknown, GeoLocation, GeoLocator, GeoLookupError, IpInfoLocator,
};
use serde_json::json;
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

fn locator(server: &MockServer, token: Option<&str>) -> IpInfoLocator {
    IpInfoLocator::new(
        server.uri(),
        token.map(str::to_string),
        Duration::from_millis(500),
    )
    .expect("locator")
}

#[tokio::test]
async fn resolves_country_code_to_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/203.0.113.7"))
        .and(query_param("token", "ipinfo-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ip": "203.0.113.7",
            "city": "Denpasar",
            "region": "Bali",
            "country": "ID",
            "loc": "-8.6500,115.2167"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let location = locator(&server, Some("ipinfo-test"))
        .locate("203.0.113.7")
        .await
        .expect("lookup succeeds");

    assert_eq!(
        location,
        GeoLocation {
            city: "Denpasar".into(),
            region: "Bali".into(),
            country: "Indonesia".into(),
        }
    );
}

#[tokio::test]
async fn missing_fields_become_unknown() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/192.0.2.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ip": "192.0.2.1",
            "bogon": true,
            "city": ""
        })))
        .mount(&server)
        .await;

    let location = locator(&server, None).locate("192.0.2.1").await.unwrap();
    assert_eq!(location, GeoLocation::unknown());
}

#[tokio::test]
async fn error_status_is_reported_and_degrades_to_unknown() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let client = locator(&server, None);
    let err = client.locate("198.51.100.4").await.unwrap_err();
    assert!(matches!(err, GeoLookupError::Status(status) if status.as_u16() == 429));

    let location = locate_or_unknown(&client, "198.51.100.4").await;
    assert_eq!(location, GeoLocation::unknown());
}

#[tokio::test]
async fn slow_service_times_out_to_unknown() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "city": "Denpasar", "region": "Bali", "country": "ID" }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let location = locate_or_unknown(&locator(&server, None), "203.0.113.7").await;
    assert_eq!(location, GeoLocation::unknown());
}

#[tokio::test]
async fn unknown_ip_skips_the_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let location = locate_or_unknown(&locator(&server, None), "unknown").await;
    assert_eq!(location, GeoLocation::unknown());
}
