//! IP → location lookup used when recording visits.

mod countries;

pub use countries::country_name;

use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::errors::ServiceError;

/// Placeholder stored when a location field cannot be resolved.
pub const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoLocation {
    pub city: String,
    pub region: String,
    /// English country name, not the ISO code
    pub country: String,
}

impl GeoLocation {
    pub fn unknown() -> Self {
        Self {
            city: UNKNOWN.to_string(),
            region: UNKNOWN.to_string(),
            country: UNKNOWN.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum GeoLookupError {
    #[error("geolocation request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("geolocation service returned {0}")]
    Status(reqwest::StatusCode),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GeoLocator: Send + Sync {
    async fn locate(&self, ip: &str) -> Result<GeoLocation, GeoLookupError>;
}

/// Subset of the IPinfo response we care about
#[derive(Debug, Deserialize)]
struct IpInfoResponse {
    city: Option<String>,
    region: Option<String>,
    country: Option<String>,
}

fn non_empty(value: Option<String>) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

impl From<IpInfoResponse> for GeoLocation {
    fn from(body: IpInfoResponse) -> Self {
        let country = body
            .country
            .as_deref()
            .and_then(country_name)
            .unwrap_or(UNKNOWN)
            .to_string();
        Self {
            city: non_empty(body.city),
            region: non_empty(body.region),
            country,
        }
    }
}

/// Client for an IPinfo compatible endpoint: `GET {base}/{ip}?token=...`.
#[derive(Clone)]
pub struct IpInfoLocator {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl IpInfoLocator {
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::InternalError(format!("geolocation client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ServiceError> {
        Self::new(
            config.geolocation_base_url.clone(),
            config.geolocation_token.clone(),
            config.geolocation_timeout(),
        )
    }
}

#[async_trait]
impl GeoLocator for IpInfoLocator {
    async fn locate(&self, ip: &str) -> Result<GeoLocation, GeoLookupError> {
        let url = format!("{}/{}", self.base_url, ip);
        let mut request = self.client.get(&url);
        if let Some(token) = &self.token {
            request = request.query(&[("token", token)]);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(GeoLookupError::Status(response.status()));
        }

        let body: IpInfoResponse = response.json().await?;
        Ok(body.into())
    }
}

/// Looks up `ip`, degrading to [`GeoLocation::unknown`] on any failure.
///
/// An unresolvable client address (`"unknown"`) skips the lookup entirely.
pub async fn locate_or_unknown(locator: &dyn GeoLocator, ip: &str) -> GeoLocation {
    if ip.is_empty() || ip == UNKNOWN {
        return GeoLocation::unknown();
    }

    match locator.locate(ip).await {
        Ok(location) => {
            debug!(ip, city = %location.city, country = %location.country, "resolved visitor location");
            location
        }
        Err(e) => {
            counter!("visitors.geolocation.failures", 1);
            warn!(ip, error = %e, "geolocation lookup failed; storing unknown location");
            GeoLocation::unknown()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_ipinfo_body_to_location() {
        let body: IpInfoResponse = serde_json::from_str(
            r#"{"ip":"1.2.3.4","city":"Denpasar","region":"Bali","country":"ID","loc":"-8.6,115.2"}"#,
        )
        .unwrap();
        let location = GeoLocation::from(body);
        assert_eq!(location.city, "Denpasar");
        assert_eq!(location.region, "Bali");
        assert_eq!(location.country, "Indonesia");
    }

    #[test]
    fn missing_or_unmapped_fields_become_unknown() {
        let body: IpInfoResponse =
            serde_json::from_str(r#"{"ip":"10.0.0.1","bogon":true,"country":"XX","city":""}"#)
                .unwrap();
        assert_eq!(GeoLocation::from(body), GeoLocation::unknown());
    }

    #[tokio::test]
    async fn failures_degrade_to_unknown() {
        let mut locator = MockGeoLocator::new();
        locator
            .expect_locate()
            .withf(|ip| ip == "203.0.113.9")
            .times(1)
            .returning(|_| Err(GeoLookupError::Status(reqwest::StatusCode::TOO_MANY_REQUESTS)));

        let location = locate_or_unknown(&locator, "203.0.113.9").await;
        assert_eq!(location, GeoLocation::unknown());
    }

    #[tokio::test]
    async fn unknown_ip_skips_lookup() {
        let mut locator = MockGeoLocator::new();
        locator.expect_locate().never();

        assert_eq!(locate_or_unknown(&locator, UNKNOWN).await, GeoLocation::unknown());
        assert_eq!(locate_or_unknown(&locator, "").await, GeoLocation::unknown());
    }
}
