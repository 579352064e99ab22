use super::common::{success_response, validate_input};
use crate::{
    errors::ApiError,
    services::{
        geolocation::UNKNOWN,
        visitor_analytics::{RangeToken, VisitorReport},
        visitors::{RecordedVisit, TrackVisitorRequest, VisitContext},
    },
    ApiResponse, AppState,
};
use axum::{
    extract::{Json, Query, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
};
use std::net::IpAddr;
use chrono::Utc;
use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VisitorReportQuery {
    /// One of `7days`, `30days`, `3month`, `1year`. Defaults to `7days`.
    pub range: Option<String>,
}

/// First hop of `x-forwarded-for` when it parses as an IP address, else `"unknown"`.
pub fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|hop| hop.trim().parse::<IpAddr>().ok())
        .map_or_else(|| UNKNOWN.to_string(), |ip| ip.to_string())
}

#[utoipa::path(
    post,
    path = "/api/track-visitor",
    request_body = TrackVisitorRequest,
    responses(
        (status = 200, description = "Visit recorded", body = ApiResponse<RecordedVisit>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "visitors"
)]
pub async fn track_visitor(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<TrackVisitorRequest>,
) -> Result<Response, ApiError> {
    validate_input(&payload)?;

    let user_agent = payload
        .user_agent
        .filter(|ua| !ua.is_empty())
        .or_else(|| {
            headers
                .get(header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .unwrap_or_default();

    let visit = VisitContext {
        uuid: payload.uuid,
        user_agent,
        ip_address: client_ip(&headers),
    };

    let recorded = state.visitors.record_visit(visit).await?;
    Ok(success_response(recorded))
}

#[utoipa::path(
    get,
    path = "/api/track-visitor",
    params(VisitorReportQuery),
    responses(
        (status = 200, description = "Visitor series and summaries", body = VisitorReport),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "visitors"
)]
pub async fn visitor_report(
    State(state): State<AppState>,
    Query(query): Query<VisitorReportQuery>,
) -> Result<Response, ApiError> {
    let range = RangeToken::from_query(query.range.as_deref());
    let report = state.visitors.report(range, Utc::now()).await?;
    Ok(Json(report).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn client_ip_uses_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        assert_eq!(client_ip(&headers), "203.0.113.7");
    }

    #[test]
    fn client_ip_defaults_to_unknown() {
        assert_eq!(client_ip(&HeaderMap::new()), "unknown");
    }

    #[test]
    fn client_ip_accepts_ipv6_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static(" 2001:db8::1 "));
        assert_eq!(client_ip(&headers), "2001:db8::1");
    }

    #[test]
    fn client_ip_rejects_hops_that_are_not_addresses() {
        for forwarded in ["../admin?x=", "203.0.113.7/../../me", "localhost", ", 10.0.0.1"] {
            let mut headers = HeaderMap::new();
            headers.insert("x-forwarded-for", HeaderValue::from_static(forwarded));
            assert_eq!(client_ip(&headers), "unknown", "{}", forwarded);
        }
    }
}
