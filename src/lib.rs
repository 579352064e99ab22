//! RentDesk API Library
//!
//! Backend for a car-rental and tour-package site: the unit/package catalog,
//! discount management with read-time price resolution, visitor analytics
//! and admin authentication.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod models;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{
    extract::State,
    middleware,
    response::Json,
    routing::{get, put},
    Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::auth::{AuthConfig, AuthRouterExt, AuthService};
use crate::services::{
    catalog::CatalogService, geolocation::GeoLocator, promotions::PromotionService,
    visitors::VisitorService,
};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub auth: Arc<AuthService>,
    pub promotions: Arc<PromotionService>,
    pub catalog: Arc<CatalogService>,
    pub visitors: Arc<VisitorService>,
}

impl AppState {
    /// Wires every service over one connection pool.
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        geolocator: Arc<dyn GeoLocator>,
    ) -> Self {
        let auth = Arc::new(AuthService::new(
            AuthConfig::from_app_config(&config),
            db.clone(),
        ));
        Self {
            promotions: Arc::new(PromotionService::new(db.clone())),
            catalog: Arc::new(CatalogService::new(db.clone())),
            visitors: Arc::new(VisitorService::new(db.clone(), geolocator)),
            auth,
            config,
            db,
        }
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn success_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-123"), async {
                ApiResponse::success("ok")
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-123"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }
}

/// Routes mounted under `/api/v1`
pub fn api_v1_routes() -> Router<AppState> {
    // Catalog and promotion reads are public
    let catalog_read = Router::new()
        .route("/units", get(handlers::units::list_units))
        .route("/units/:id", get(handlers::units::get_unit))
        .route("/packages", get(handlers::packages::list_packages))
        .route("/packages/:id", get(handlers::packages::get_package))
        .route("/promotions", get(handlers::promotions::list_promotions))
        .route("/promotions/:id", get(handlers::promotions::get_promotion));

    let catalog_write = Router::new()
        .route("/units", axum::routing::post(handlers::units::create_unit))
        .route(
            "/units/:id",
            put(handlers::units::update_unit).delete(handlers::units::delete_unit),
        )
        .route(
            "/packages",
            axum::routing::post(handlers::packages::create_package),
        )
        .route(
            "/packages/:id",
            put(handlers::packages::update_package).delete(handlers::packages::delete_package),
        )
        .route(
            "/promotions",
            axum::routing::post(handlers::promotions::create_promotion),
        )
        .route(
            "/promotions/:id",
            put(handlers::promotions::update_promotion)
                .delete(handlers::promotions::delete_promotion),
        )
        .with_auth();

    let account = Router::new()
        .route(
            "/user/account-info",
            put(handlers::users::update_account_info),
        )
        .route(
            "/user/change-password",
            put(handlers::users::change_password),
        )
        .with_auth();

    Router::new()
        // Status and health endpoints
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .merge(catalog_read)
        .merge(catalog_write)
        .merge(account)
}

/// Visitor tracking, mounted under `/api`. Recording is public, the report is not.
pub fn visitor_routes() -> Router<AppState> {
    let report = Router::new()
        .route("/track-visitor", get(handlers::visitors::visitor_report))
        .with_auth();

    Router::new()
        .route(
            "/track-visitor",
            axum::routing::post(handlers::visitors::track_visitor),
        )
        .merge(report)
}

/// Full application router without the outer HTTP layers (CORS, tracing, timeouts).
pub fn app_router(state: AppState) -> Router {
    let auth_service = state.auth.clone();

    Router::new()
        .route("/", get(|| async { "RentDesk API" }))
        .route("/health", get(health_check))
        .route("/status", get(api_status))
        .nest("/api/v1", api_v1_routes())
        .nest("/api", visitor_routes())
        .with_state(state)
        .nest(
            "/auth",
            auth::auth_routes().with_state(auth_service.clone()),
        )
        .merge(openapi::swagger_ui())
        .layer(middleware::from_fn_with_state(
            auth_service,
            auth::inject_auth_service,
        ))
}

async fn api_status(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let status_data = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "rentdesk-api",
        "timestamp": Utc::now().to_rfc3339(),
        "environment": state.config.environment,
    });

    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let db_status = match db::check_connection(&state.db).await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}
