#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use chrono::Utc;
use rentdesk_api::{
    auth::{hash_password, user},
    config::AppConfig,
    db::{self, DbConfig},
    services::geolocation::{GeoLocation, GeoLocator, GeoLookupError},
    AppState,
};
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "kV9tq2Lw8ZrX4mNbP7sYd1GhJcU3oEfA6iRuT0lWxQz5yBnMvKaHpSgDjCe7RtLs";
pub const ADMIN_EMAIL: &str = "admin@rentdesk.test";
pub const ADMIN_PASSWORD: &str = "correct-horse-battery";

/// Geolocator that answers every lookup with the same place and records the ips it saw.
pub struct FixedLocator {
    pub location: Option<GeoLocation>,
    pub seen: Mutex<Vec<String>>,
}

impl FixedLocator {
    pub fn new(city: &str, region: &str, country: &str) -> Self {
        Self {
            location: Some(GeoLocation {
                city: city.to_string(),
                region: region.to_string(),
                country: country.to_string(),
            }),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// A locator whose every lookup fails.
    pub fn failing() -> Self {
        Self {
            location: None,
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl GeoLocator for FixedLocator {
    async fn locate(&self, ip: &str) -> Result<GeoLocation, GeoLookupError> {
        self.seen.lock().unwrap().push(ip.to_string());
        self.location
            .clone()
            .ok_or(GeoLookupError::Status(reqwest::StatusCode::SERVICE_UNAVAILABLE))
    }
}

/// Application over a migrated in-memory SQLite database with one seeded admin.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub locator: Arc<FixedLocator>,
    pub admin: user::Model,
    token: String,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_locator(FixedLocator::new("Denpasar", "Bali", "Indonesia")).await
    }

    pub async fn with_locator(locator: FixedLocator) -> Self {
        Self::build(locator, |_| {}).await
    }

    /// Builds the app after letting `tweak` adjust the configuration.
    pub async fn build(locator: FixedLocator, tweak: impl FnOnce(&mut AppConfig)) -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            TEST_SECRET.to_string(),
            "test".to_string(),
        );
        tweak(&mut cfg);

        // A single connection keeps every query on the same in-memory database
        let pool = db::establish_connection_with_config(&DbConfig {
            url: cfg.database_url.clone(),
            max_connections: 1,
            min_connections: 1,
            sqlx_logging: false,
            ..Default::default()
        })
        .await
        .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let now = Utc::now();
        let admin = user::ActiveModel {
            name: Set("Admin".to_string()),
            email: Set(ADMIN_EMAIL.to_string()),
            password_hash: Set(hash_password(ADMIN_PASSWORD).expect("hash admin password")),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&pool)
        .await
        .expect("seed admin user");

        let locator = Arc::new(locator);
        let state = AppState::new(Arc::new(pool), cfg, locator.clone());
        let token = state
            .auth
            .issue_token(&admin)
            .expect("issue admin token")
            .token;

        let router = rentdesk_api::app_router(state.clone()).layer(axum::middleware::from_fn(
            rentdesk_api::middleware_helpers::request_id_middleware,
        ));

        Self {
            router,
            state,
            locator,
            admin,
            token,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Send a request against the router with optional bearer token and extra headers.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
        headers: &[(&str, &str)],
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.send(method, uri, body, None, &[]).await
    }

    pub async fn request_authenticated(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response {
        let token = self.token.clone();
        self.send(method, uri, body, Some(&token), &[]).await
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
