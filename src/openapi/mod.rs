use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

/// Registers the bearer token and session cookie schemes referenced by handlers.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
        components.add_security_scheme(
            "cookie_auth",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new("token"))),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "RentDesk API",
        version = "1.0.0",
        description = r#"
# RentDesk API

Backend for a car-rental and tour-package booking site.

## Features

- **Catalog**: Rentable units and tour packages with a live price quote
- **Promotions**: Percentage and fixed-value discounts with validity windows
- **Visitor Analytics**: Visit tracking with device and location breakdowns
- **Admin Accounts**: Session-token authentication for the back office

## Authentication

Catalog reads and visit tracking are public. Everything else needs the token
returned by `/auth/login`, either as a header or as the `token` cookie:

```
Authorization: Bearer <your-jwt-token>
```

## Error Handling

```json
{
  "error": "Bad Request",
  "message": "Validation error: name: length",
  "request_id": "6f1c...",
  "timestamp": "2026-01-01T00:00:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "units", description = "Rentable vehicles"),
        (name = "packages", description = "Tour packages"),
        (name = "promotions", description = "Discount management"),
        (name = "visitors", description = "Visit tracking and reporting"),
        (name = "auth", description = "Session management"),
        (name = "users", description = "Account settings")
    ),
    paths(
        // Units
        crate::handlers::units::list_units,
        crate::handlers::units::get_unit,
        crate::handlers::units::create_unit,
        crate::handlers::units::update_unit,
        crate::handlers::units::delete_unit,

        // Packages
        crate::handlers::packages::list_packages,
        crate::handlers::packages::get_package,
        crate::handlers::packages::create_package,
        crate::handlers::packages::update_package,
        crate::handlers::packages::delete_package,

        // Promotions
        crate::handlers::promotions::list_promotions,
        crate::handlers::promotions::get_promotion,
        crate::handlers::promotions::create_promotion,
        crate::handlers::promotions::update_promotion,
        crate::handlers::promotions::delete_promotion,

        // Visitors
        crate::handlers::visitors::track_visitor,
        crate::handlers::visitors::visitor_report,

        // Auth and account
        crate::auth::register_handler,
        crate::auth::login_handler,
        crate::auth::logout_handler,
        crate::auth::me_handler,
        crate::handlers::users::update_account_info,
        crate::handlers::users::change_password,
    ),
    components(
        schemas(
            crate::ApiResponse<serde_json::Value>,
            crate::models::Inclusion,
            crate::models::Validity,
            crate::models::DiscountType,
            crate::models::DeviceClass,
            crate::services::pricing::AppliedDiscount,
            crate::services::pricing::PriceQuote,
            crate::services::catalog::UnitView,
            crate::services::catalog::PackageView,
            crate::services::promotions::DiscountDetail,
            crate::services::visitor_analytics::VisitorReport,
            crate::auth::UserProfile,
            crate::auth::SessionToken,
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_routes_and_security_schemes() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("RentDesk API"));
        assert!(json.contains("/api/v1/promotions/{id}"));
        assert!(json.contains("/api/track-visitor"));
        assert!(json.contains("bearer_auth"));
        assert!(json.contains("cookie_auth"));
    }
}
