use super::common::{created_response, no_content_response, success_response, validate_input};
use crate::{
    errors::ApiError,
    services::catalog::{CreatePackageRequest, PackageView, UpdatePackageRequest},
    ApiResponse, AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::Response,
};

#[utoipa::path(
    get,
    path = "/api/v1/packages",
    responses(
        (status = 200, description = "Tour packages with their discounts and current price", body = ApiResponse<Vec<PackageView>>),
    ),
    tag = "packages"
)]
pub async fn list_packages(State(state): State<AppState>) -> Result<Response, ApiError> {
    Ok(success_response(state.catalog.list_packages().await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/packages/{id}",
    params(("id" = i32, Path, description = "Package ID")),
    responses(
        (status = 200, description = "Package fetched", body = ApiResponse<PackageView>),
        (status = 404, description = "Package not found", body = crate::errors::ErrorResponse)
    ),
    tag = "packages"
)]
pub async fn get_package(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    Ok(success_response(state.catalog.get_package(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/packages",
    request_body = CreatePackageRequest,
    responses(
        (status = 201, description = "Package created", body = ApiResponse<PackageView>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "packages"
)]
pub async fn create_package(
    State(state): State<AppState>,
    Json(payload): Json<CreatePackageRequest>,
) -> Result<Response, ApiError> {
    validate_input(&payload)?;
    Ok(created_response(state.catalog.create_package(payload).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/packages/{id}",
    params(("id" = i32, Path, description = "Package ID")),
    request_body = UpdatePackageRequest,
    responses(
        (status = 200, description = "Package updated", body = ApiResponse<PackageView>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Package not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "packages"
)]
pub async fn update_package(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdatePackageRequest>,
) -> Result<Response, ApiError> {
    validate_input(&payload)?;
    Ok(success_response(
        state.catalog.update_package(id, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/packages/{id}",
    params(("id" = i32, Path, description = "Package ID")),
    responses(
        (status = 204, description = "Package deleted"),
        (status = 404, description = "Package not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "packages"
)]
pub async fn delete_package(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    state.catalog.delete_package(id).await?;
    Ok(no_content_response())
}
