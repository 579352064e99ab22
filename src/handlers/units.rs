use super::common::{created_response, no_content_response, success_response, validate_input};
use crate::{
    errors::ApiError,
    services::catalog::{CreateUnitRequest, UnitView, UpdateUnitRequest},
    ApiResponse, AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::Response,
};

#[utoipa::path(
    get,
    path = "/api/v1/units",
    responses(
        (status = 200, description = "Units with their discounts and current price", body = ApiResponse<Vec<UnitView>>),
    ),
    tag = "units"
)]
pub async fn list_units(State(state): State<AppState>) -> Result<Response, ApiError> {
    Ok(success_response(state.catalog.list_units().await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/units/{id}",
    params(("id" = i32, Path, description = "Unit ID")),
    responses(
        (status = 200, description = "Unit fetched", body = ApiResponse<UnitView>),
        (status = 404, description = "Unit not found", body = crate::errors::ErrorResponse)
    ),
    tag = "units"
)]
pub async fn get_unit(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    Ok(success_response(state.catalog.get_unit(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/units",
    request_body = CreateUnitRequest,
    responses(
        (status = 201, description = "Unit created", body = ApiResponse<UnitView>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "units"
)]
pub async fn create_unit(
    State(state): State<AppState>,
    Json(payload): Json<CreateUnitRequest>,
) -> Result<Response, ApiError> {
    validate_input(&payload)?;
    Ok(created_response(state.catalog.create_unit(payload).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/units/{id}",
    params(("id" = i32, Path, description = "Unit ID")),
    request_body = UpdateUnitRequest,
    responses(
        (status = 200, description = "Unit updated", body = ApiResponse<UnitView>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unit not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "units"
)]
pub async fn update_unit(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateUnitRequest>,
) -> Result<Response, ApiError> {
    validate_input(&payload)?;
    Ok(success_response(state.catalog.update_unit(id, payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/units/{id}",
    params(("id" = i32, Path, description = "Unit ID")),
    responses(
        (status = 204, description = "Unit deleted"),
        (status = 404, description = "Unit not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "units"
)]
pub async fn delete_unit(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    state.catalog.delete_unit(id).await?;
    Ok(no_content_response())
}
