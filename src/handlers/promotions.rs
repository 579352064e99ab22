use super::common::{created_response, no_content_response, success_response, validate_input};
use crate::{
    errors::ApiError,
    services::promotions::{CreateDiscountRequest, DiscountDetail, UpdateDiscountRequest},
    ApiResponse, AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::Response,
};
use tracing::info;

#[utoipa::path(
    get,
    path = "/api/v1/promotions",
    responses(
        (status = 200, description = "Discounts listed", body = ApiResponse<Vec<DiscountDetail>>),
    ),
    tag = "promotions"
)]
pub async fn list_promotions(State(state): State<AppState>) -> Result<Response, ApiError> {
    let discounts = state.promotions.list_discounts().await?;
    Ok(success_response(discounts))
}

#[utoipa::path(
    get,
    path = "/api/v1/promotions/{id}",
    params(("id" = i32, Path, description = "Discount ID")),
    responses(
        (status = 200, description = "Discount fetched", body = ApiResponse<DiscountDetail>),
        (status = 404, description = "Discount not found", body = crate::errors::ErrorResponse)
    ),
    tag = "promotions"
)]
pub async fn get_promotion(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    let discount = state.promotions.get_discount(id).await?;
    Ok(success_response(discount))
}

#[utoipa::path(
    post,
    path = "/api/v1/promotions",
    request_body = CreateDiscountRequest,
    responses(
        (status = 201, description = "Discount created", body = ApiResponse<DiscountDetail>),
        (status = 400, description = "Invalid request or unknown unit/package ids", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "promotions"
)]
pub async fn create_promotion(
    State(state): State<AppState>,
    Json(payload): Json<CreateDiscountRequest>,
) -> Result<Response, ApiError> {
    validate_input(&payload)?;
    let created = state.promotions.create_discount(payload).await?;
    info!(discount_id = created.id, "promotion created via API");
    Ok(created_response(created))
}

#[utoipa::path(
    put,
    path = "/api/v1/promotions/{id}",
    params(("id" = i32, Path, description = "Discount ID")),
    request_body = UpdateDiscountRequest,
    responses(
        (status = 200, description = "Discount updated", body = ApiResponse<DiscountDetail>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Discount not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "promotions"
)]
pub async fn update_promotion(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateDiscountRequest>,
) -> Result<Response, ApiError> {
    validate_input(&payload)?;
    let updated = state.promotions.update_discount(id, payload).await?;
    Ok(success_response(updated))
}

#[utoipa::path(
    delete,
    path = "/api/v1/promotions/{id}",
    params(("id" = i32, Path, description = "Discount ID")),
    responses(
        (status = 204, description = "Discount deleted"),
        (status = 404, description = "Discount not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "promotions"
)]
pub async fn delete_promotion(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    state.promotions.delete_discount(id).await?;
    Ok(no_content_response())
}
