use super::common::success_response;
use crate::{
    auth::{AccountInfoRequest, AuthError, AuthUser, ChangePasswordRequest, UserProfile},
    ApiResponse, AppState,
};
use axum::{
    extract::{Json, State},
    response::Response,
};
use tracing::info;

#[utoipa::path(
    put,
    path = "/api/v1/user/account-info",
    request_body = AccountInfoRequest,
    responses(
        (status = 200, description = "Account updated", body = ApiResponse<UserProfile>),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Email already used by another account")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "users"
)]
pub async fn update_account_info(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AccountInfoRequest>,
) -> Result<Response, AuthError> {
    let updated = state.auth.update_account_info(user.user_id, payload).await?;
    info!(user_id = user.user_id, "account info updated");
    Ok(success_response(UserProfile::from(updated)))
}

#[utoipa::path(
    put,
    path = "/api/v1/user/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = ApiResponse<UserProfile>),
        (status = 400, description = "Invalid request or current password mismatch"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "users"
)]
pub async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Response, AuthError> {
    let updated = state.auth.change_password(user.user_id, payload).await?;
    Ok(success_response(UserProfile::from(updated)))
}
