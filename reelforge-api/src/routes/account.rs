/// Account self-service
///
/// - `PATCH /api/account` - Update display name and avatar
/// - `DELETE /api/account` - Delete the account, its sessions, and everything it owns

use axum::{extract::State, http::header, response::IntoResponse, Json};
use reelforge_shared::{
    auth::middleware::{clear_session_cookie, AuthUser},
    models::{double_option, user::UpdateUser},
};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ValidatedJson,
    middleware::request_id::RequestContext,
    routes::auth::UserResponse,
};

/// Profile update; `null` clears a field, an absent key leaves it alone
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[serde(default, deserialize_with = "double_option")]
    pub name: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub image: Option<Option<String>>,
}

pub async fn update_profile(
    State(state): State<AppState>,
    ctx: RequestContext,
    AuthUser(user): AuthUser,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> ApiResult<Json<UserResponse>> {
    let changes = UpdateUser {
        name: req.name,
        image: req.image,
        ..Default::default()
    };
    if changes.is_empty() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }

    let updated = state.auth.update_profile(user.id, changes).await.map_err(|e| {
        tracing::error!(request_id = %ctx.request_id, error = %e, "Failed to update profile");
        ApiError::InternalError("Failed to update profile".to_string())
    })?;

    updated
        .map(|user| Json(UserResponse { user }))
        .ok_or_else(ApiError::unauthorized)
}

pub async fn delete_account(
    State(state): State<AppState>,
    ctx: RequestContext,
    AuthUser(user): AuthUser,
) -> ApiResult<impl IntoResponse> {
    state.auth.delete_account(user.id).await.map_err(|e| {
        tracing::error!(request_id = %ctx.request_id, error = %e, "Failed to delete account");
        ApiError::InternalError("Failed to delete account".to_string())
    })?;

    tracing::info!(request_id = %ctx.request_id, user_id = %user.id, "Account deleted");

    Ok((
        [(header::SET_COOKIE, clear_session_cookie(state.secure_cookies()))],
        Json(json!({ "success": true })),
    ))
}
