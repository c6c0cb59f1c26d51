//! Auth handlers — login, logout, refresh, me.

use axum::Json;
use axum::extract::State;

use kanri_auth::token::AuthenticationToken;

use crate::dto::request::{LoginRequest, RefreshRequest};
use crate::dto::response::{ApiResponse, LoginResponse, MeResponse, MessageResponse, UserResponse};
use crate::error::ApiError;
use crate::extractors::{AuthUser, BearerToken};
use crate::state::AppState;

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let outcome = state.auth_service.login(&req.username, &req.password).await?;

    // Best-effort; a failed timestamp update must not fail the login.
    if let Err(e) = state.user_repo.touch_last_login(outcome.user.user_id).await {
        tracing::warn!(error = %e, "failed to record last login time");
    }

    let user = state
        .user_repo
        .find_by_id(outcome.user.user_id)
        .await?
        .map(UserResponse::from)
        .ok_or_else(ApiError::invalid_token)?;

    Ok(Json(ApiResponse::ok(LoginResponse {
        token: outcome.token,
        user,
    })))
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.auth_service.logout(&token).await?;

    Ok(Json(ApiResponse::ok(MessageResponse::new(
        "Logged out successfully",
    ))))
}

/// POST /api/auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<ApiResponse<AuthenticationToken>>, ApiError> {
    let token = state.auth_service.refresh(&req.refresh_token).await?;
    Ok(Json(ApiResponse::ok(token)))
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<MeResponse>>, ApiError> {
    let permissions = state.perm_cache.user_perms_by_roles(&auth.roles).await?;

    Ok(Json(ApiResponse::ok(MeResponse {
        user: auth.0,
        permissions,
    })))
}
