//! User handlers — scoped listing and session administration.

use axum::Json;
use axum::extract::{Path, Query, State};

use kanri_core::types::pagination::{PageRequest, PageResponse};
use kanri_database::repositories::UserListFilter;
use kanri_entity::user::User;

use crate::dto::request::ListUsersParams;
use crate::dto::response::{ApiResponse, MessageResponse};
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::middleware::rbac::require_perm;
use crate::state::AppState;

/// GET /api/users
///
/// Listing is always filtered through the caller's resolved data
/// scopes; there is no opt-out.
pub async fn list_users(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<ListUsersParams>,
) -> Result<Json<ApiResponse<PageResponse<User>>>, ApiError> {
    require_perm(&state, &auth, "system:user:list").await?;

    let page = PageRequest::new(params.page.unwrap_or(1), params.page_size.unwrap_or(20));
    let filter = UserListFilter {
        username: params.username,
        status: params.status,
        dept_id: params.dept_id,
    };

    let scopes = state.scope_resolver.effective_scopes(&auth).await;
    let users = state
        .user_repo
        .list_in_scope(&auth, &scopes, &filter, &page)
        .await?;

    Ok(Json(ApiResponse::ok(users)))
}

/// DELETE /api/users/{id}/sessions
///
/// Force-logout: revokes every outstanding token of the target user.
pub async fn force_logout(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<i64>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    require_perm(&state, &auth, "system:user:force-logout").await?;

    state.auth_service.logout_everywhere(user_id).await?;

    Ok(Json(ApiResponse::ok(MessageResponse::new(
        "All sessions terminated",
    ))))
}
