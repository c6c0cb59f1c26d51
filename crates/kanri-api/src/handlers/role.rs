//! Role handlers — menu grant administration.

use axum::Json;
use axum::extract::{Path, State};
use tracing::info;

use crate::dto::request::RoleMenusRequest;
use crate::dto::response::{ApiResponse, MessageResponse};
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::middleware::rbac::require_perm;
use crate::state::AppState;

/// PUT /api/roles/{id}/menus
///
/// Replaces the role's menu grants and refreshes its permission cache
/// entry so the change takes effect immediately.
pub async fn update_role_menus(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(role_id): Path<i64>,
    Json(req): Json<RoleMenusRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    require_perm(&state, &auth, "system:role:update").await?;

    let code = state.role_repo.replace_menus(role_id, &req.menu_ids).await?;

    // The grant edit is committed; a refresh failure must not undo
    // that from the caller's point of view.
    state
        .perm_cache
        .refresh_after_mutation(std::slice::from_ref(&code))
        .await;

    info!(role_id, role = %code, menus = req.menu_ids.len(), "role menus updated");
    Ok(Json(ApiResponse::ok(MessageResponse::new(
        "Role menus updated",
    ))))
}
