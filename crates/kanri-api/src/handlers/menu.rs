//! Menu handlers — permission string administration.

use axum::Json;
use axum::extract::{Path, State};
use tracing::info;

use crate::dto::request::MenuPermsRequest;
use crate::dto::response::{ApiResponse, MessageResponse};
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::middleware::rbac::require_perm;
use crate::state::AppState;

/// PUT /api/menus/{id}/perms
///
/// Updates a menu's permission string and refreshes the cache entries
/// of every role granted this menu.
pub async fn update_menu_perms(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(menu_id): Path<i64>,
    Json(req): Json<MenuPermsRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    require_perm(&state, &auth, "system:menu:update").await?;

    let affected = state
        .menu_repo
        .update_perms(menu_id, req.perms.as_deref())
        .await?;
    if !affected.is_empty() {
        // The perm string is already persisted; cache refresh failures
        // are logged and left to the hash TTL.
        state.perm_cache.refresh_after_mutation(&affected).await;
    }

    info!(menu_id, roles = affected.len(), "menu perms updated");
    Ok(Json(ApiResponse::ok(MessageResponse::new(
        "Menu permissions updated",
    ))))
}
