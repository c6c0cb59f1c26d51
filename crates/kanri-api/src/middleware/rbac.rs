//! Permission guards for route handlers.

use kanri_core::error::AppError;

use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// Checks that the authenticated user holds the given permission
/// string. The super admin bypasses the check entirely.
pub async fn require_perm(state: &AppState, auth: &AuthUser, perm: &str) -> Result<(), ApiError> {
    if auth.is_super_admin() {
        return Ok(());
    }

    let granted = state.perm_cache.user_perms_by_roles(&auth.roles).await?;
    if granted.contains(perm) {
        Ok(())
    } else {
        Err(ApiError(AppError::forbidden(format!(
            "Missing permission: {perm}"
        ))))
    }
}
