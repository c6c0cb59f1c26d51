//! Request DTOs.

use serde::{Deserialize, Serialize};

use kanri_entity::user::UserStatus;

/// Login request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Login name.
    pub username: String,
    /// Plaintext password.
    pub password: String,
}

/// Token refresh request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    /// The refresh token obtained at login.
    pub refresh_token: String,
}

/// Query parameters for the scoped user listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListUsersParams {
    /// Page number (1-based).
    pub page: Option<u64>,
    /// Items per page.
    pub page_size: Option<u64>,
    /// Substring match on the username.
    pub username: Option<String>,
    /// Exact status match.
    pub status: Option<UserStatus>,
    /// Exact department match.
    pub dept_id: Option<i64>,
}

/// Replacement set of menu grants for a role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleMenusRequest {
    /// The menus the role may access.
    pub menu_ids: Vec<i64>,
}

/// New permission string for a menu.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuPermsRequest {
    /// The permission string, or `None` to clear it.
    pub perms: Option<String>,
}
