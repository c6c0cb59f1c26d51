//! Menu entity model.
//!
//! Menus double as the permission catalog: button-level menu entries
//! carry a permission string (e.g. `"system:user:remove"`) that the
//! role-permission cache aggregates per role.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A menu entry (directory, page, or button) in the admin console.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Menu {
    /// Unique menu identifier.
    pub id: i64,
    /// Parent menu id (`None` for top-level entries).
    pub parent_id: Option<i64>,
    /// Menu display name.
    pub name: String,
    /// Permission string guarding this entry, empty for pure containers.
    pub perms: Option<String>,
    /// Whether the menu is currently visible.
    pub visible: bool,
    /// When the menu was created.
    pub created_at: DateTime<Utc>,
}

/// Projection of a role code and one of its permission strings, as read
/// by the role-permission cache refresher.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RolePerm {
    /// Role code.
    pub role_code: String,
    /// One permission string granted to that role.
    pub perm: String,
}
