//! The authenticated principal attached to every request.

use serde::{Deserialize, Serialize};

use crate::scope::RoleDataScope;

/// Role code that bypasses all permission and data-scope checks.
pub const SUPER_ADMIN_ROLE: &str = "ROOT";

/// Synthetic role code assigned when a user has no enabled roles.
pub const DEFAULT_ROLE: &str = "DEFAULT";

/// Authenticated user identity carried through the request pipeline.
///
/// Built once at login (or re-derived from token claims) and treated as
/// immutable for the lifetime of the token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserDetails {
    /// The user's database ID.
    pub user_id: i64,
    /// Login name.
    pub username: String,
    /// Department the user belongs to, if any.
    pub dept_id: Option<i64>,
    /// Enabled role codes at the time of authentication.
    pub roles: Vec<String>,
    /// Resolved data scopes, one entry per contributing role.
    ///
    /// Empty when the identity was rebuilt from a stateful session
    /// record; scopes are then re-resolved on demand.
    #[serde(default)]
    pub scopes: Vec<RoleDataScope>,
}

impl UserDetails {
    /// Whether this user holds the super-admin role.
    pub fn is_super_admin(&self) -> bool {
        self.roles.iter().any(|r| r == SUPER_ADMIN_ROLE)
    }

    /// Whether the user holds the given role code.
    pub fn has_role(&self, code: &str) -> bool {
        self.roles.iter().any(|r| r == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn super_admin_detection() {
        let admin = UserDetails {
            user_id: 1,
            username: "root".to_string(),
            dept_id: None,
            roles: vec!["ROOT".to_string()],
            scopes: vec![],
        };
        assert!(admin.is_super_admin());

        let clerk = UserDetails {
            user_id: 2,
            username: "clerk".to_string(),
            dept_id: Some(3),
            roles: vec!["CLERK".to_string()],
            scopes: vec![],
        };
        assert!(!clerk.is_super_admin());
        assert!(clerk.has_role("CLERK"));
        assert!(!clerk.has_role("ROOT"));
    }
}
