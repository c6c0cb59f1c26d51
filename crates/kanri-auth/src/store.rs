//! Read-only credential and organization directory.
//!
//! The auth core never writes to the relational store; it only reads
//! users, roles, departments, and permission strings. The concrete
//! implementation lives in `kanri-database`.

use async_trait::async_trait;

use kanri_core::AppResult;
use kanri_entity::menu::RolePerm;
use kanri_entity::role::RoleScope;
use kanri_entity::user::User;

/// Read access to users, roles, departments, and permissions.
#[async_trait]
pub trait CredentialStore: Send + Sync + std::fmt::Debug + 'static {
    /// Looks up a user by login name.
    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>>;

    /// Looks up a user by ID.
    async fn find_user_by_id(&self, user_id: i64) -> AppResult<Option<User>>;

    /// Enabled role codes assigned to the user.
    async fn role_codes_by_user(&self, user_id: i64) -> AppResult<Vec<String>>;

    /// Data-scope settings for the given enabled roles.
    async fn role_scopes(&self, role_codes: &[String]) -> AppResult<Vec<RoleScope>>;

    /// Materialized ancestor path of a department (e.g. `"0,3"`), or
    /// `None` when the department does not exist or is disabled.
    async fn department_path(&self, dept_id: i64) -> AppResult<Option<String>>;

    /// IDs of the department itself plus every enabled descendant.
    ///
    /// `own_path` is the department's own materialized path
    /// (ancestors plus its own ID), used as the prefix match.
    async fn descendant_department_ids(&self, dept_id: i64, own_path: &str) -> AppResult<Vec<i64>>;

    /// Explicitly granted department IDs for roles with custom scope,
    /// as `(role_code, dept_id)` pairs.
    async fn custom_department_ids(&self, role_codes: &[String]) -> AppResult<Vec<(String, i64)>>;

    /// Codes of every enabled role in the system.
    async fn all_role_codes(&self) -> AppResult<Vec<String>>;

    /// Permission strings granted to the given roles through their
    /// visible menus, as `(role_code, perm)` pairs.
    async fn perms_by_roles(&self, role_codes: &[String]) -> AppResult<Vec<RolePerm>>;
}
