//! The database-backed credential store used by the auth core.

use async_trait::async_trait;
use sqlx::PgPool;

use kanri_auth::store::CredentialStore;
use kanri_core::AppResult;
use kanri_entity::menu::RolePerm;
use kanri_entity::role::RoleScope;
use kanri_entity::user::User;

use crate::repositories::{DepartmentRepository, MenuRepository, RoleRepository, UserRepository};

/// Implements [`CredentialStore`] over the concrete repositories.
#[derive(Debug, Clone)]
pub struct CredentialDirectory {
    users: UserRepository,
    roles: RoleRepository,
    departments: DepartmentRepository,
    menus: MenuRepository,
}

impl CredentialDirectory {
    /// Create a directory over the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            roles: RoleRepository::new(pool.clone()),
            departments: DepartmentRepository::new(pool.clone()),
            menus: MenuRepository::new(pool),
        }
    }
}

#[async_trait]
impl CredentialStore for CredentialDirectory {
    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        self.users.find_by_username(username).await
    }

    async fn find_user_by_id(&self, user_id: i64) -> AppResult<Option<User>> {
        self.users.find_by_id(user_id).await
    }

    async fn role_codes_by_user(&self, user_id: i64) -> AppResult<Vec<String>> {
        self.users.role_codes(user_id).await
    }

    async fn role_scopes(&self, role_codes: &[String]) -> AppResult<Vec<RoleScope>> {
        self.roles.scopes_by_codes(role_codes).await
    }

    async fn department_path(&self, dept_id: i64) -> AppResult<Option<String>> {
        self.departments.ancestor_path(dept_id).await
    }

    async fn descendant_department_ids(&self, dept_id: i64, own_path: &str) -> AppResult<Vec<i64>> {
        self.departments.subtree_ids(dept_id, own_path).await
    }

    async fn custom_department_ids(&self, role_codes: &[String]) -> AppResult<Vec<(String, i64)>> {
        self.roles.custom_dept_grants(role_codes).await
    }

    async fn all_role_codes(&self) -> AppResult<Vec<String>> {
        self.roles.all_codes().await
    }

    async fn perms_by_roles(&self, role_codes: &[String]) -> AppResult<Vec<RolePerm>> {
        self.menus.perms_by_role_codes(role_codes).await
    }
}
