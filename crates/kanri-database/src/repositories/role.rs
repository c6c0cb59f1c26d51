//! Role repository implementation.

use sqlx::PgPool;

use kanri_core::error::{AppError, ErrorKind};
use kanri_core::result::AppResult;
use kanri_entity::role::{Role, RoleScope};

/// Repository for role queries and role-menu grants.
#[derive(Debug, Clone)]
pub struct RoleRepository {
    pool: PgPool,
}

impl RoleRepository {
    /// Create a new role repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a role by primary key.
    pub async fn find_by_id(&self, id: i64) -> AppResult<Option<Role>> {
        sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find role by id", e))
    }

    /// Codes of every enabled role.
    pub async fn all_codes(&self) -> AppResult<Vec<String>> {
        sqlx::query_scalar::<_, String>("SELECT code FROM roles WHERE enabled = TRUE ORDER BY code")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list role codes", e))
    }

    /// Data-scope settings for the given enabled role codes.
    pub async fn scopes_by_codes(&self, codes: &[String]) -> AppResult<Vec<RoleScope>> {
        sqlx::query_as::<_, RoleScope>(
            "SELECT code, data_scope FROM roles WHERE code = ANY($1) AND enabled = TRUE",
        )
        .bind(codes)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load role scopes", e))
    }

    /// Custom-scope department grants for the given role codes, as
    /// `(role_code, dept_id)` pairs.
    pub async fn custom_dept_grants(&self, codes: &[String]) -> AppResult<Vec<(String, i64)>> {
        sqlx::query_as::<_, (String, i64)>(
            "SELECT r.code, rd.dept_id FROM role_depts rd \
             JOIN roles r ON r.id = rd.role_id \
             WHERE r.code = ANY($1)",
        )
        .bind(codes)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to load custom dept grants", e)
        })
    }

    /// Replaces a role's menu grants atomically. Returns the role's
    /// code so the caller can refresh the permission cache.
    pub async fn replace_menus(&self, role_id: i64, menu_ids: &[i64]) -> AppResult<String> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let code: Option<String> = sqlx::query_scalar("SELECT code FROM roles WHERE id = $1")
            .bind(role_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find role", e))?;
        let code = code.ok_or_else(|| AppError::not_found(format!("Role {role_id} not found")))?;

        sqlx::query("DELETE FROM role_menus WHERE role_id = $1")
            .bind(role_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to clear role menus", e)
            })?;

        if !menu_ids.is_empty() {
            sqlx::query(
                "INSERT INTO role_menus (role_id, menu_id) SELECT $1, UNNEST($2::BIGINT[])",
            )
            .bind(role_id)
            .bind(menu_ids)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to insert role menus", e)
            })?;
        }

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit role menus", e)
        })?;

        Ok(code)
    }
}
