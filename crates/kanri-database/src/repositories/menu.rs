//! Menu repository implementation.

use sqlx::PgPool;

use kanri_core::error::{AppError, ErrorKind};
use kanri_core::result::AppResult;
use kanri_entity::menu::{Menu, RolePerm};

/// Repository for menu queries and permission-string maintenance.
#[derive(Debug, Clone)]
pub struct MenuRepository {
    pool: PgPool,
}

impl MenuRepository {
    /// Create a new menu repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a menu by primary key.
    pub async fn find_by_id(&self, id: i64) -> AppResult<Option<Menu>> {
        sqlx::query_as::<_, Menu>("SELECT * FROM menus WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find menu", e))
    }

    /// Permission strings granted to the given roles through their
    /// visible menus.
    pub async fn perms_by_role_codes(&self, codes: &[String]) -> AppResult<Vec<RolePerm>> {
        sqlx::query_as::<_, RolePerm>(
            "SELECT r.code AS role_code, m.perms AS perm FROM roles r \
             JOIN role_menus rm ON rm.role_id = r.id \
             JOIN menus m ON m.id = rm.menu_id \
             WHERE r.code = ANY($1) AND r.enabled = TRUE \
               AND m.visible = TRUE AND m.perms IS NOT NULL AND m.perms <> ''",
        )
        .bind(codes)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to load role permissions", e)
        })
    }

    /// Updates a menu's permission string. Returns the codes of every
    /// enabled role granted this menu, for permission-cache refresh.
    pub async fn update_perms(&self, menu_id: i64, perms: Option<&str>) -> AppResult<Vec<String>> {
        let updated = sqlx::query("UPDATE menus SET perms = $2 WHERE id = $1")
            .bind(menu_id)
            .bind(perms)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to update menu perms", e)
            })?;
        if updated.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Menu {menu_id} not found")));
        }

        sqlx::query_scalar::<_, String>(
            "SELECT r.code FROM roles r \
             JOIN role_menus rm ON rm.role_id = r.id \
             WHERE rm.menu_id = $1 AND r.enabled = TRUE",
        )
        .bind(menu_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to load roles for menu", e)
        })
    }
}
