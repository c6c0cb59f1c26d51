//! Department repository implementation.
//!
//! Departments form a tree flattened into a materialized ancestor path
//! (`ancestors` column, e.g. `"0,3"`). Subtree queries are a prefix
//! match on that path, no recursion needed.

use sqlx::PgPool;

use kanri_core::error::{AppError, ErrorKind};
use kanri_core::result::AppResult;
use kanri_entity::department::Department;

/// Repository for department tree lookups.
#[derive(Debug, Clone)]
pub struct DepartmentRepository {
    pool: PgPool,
}

impl DepartmentRepository {
    /// Create a new department repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a department by primary key.
    pub async fn find_by_id(&self, id: i64) -> AppResult<Option<Department>> {
        sqlx::query_as::<_, Department>("SELECT * FROM departments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find department", e))
    }

    /// The ancestor path of an enabled department.
    pub async fn ancestor_path(&self, id: i64) -> AppResult<Option<String>> {
        sqlx::query_scalar::<_, String>(
            "SELECT ancestors FROM departments WHERE id = $1 AND enabled = TRUE",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to load department path", e)
        })
    }

    /// The department itself plus all enabled descendants.
    ///
    /// A direct child's `ancestors` equals the parent's own path;
    /// deeper descendants extend it with a comma.
    pub async fn subtree_ids(&self, id: i64, own_path: &str) -> AppResult<Vec<i64>> {
        sqlx::query_scalar::<_, i64>(
            "SELECT id FROM departments \
             WHERE enabled = TRUE \
               AND (id = $1 OR ancestors = $2 OR ancestors LIKE $2 || ',%') \
             ORDER BY id",
        )
        .bind(id)
        .bind(own_path)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to load department subtree", e)
        })
    }
}
