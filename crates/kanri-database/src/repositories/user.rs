//! User repository implementation.

use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};

use kanri_auth::identity::UserDetails;
use kanri_auth::scope::{RoleDataScope, ScopeColumns, apply_data_scope};
use kanri_core::error::{AppError, ErrorKind};
use kanri_core::result::AppResult;
use kanri_core::types::pagination::{PageRequest, PageResponse};
use kanri_entity::user::{User, UserStatus};

/// Optional filters for the scoped user listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserListFilter {
    /// Substring match on the username.
    pub username: Option<String>,
    /// Exact status match.
    pub status: Option<UserStatus>,
    /// Exact department match.
    pub dept_id: Option<i64>,
}

/// Repository for user lookups and scoped listings.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a user by primary key.
    pub async fn find_by_id(&self, id: i64) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find user by id", e))
    }

    /// Find a user by username (case-insensitive).
    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(username) = LOWER($1)")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find user by username", e)
            })
    }

    /// Enabled role codes assigned to the user.
    pub async fn role_codes(&self, user_id: i64) -> AppResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            "SELECT r.code FROM roles r \
             JOIN user_roles ur ON ur.role_id = r.id \
             WHERE ur.user_id = $1 AND r.enabled = TRUE \
             ORDER BY r.code",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load user roles", e))
    }

    /// List users visible to `identity` under its resolved scopes,
    /// with optional filters and pagination.
    pub async fn list_in_scope(
        &self,
        identity: &UserDetails,
        scopes: &[RoleDataScope],
        filter: &UserListFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<User>> {
        let columns = ScopeColumns::with_alias("u", "dept_id", "id");

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users u WHERE 1 = 1");
        push_filters(&mut count, filter);
        apply_data_scope(&mut count, identity, scopes, &columns)?;
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count users", e))?;

        let mut select = QueryBuilder::<Postgres>::new("SELECT u.* FROM users u WHERE 1 = 1");
        push_filters(&mut select, filter);
        apply_data_scope(&mut select, identity, scopes, &columns)?;
        select.push(" ORDER BY u.id LIMIT ");
        select.push_bind(page.limit() as i64);
        select.push(" OFFSET ");
        select.push_bind(page.offset() as i64);

        let users = select
            .build_query_as::<User>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list users", e))?;

        Ok(PageResponse::new(users, page, total as u64))
    }

    /// Record a successful login.
    pub async fn touch_last_login(&self, user_id: i64) -> AppResult<()> {
        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to update last login", e)
            })?;
        Ok(())
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &UserListFilter) {
    if let Some(username) = filter.username.clone().filter(|s| !s.is_empty()) {
        builder.push(" AND u.username ILIKE ");
        builder.push_bind(format!("%{username}%"));
    }
    if let Some(status) = filter.status {
        builder.push(" AND u.status = ");
        builder.push_bind(status);
    }
    if let Some(dept_id) = filter.dept_id {
        builder.push(" AND u.dept_id = ");
        builder.push_bind(dept_id);
    }
}
