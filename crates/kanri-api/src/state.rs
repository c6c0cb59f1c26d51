//! Application state shared across all handlers and middleware.

use std::sync::Arc;
use std::time::Instant;

use sqlx::PgPool;

use kanri_auth::perms::RolePermissionCache;
use kanri_auth::scope::DataScopeResolver;
use kanri_auth::service::AuthService;
use kanri_auth::token::TokenManager;
use kanri_cache::provider::CacheManager;
use kanri_core::config::AppConfig;
use kanri_database::repositories::{MenuRepository, RoleRepository, UserRepository};

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,

    /// PostgreSQL connection pool.
    pub db_pool: PgPool,
    /// Cache manager (Redis or in-memory).
    pub cache: Arc<CacheManager>,
    /// Server start time, for health reporting.
    pub started_at: Instant,

    /// Active token strategy.
    pub token_manager: Arc<dyn TokenManager>,
    /// Login/logout/refresh orchestration.
    pub auth_service: Arc<AuthService>,
    /// Data-scope resolution engine.
    pub scope_resolver: Arc<DataScopeResolver>,
    /// Role-permission cache.
    pub perm_cache: Arc<RolePermissionCache>,

    /// User repository.
    pub user_repo: Arc<UserRepository>,
    /// Role repository.
    pub role_repo: Arc<RoleRepository>,
    /// Menu repository.
    pub menu_repo: Arc<MenuRepository>,
}
