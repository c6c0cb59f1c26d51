//! Kanri server — administrative backend with pluggable session
//! strategies and row-level data scoping.
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;
use std::time::Instant;

use tracing_subscriber::{EnvFilter, fmt};

use kanri_core::config::AppConfig;
use kanri_core::error::AppError;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let config_path =
        std::env::var("KANRI_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());
    AppConfig::load(&config_path)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Kanri v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Database connection + migrations ─────────────────
    let db = kanri_database::DatabasePool::connect(&config.database).await?;
    kanri_database::migration::run_migrations(db.pool()).await?;

    // ── Step 2: Cache ────────────────────────────────────────────
    tracing::info!(provider = %config.cache.provider, "Initializing cache");
    let cache = Arc::new(kanri_cache::CacheManager::new(&config.cache).await?);

    // ── Step 3: Repositories and credential directory ────────────
    let user_repo = Arc::new(kanri_database::repositories::UserRepository::new(
        db.pool().clone(),
    ));
    let role_repo = Arc::new(kanri_database::repositories::RoleRepository::new(
        db.pool().clone(),
    ));
    let menu_repo = Arc::new(kanri_database::repositories::MenuRepository::new(
        db.pool().clone(),
    ));
    let directory: Arc<dyn kanri_auth::CredentialStore> =
        Arc::new(kanri_database::CredentialDirectory::new(db.pool().clone()));

    // ── Step 4: Auth system ──────────────────────────────────────
    tracing::info!(strategy = %config.auth.strategy, "Initializing token manager");
    let token_manager = kanri_auth::build_token_manager(&config.auth, Arc::clone(&cache))?;
    let scope_resolver = Arc::new(kanri_auth::scope::DataScopeResolver::new(Arc::clone(
        &directory,
    )));
    let auth_service = Arc::new(kanri_auth::AuthService::new(
        Arc::clone(&directory),
        Arc::clone(&token_manager),
        Arc::clone(&scope_resolver),
    ));
    let perm_cache = Arc::new(kanri_auth::perms::RolePermissionCache::new(
        Arc::clone(&cache),
        Arc::clone(&directory),
    ));

    // Warm the permission cache; startup continues on failure since
    // reads fall back to the database.
    if let Err(e) = perm_cache.refresh_all().await {
        tracing::warn!(error = %e, "initial permission cache refresh failed");
    }

    // ── Step 5: HTTP server ──────────────────────────────────────
    let state = kanri_api::AppState {
        config: Arc::new(config.clone()),
        db_pool: db.pool().clone(),
        cache,
        started_at: Instant::now(),
        token_manager,
        auth_service,
        scope_resolver,
        perm_cache,
        user_repo,
        role_repo,
        menu_repo,
    };

    let app = kanri_api::build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!("Kanri server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    db.close().await;
    tracing::info!("Kanri server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
