//! Pluggable token lifecycle management.
//!
//! Two strategies implement [`TokenManager`]: [`stateless::JwtTokenManager`]
//! signs self-contained JWTs and keeps only revocation state in the
//! cache, while [`stateful::CacheTokenManager`] hands out opaque tokens
//! backed entirely by server-side session records. The strategy is
//! chosen once at startup from configuration.

pub mod claims;
pub mod stateful;
pub mod stateless;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use kanri_cache::CacheManager;
use kanri_core::config::auth::AuthConfig;
use kanri_core::{AppError, AppResult};

use crate::identity::UserDetails;

pub use stateful::CacheTokenManager;
pub use stateless::JwtTokenManager;

/// The credential pair returned on login and refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticationToken {
    /// Short-lived token presented on every request.
    pub access_token: String,
    /// Long-lived token used only to obtain fresh access tokens.
    pub refresh_token: String,
    /// Always `"Bearer"`.
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

/// Full token lifecycle: issuance, validation, refresh, revocation.
#[async_trait::async_trait]
pub trait TokenManager: Send + Sync + std::fmt::Debug {
    /// Issues a fresh access + refresh pair for an authenticated user.
    async fn generate_token(&self, identity: &UserDetails) -> AppResult<AuthenticationToken>;

    /// Validates an access token and rebuilds the identity it carries.
    async fn parse_token(&self, access_token: &str) -> AppResult<UserDetails>;

    /// Whether an access token is currently valid. Infrastructure
    /// failures report `false`; possession of a token that cannot be
    /// verified grants nothing.
    async fn validate_token(&self, access_token: &str) -> bool;

    /// Whether a refresh token is currently valid.
    async fn validate_refresh_token(&self, refresh_token: &str) -> bool;

    /// Exchanges a valid refresh token for a new access token. The
    /// refresh token itself is not rotated.
    async fn refresh_token(&self, refresh_token: &str) -> AppResult<AuthenticationToken>;

    /// Revokes one access token. Revoking an expired or unknown token
    /// is a successful no-op.
    async fn invalidate_token(&self, access_token: &str) -> AppResult<()>;

    /// Revokes every outstanding token belonging to a user.
    async fn invalidate_user_sessions(&self, user_id: i64) -> AppResult<()>;
}

/// Builds the token manager named by `config.strategy`.
///
/// `"jwt"` selects the stateless strategy, `"cache"` the stateful one.
/// Anything else is a configuration error; there is no silent fallback.
pub fn build_token_manager(
    config: &AuthConfig,
    cache: Arc<CacheManager>,
) -> AppResult<Arc<dyn TokenManager>> {
    match config.strategy.as_str() {
        "jwt" => Ok(Arc::new(JwtTokenManager::new(config, cache))),
        "cache" => Ok(Arc::new(CacheTokenManager::new(config, cache))),
        other => Err(AppError::configuration(format!(
            "Unknown token strategy: '{other}'. Expected 'jwt' or 'cache'"
        ))),
    }
}
