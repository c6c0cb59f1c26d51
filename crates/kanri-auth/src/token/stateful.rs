//! Stateful strategy: opaque tokens backed by server-side sessions.
//!
//! The token string is random and carries no information; everything
//! lives in the cache. Forward keys map token → session record, reverse
//! keys map user → current token so a user holds at most one live
//! session per token kind (single-device login). Record TTLs are the
//! session lifetime, so expiry needs no sweeper.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::RngExt;
use rand::distr::Alphanumeric;
use tracing::{debug, warn};

use kanri_cache::{CacheManager, keys};
use kanri_core::config::auth::AuthConfig;
use kanri_core::traits::CacheProvider;
use kanri_core::{AppError, AppResult};

use kanri_entity::session::OnlineUser;

use crate::identity::UserDetails;

use super::{AuthenticationToken, TokenManager};

/// Length of generated opaque token strings.
const TOKEN_LENGTH: usize = 32;

/// Issues and validates opaque cache-backed session tokens.
#[derive(Clone)]
pub struct CacheTokenManager {
    cache: Arc<CacheManager>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl std::fmt::Debug for CacheTokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheTokenManager")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

impl CacheTokenManager {
    /// Creates a manager from auth configuration.
    pub fn new(config: &AuthConfig, cache: Arc<CacheManager>) -> Self {
        Self {
            cache,
            access_ttl: config.access_ttl(),
            refresh_ttl: config.refresh_ttl(),
        }
    }

    fn new_opaque_token() -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LENGTH)
            .map(char::from)
            .collect()
    }

    /// Drops the forward record a reverse index points at, if any.
    async fn evict_current(
        &self,
        reverse_key: &str,
        forward_key: fn(&str) -> String,
    ) -> AppResult<()> {
        if let Some(old_token) = self.cache.get(reverse_key).await? {
            self.cache.delete(&forward_key(&old_token)).await?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl TokenManager for CacheTokenManager {
    async fn generate_token(&self, identity: &UserDetails) -> AppResult<AuthenticationToken> {
        let record = OnlineUser {
            user_id: identity.user_id,
            username: identity.username.clone(),
            dept_id: identity.dept_id,
            roles: identity.roles.clone(),
            login_at: Utc::now(),
            ip_address: None,
        };
        let payload = serde_json::to_string(&record)?;

        // Single-device login: retire whatever this user held before.
        self.evict_current(&keys::user_access_token(identity.user_id), keys::online_access)
            .await?;
        self.evict_current(&keys::user_refresh_token(identity.user_id), keys::online_refresh)
            .await?;

        let access_token = Self::new_opaque_token();
        let refresh_token = Self::new_opaque_token();

        // Forward records first; a failure past this point leaves
        // records that validation can still reject or TTL reclaims.
        self.cache
            .set(&keys::online_access(&access_token), &payload, self.access_ttl)
            .await?;
        self.cache
            .set(&keys::online_refresh(&refresh_token), &payload, self.refresh_ttl)
            .await?;
        self.cache
            .set(
                &keys::user_access_token(identity.user_id),
                &access_token,
                self.access_ttl,
            )
            .await?;
        self.cache
            .set(
                &keys::user_refresh_token(identity.user_id),
                &refresh_token,
                self.refresh_ttl,
            )
            .await?;

        Ok(AuthenticationToken {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_ttl.as_secs(),
        })
    }

    async fn parse_token(&self, access_token: &str) -> AppResult<UserDetails> {
        let record: OnlineUser = self
            .cache
            .get_json(&keys::online_access(access_token))
            .await?
            .ok_or_else(|| AppError::unauthorized("Invalid or expired token"))?;

        // Scopes are left empty here; callers re-resolve them from the
        // store so permission changes apply to live sessions.
        Ok(UserDetails {
            user_id: record.user_id,
            username: record.username,
            dept_id: record.dept_id,
            roles: record.roles,
            scopes: Vec::new(),
        })
    }

    async fn validate_token(&self, access_token: &str) -> bool {
        match self.cache.exists(&keys::online_access(access_token)).await {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, "session lookup failed, rejecting token");
                false
            }
        }
    }

    async fn validate_refresh_token(&self, refresh_token: &str) -> bool {
        match self.cache.exists(&keys::online_refresh(refresh_token)).await {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, "session lookup failed, rejecting refresh token");
                false
            }
        }
    }

    async fn refresh_token(&self, refresh_token: &str) -> AppResult<AuthenticationToken> {
        let record: OnlineUser = self
            .cache
            .get_json(&keys::online_refresh(refresh_token))
            .await?
            .ok_or_else(|| AppError::unauthorized("Invalid or expired refresh token"))?;
        let payload = serde_json::to_string(&record)?;

        // Retire the old access token; the refresh token stays put.
        self.evict_current(&keys::user_access_token(record.user_id), keys::online_access)
            .await?;

        let access_token = Self::new_opaque_token();
        self.cache
            .set(&keys::online_access(&access_token), &payload, self.access_ttl)
            .await?;
        self.cache
            .set(
                &keys::user_access_token(record.user_id),
                &access_token,
                self.access_ttl,
            )
            .await?;

        Ok(AuthenticationToken {
            access_token,
            refresh_token: refresh_token.to_string(),
            token_type: "Bearer".to_string(),
            expires_in: self.access_ttl.as_secs(),
        })
    }

    async fn invalidate_token(&self, access_token: &str) -> AppResult<()> {
        let Some(record) = self
            .cache
            .get_json::<OnlineUser>(&keys::online_access(access_token))
            .await?
        else {
            // Unknown or already-expired session: nothing to do.
            debug!("skipping invalidation for unknown session token");
            return Ok(());
        };

        // The whole session goes, refresh token included; logging out
        // of a device should not leave it able to mint new tokens.
        self.invalidate_user_sessions(record.user_id).await
    }

    async fn invalidate_user_sessions(&self, user_id: i64) -> AppResult<()> {
        self.evict_current(&keys::user_access_token(user_id), keys::online_access)
            .await?;
        self.evict_current(&keys::user_refresh_token(user_id), keys::online_refresh)
            .await?;
        self.cache.delete(&keys::user_access_token(user_id)).await?;
        self.cache.delete(&keys::user_refresh_token(user_id)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{identity, memory_cache};

    fn manager() -> CacheTokenManager {
        CacheTokenManager::new(&AuthConfig::default(), memory_cache())
    }

    #[tokio::test]
    async fn issued_token_resolves_to_the_identity() {
        let manager = manager();
        let user = identity(42, "taro", &["EDITOR"]);

        let token = manager.generate_token(&user).await.unwrap();
        assert!(manager.validate_token(&token.access_token).await);
        assert!(manager.validate_refresh_token(&token.refresh_token).await);

        let parsed = manager.parse_token(&token.access_token).await.unwrap();
        assert_eq!(parsed.user_id, 42);
        assert_eq!(parsed.username, "taro");
        assert_eq!(parsed.roles, vec!["EDITOR".to_string()]);
        // Stateful sessions never embed scopes.
        assert!(parsed.scopes.is_empty());
    }

    #[tokio::test]
    async fn unknown_token_is_rejected() {
        let manager = manager();
        assert!(!manager.validate_token("nope").await);
        assert!(manager.parse_token("nope").await.is_err());
    }

    #[tokio::test]
    async fn second_login_evicts_the_first_session() {
        let manager = manager();
        let user = identity(1, "taro", &["EDITOR"]);

        let first = manager.generate_token(&user).await.unwrap();
        let second = manager.generate_token(&user).await.unwrap();

        assert!(!manager.validate_token(&first.access_token).await);
        assert!(!manager.validate_refresh_token(&first.refresh_token).await);
        assert!(manager.validate_token(&second.access_token).await);
    }

    #[tokio::test]
    async fn refresh_rotates_the_access_token_only() {
        let manager = manager();
        let token = manager
            .generate_token(&identity(1, "taro", &["EDITOR"]))
            .await
            .unwrap();

        let renewed = manager.refresh_token(&token.refresh_token).await.unwrap();

        assert_ne!(renewed.access_token, token.access_token);
        assert_eq!(renewed.refresh_token, token.refresh_token);
        assert!(!manager.validate_token(&token.access_token).await);
        assert!(manager.validate_token(&renewed.access_token).await);
        assert!(manager.validate_refresh_token(&token.refresh_token).await);
    }

    #[tokio::test]
    async fn logout_kills_the_whole_session() {
        let manager = manager();
        let token = manager
            .generate_token(&identity(1, "taro", &["EDITOR"]))
            .await
            .unwrap();

        manager.invalidate_token(&token.access_token).await.unwrap();

        assert!(!manager.validate_token(&token.access_token).await);
        assert!(!manager.validate_refresh_token(&token.refresh_token).await);
        // Logging out twice is fine.
        assert!(manager.invalidate_token(&token.access_token).await.is_ok());
    }

    #[tokio::test]
    async fn admin_can_force_logout_by_user_id() {
        let manager = manager();
        let token = manager
            .generate_token(&identity(9, "hana", &["VIEWER"]))
            .await
            .unwrap();

        manager.invalidate_user_sessions(9).await.unwrap();

        assert!(!manager.validate_token(&token.access_token).await);
        assert!(!manager.validate_refresh_token(&token.refresh_token).await);
    }
}
