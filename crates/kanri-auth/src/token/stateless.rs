//! Stateless JWT strategy with a cache-backed revocation side-channel.
//!
//! Tokens verify by signature alone; the cache is consulted only to
//! answer "has this token been revoked early". Two mechanisms cover
//! that: a per-jti blocklist for single-token logout, and a per-user
//! monotonic security version for revoke-everything. Both checks fail
//! closed — if the cache cannot be reached, the token is rejected.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::{debug, warn};
use uuid::Uuid;

use kanri_cache::{CacheManager, keys};
use kanri_core::config::auth::AuthConfig;
use kanri_core::traits::CacheProvider;
use kanri_core::{AppError, AppResult};

use crate::identity::UserDetails;

use super::claims::{Claims, TokenType};
use super::{AuthenticationToken, TokenManager};

/// Issues and validates signed stateless tokens.
#[derive(Clone)]
pub struct JwtTokenManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    cache: Arc<CacheManager>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl std::fmt::Debug for JwtTokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtTokenManager")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

impl JwtTokenManager {
    /// Creates a manager from auth configuration.
    pub fn new(config: &AuthConfig, cache: Arc<CacheManager>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 5; // 5 seconds leeway for clock skew

        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            cache,
            access_ttl: config.access_ttl(),
            refresh_ttl: config.refresh_ttl(),
        }
    }

    /// The user's current security version; absent counter means 0.
    async fn current_version(&self, user_id: i64) -> AppResult<i64> {
        let raw = self.cache.get(&keys::security_version(user_id)).await?;
        Ok(raw.and_then(|v| v.parse().ok()).unwrap_or(0))
    }

    fn sign(&self, claims: &Claims) -> AppResult<String> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to encode token: {e}")))
    }

    fn decode_claims(&self, token: &str) -> AppResult<Claims> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::unauthorized("Token has expired")
                }
                jsonwebtoken::errors::ErrorKind::InvalidToken => {
                    AppError::unauthorized("Invalid token format")
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    AppError::unauthorized("Invalid token signature")
                }
                _ => AppError::unauthorized(format!("Token validation failed: {e}")),
            }
        })?;
        Ok(data.claims)
    }

    /// Blocklist and security-version checks. Cache failure rejects the
    /// token rather than letting a possibly-revoked one through.
    async fn check_revocation(&self, claims: &Claims) -> AppResult<()> {
        let blocked = self
            .cache
            .exists(&keys::token_blocklist(&claims.jti.to_string()))
            .await?;
        if blocked {
            return Err(AppError::unauthorized("Token has been revoked"));
        }

        let version = self.current_version(claims.sub).await?;
        if claims.ver < version {
            return Err(AppError::unauthorized("Token has been superseded"));
        }

        Ok(())
    }

    async fn checked_claims(&self, token: &str, expected: TokenType) -> AppResult<Claims> {
        let claims = self.decode_claims(token)?;
        if claims.token_type != expected {
            return Err(AppError::unauthorized("Unexpected token type"));
        }
        self.check_revocation(&claims).await?;
        Ok(claims)
    }

    fn build_claims(
        &self,
        identity: &UserDetails,
        version: i64,
        token_type: TokenType,
        ttl: Duration,
    ) -> Claims {
        let now = Utc::now();
        Claims {
            sub: identity.user_id,
            username: identity.username.clone(),
            dept: identity.dept_id,
            roles: identity.roles.clone(),
            scopes: identity.scopes.clone(),
            ver: version,
            iat: now.timestamp(),
            exp: (now + chrono::Duration::seconds(ttl.as_secs() as i64)).timestamp(),
            jti: Uuid::new_v4(),
            token_type,
        }
    }
}

#[async_trait::async_trait]
impl TokenManager for JwtTokenManager {
    async fn generate_token(&self, identity: &UserDetails) -> AppResult<AuthenticationToken> {
        let version = self.current_version(identity.user_id).await?;

        let access = self.build_claims(identity, version, TokenType::Access, self.access_ttl);
        let refresh = self.build_claims(identity, version, TokenType::Refresh, self.refresh_ttl);

        Ok(AuthenticationToken {
            access_token: self.sign(&access)?,
            refresh_token: self.sign(&refresh)?,
            token_type: "Bearer".to_string(),
            expires_in: self.access_ttl.as_secs(),
        })
    }

    async fn parse_token(&self, access_token: &str) -> AppResult<UserDetails> {
        let claims = self.checked_claims(access_token, TokenType::Access).await?;
        Ok(claims.to_user_details())
    }

    async fn validate_token(&self, access_token: &str) -> bool {
        self.checked_claims(access_token, TokenType::Access)
            .await
            .is_ok()
    }

    async fn validate_refresh_token(&self, refresh_token: &str) -> bool {
        self.checked_claims(refresh_token, TokenType::Refresh)
            .await
            .is_ok()
    }

    async fn refresh_token(&self, refresh_token: &str) -> AppResult<AuthenticationToken> {
        let claims = self
            .checked_claims(refresh_token, TokenType::Refresh)
            .await?;

        // Re-issue the access token against the *current* version, so a
        // revoke-all between issuance and refresh is not resurrected.
        let identity = claims.to_user_details();
        let version = self.current_version(identity.user_id).await?;
        let access = self.build_claims(&identity, version, TokenType::Access, self.access_ttl);

        Ok(AuthenticationToken {
            access_token: self.sign(&access)?,
            refresh_token: refresh_token.to_string(),
            token_type: "Bearer".to_string(),
            expires_in: self.access_ttl.as_secs(),
        })
    }

    async fn invalidate_token(&self, access_token: &str) -> AppResult<()> {
        let claims = match self.decode_claims(access_token) {
            Ok(claims) => claims,
            Err(e) => {
                // Already expired or malformed: nothing left to revoke.
                debug!(error = %e, "skipping blocklist for undecodable token");
                return Ok(());
            }
        };

        let remaining = claims.remaining_ttl_seconds();
        if remaining == 0 {
            return Ok(());
        }

        // TTL matches the token's own remaining lifetime, so the
        // blocklist never outlives what it blocks.
        self.cache
            .set(
                &keys::token_blocklist(&claims.jti.to_string()),
                "revoked",
                Duration::from_secs(remaining),
            )
            .await?;
        Ok(())
    }

    async fn invalidate_user_sessions(&self, user_id: i64) -> AppResult<()> {
        // Bumping the counter strands every token issued under a lower
        // version. The counter key is persistent; it must survive
        // longer than any outstanding refresh token.
        let version = self.cache.incr(&keys::security_version(user_id)).await?;
        warn!(user_id, version, "all sessions invalidated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{identity, memory_cache};

    fn manager() -> JwtTokenManager {
        let config = AuthConfig {
            jwt_secret: "test-secret".to_string(),
            ..AuthConfig::default()
        };
        JwtTokenManager::new(&config, memory_cache())
    }

    #[tokio::test]
    async fn issued_token_round_trips_the_identity() {
        let manager = manager();
        let user = identity(42, "taro", &["EDITOR"]);

        let token = manager.generate_token(&user).await.unwrap();
        assert_eq!(token.token_type, "Bearer");
        assert!(manager.validate_token(&token.access_token).await);

        let parsed = manager.parse_token(&token.access_token).await.unwrap();
        assert_eq!(parsed, user);
    }

    #[tokio::test]
    async fn refresh_token_is_not_accepted_as_access() {
        let manager = manager();
        let token = manager
            .generate_token(&identity(1, "taro", &["EDITOR"]))
            .await
            .unwrap();

        assert!(manager.parse_token(&token.refresh_token).await.is_err());
        assert!(manager.validate_refresh_token(&token.refresh_token).await);
        assert!(!manager.validate_refresh_token(&token.access_token).await);
    }

    #[tokio::test]
    async fn tampered_token_is_rejected() {
        let manager = manager();
        let token = manager
            .generate_token(&identity(1, "taro", &["EDITOR"]))
            .await
            .unwrap();

        let mut forged = token.access_token.clone();
        forged.pop();
        forged.push('x');
        assert!(!manager.validate_token(&forged).await);
        assert!(!manager.validate_token("not-a-jwt").await);
    }

    #[tokio::test]
    async fn invalidated_token_fails_while_siblings_survive() {
        let manager = manager();
        let user = identity(1, "taro", &["EDITOR"]);
        let first = manager.generate_token(&user).await.unwrap();
        let second = manager.generate_token(&user).await.unwrap();

        manager.invalidate_token(&first.access_token).await.unwrap();

        assert!(!manager.validate_token(&first.access_token).await);
        assert!(manager.validate_token(&second.access_token).await);
    }

    #[tokio::test]
    async fn invalidating_garbage_is_a_noop() {
        let manager = manager();
        assert!(manager.invalidate_token("garbage").await.is_ok());
    }

    #[tokio::test]
    async fn session_invalidation_strands_all_prior_tokens() {
        let manager = manager();
        let user = identity(1, "taro", &["EDITOR"]);
        let old = manager.generate_token(&user).await.unwrap();

        manager.invalidate_user_sessions(1).await.unwrap();

        assert!(!manager.validate_token(&old.access_token).await);
        assert!(!manager.validate_refresh_token(&old.refresh_token).await);

        // Tokens issued after the bump are valid again.
        let fresh = manager.generate_token(&user).await.unwrap();
        assert!(manager.validate_token(&fresh.access_token).await);
    }

    #[tokio::test]
    async fn refresh_issues_a_new_access_token() {
        let manager = manager();
        let token = manager
            .generate_token(&identity(1, "taro", &["EDITOR"]))
            .await
            .unwrap();

        let renewed = manager.refresh_token(&token.refresh_token).await.unwrap();
        assert!(manager.validate_token(&renewed.access_token).await);
        assert_eq!(renewed.refresh_token, token.refresh_token);
    }

    #[tokio::test]
    async fn refresh_with_an_access_token_is_rejected() {
        let manager = manager();
        let token = manager
            .generate_token(&identity(1, "taro", &["EDITOR"]))
            .await
            .unwrap();

        assert!(manager.refresh_token(&token.access_token).await.is_err());
    }
}
