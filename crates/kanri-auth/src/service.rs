//! Login, logout, and refresh orchestration.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use kanri_core::{AppError, AppResult};

use crate::identity::UserDetails;
use crate::password::PasswordHasher;
use crate::scope::DataScopeResolver;
use crate::store::CredentialStore;
use crate::token::{AuthenticationToken, TokenManager};

/// Everything a successful login hands back to the client.
#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    /// The issued credential pair.
    pub token: AuthenticationToken,
    /// The authenticated identity.
    pub user: UserDetails,
}

/// Coordinates credential verification, scope resolution, and token
/// issuance across both strategies.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    token_manager: Arc<dyn TokenManager>,
    resolver: Arc<DataScopeResolver>,
    hasher: PasswordHasher,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService").finish()
    }
}

impl AuthService {
    /// Wires the service together.
    pub fn new(
        store: Arc<dyn CredentialStore>,
        token_manager: Arc<dyn TokenManager>,
        resolver: Arc<DataScopeResolver>,
    ) -> Self {
        Self {
            store,
            token_manager,
            resolver,
            hasher: PasswordHasher::new(),
        }
    }

    /// Verifies credentials and issues a token pair.
    ///
    /// Unknown usernames and wrong passwords produce the same error so
    /// the response does not leak which accounts exist.
    pub async fn login(&self, username: &str, password: &str) -> AppResult<LoginOutcome> {
        let user = self
            .store
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::unauthorized("Invalid username or password"))?;

        if !self.hasher.verify_password(password, &user.password_hash)? {
            warn!(username, "failed login attempt");
            return Err(AppError::unauthorized("Invalid username or password"));
        }

        if !user.can_login() {
            return Err(AppError::forbidden("Account is disabled"));
        }

        let roles = self.store.role_codes_by_user(user.id).await?;
        let scopes = self
            .resolver
            .resolve_data_scopes(user.id, &roles, user.dept_id)
            .await;

        let identity = UserDetails {
            user_id: user.id,
            username: user.username,
            dept_id: user.dept_id,
            roles,
            scopes,
        };

        let token = self.token_manager.generate_token(&identity).await?;
        info!(user_id = identity.user_id, "user logged in");

        Ok(LoginOutcome {
            token,
            user: identity,
        })
    }

    /// Revokes the presented access token.
    pub async fn logout(&self, access_token: &str) -> AppResult<()> {
        self.token_manager.invalidate_token(access_token).await
    }

    /// Exchanges a refresh token for a new access token.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<AuthenticationToken> {
        self.token_manager.refresh_token(refresh_token).await
    }

    /// Revokes every session of a user (admin force-logout, password
    /// change, account disablement).
    pub async fn logout_everywhere(&self, user_id: i64) -> AppResult<()> {
        info!(user_id, "forcing logout of all sessions");
        self.token_manager.invalidate_user_sessions(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{StubStore, memory_cache};
    use crate::token::JwtTokenManager;
    use kanri_core::config::auth::AuthConfig;
    use kanri_core::error::ErrorKind;
    use kanri_entity::role::DataScopeKind;
    use kanri_entity::user::UserStatus;

    fn service(store: StubStore) -> AuthService {
        let store = Arc::new(store);
        let config = AuthConfig {
            jwt_secret: "test-secret".to_string(),
            ..AuthConfig::default()
        };
        let token_manager = Arc::new(JwtTokenManager::new(&config, memory_cache()));
        let resolver = Arc::new(DataScopeResolver::new(store.clone()));
        AuthService::new(store, token_manager, resolver)
    }

    fn store_with_taro() -> StubStore {
        StubStore::default()
            .with_user(1, "taro", "hunter2", Some(3), UserStatus::Active)
            .with_user_role(1, "EDITOR")
            .with_role_scope("EDITOR", DataScopeKind::DeptOnly)
    }

    #[tokio::test]
    async fn login_issues_a_working_token() {
        let service = service(store_with_taro());

        let outcome = service.login("taro", "hunter2").await.unwrap();
        assert_eq!(outcome.user.user_id, 1);
        assert_eq!(outcome.user.roles, vec!["EDITOR".to_string()]);
        assert_eq!(outcome.user.scopes.len(), 1);

        let parsed = service
            .token_manager
            .parse_token(&outcome.token.access_token)
            .await
            .unwrap();
        assert_eq!(parsed.user_id, 1);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_are_indistinguishable() {
        let service = service(store_with_taro());

        let wrong_password = service.login("taro", "nope").await.unwrap_err();
        let unknown_user = service.login("nobody", "nope").await.unwrap_err();

        assert_eq!(wrong_password.kind, ErrorKind::Unauthorized);
        assert_eq!(unknown_user.kind, ErrorKind::Unauthorized);
        assert_eq!(wrong_password.message, unknown_user.message);
    }

    #[tokio::test]
    async fn disabled_account_cannot_log_in() {
        let store = StubStore::default().with_user(
            2,
            "ghost",
            "hunter2",
            None,
            UserStatus::Disabled,
        );
        let service = service(store);

        let err = service.login("ghost", "hunter2").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn logout_revokes_the_access_token() {
        let service = service(store_with_taro());
        let outcome = service.login("taro", "hunter2").await.unwrap();

        service.logout(&outcome.token.access_token).await.unwrap();
        assert!(
            !service
                .token_manager
                .validate_token(&outcome.token.access_token)
                .await
        );
    }

    #[tokio::test]
    async fn refresh_returns_a_fresh_access_token() {
        let service = service(store_with_taro());
        let outcome = service.login("taro", "hunter2").await.unwrap();

        let renewed = service.refresh(&outcome.token.refresh_token).await.unwrap();
        assert!(service.token_manager.validate_token(&renewed.access_token).await);
    }
}
