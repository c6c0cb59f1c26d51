//! In-memory fixtures shared by the unit tests in this crate.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use kanri_cache::CacheManager;
use kanri_cache::memory::MemoryCacheProvider;
use kanri_core::config::cache::MemoryCacheConfig;
use kanri_core::traits::CacheProvider;
use kanri_core::{AppError, AppResult};
use kanri_entity::menu::RolePerm;
use kanri_entity::role::{DataScopeKind, RoleScope};
use kanri_entity::user::{User, UserStatus};

use crate::identity::UserDetails;
use crate::password::PasswordHasher;
use crate::store::CredentialStore;

/// A cache manager over the in-process memory provider.
pub fn memory_cache() -> Arc<CacheManager> {
    let provider = MemoryCacheProvider::new(&MemoryCacheConfig::default());
    Arc::new(CacheManager::from_provider(Arc::new(provider)))
}

/// A cache manager whose backend rejects every operation, for
/// degradation tests.
pub fn failing_cache() -> Arc<CacheManager> {
    Arc::new(CacheManager::from_provider(Arc::new(FailingCacheProvider)))
}

/// Cache backend that fails every call, as an unreachable Redis would.
#[derive(Debug)]
pub struct FailingCacheProvider;

impl FailingCacheProvider {
    fn down<T>() -> AppResult<T> {
        Err(AppError::cache("cache backend offline"))
    }
}

#[async_trait]
impl CacheProvider for FailingCacheProvider {
    async fn get(&self, _key: &str) -> AppResult<Option<String>> {
        Self::down()
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> AppResult<()> {
        Self::down()
    }

    async fn set_persistent(&self, _key: &str, _value: &str) -> AppResult<()> {
        Self::down()
    }

    async fn delete(&self, _key: &str) -> AppResult<()> {
        Self::down()
    }

    async fn exists(&self, _key: &str) -> AppResult<bool> {
        Self::down()
    }

    async fn incr(&self, _key: &str) -> AppResult<i64> {
        Self::down()
    }

    async fn expire(&self, _key: &str, _ttl: Duration) -> AppResult<bool> {
        Self::down()
    }

    async fn hash_get(&self, _key: &str, _field: &str) -> AppResult<Option<String>> {
        Self::down()
    }

    async fn hash_set(&self, _key: &str, _field: &str, _value: &str) -> AppResult<()> {
        Self::down()
    }

    async fn hash_delete(&self, _key: &str, _field: &str) -> AppResult<()> {
        Self::down()
    }

    async fn health_check(&self) -> AppResult<bool> {
        Self::down()
    }
}

/// A minimal identity for token tests.
pub fn identity(user_id: i64, username: &str, roles: &[&str]) -> UserDetails {
    UserDetails {
        user_id,
        username: username.to_string(),
        dept_id: Some(3),
        roles: roles.iter().map(|s| s.to_string()).collect(),
        scopes: Vec::new(),
    }
}

/// Builder-style in-memory credential store.
#[derive(Debug, Default)]
pub struct StubStore {
    users: Vec<User>,
    user_roles: HashMap<i64, Vec<String>>,
    role_scopes: Vec<RoleScope>,
    dept_paths: HashMap<i64, String>,
    dept_subtrees: HashMap<i64, Vec<i64>>,
    custom_grants: Vec<(String, i64)>,
    role_perms: Vec<RolePerm>,
    fail: bool,
}

impl StubStore {
    /// Adds a user; `password` is hashed on the way in.
    pub fn with_user(
        mut self,
        id: i64,
        username: &str,
        password: &str,
        dept_id: Option<i64>,
        status: UserStatus,
    ) -> Self {
        let password_hash = PasswordHasher::new().hash_password(password).unwrap();
        self.users.push(User {
            id,
            username: username.to_string(),
            nickname: None,
            email: None,
            password_hash,
            dept_id,
            status,
            created_at: Utc::now(),
            last_login_at: None,
        });
        self
    }

    pub fn with_user_role(mut self, user_id: i64, code: &str) -> Self {
        self.user_roles
            .entry(user_id)
            .or_default()
            .push(code.to_string());
        self
    }

    pub fn with_role_scope(mut self, code: &str, data_scope: DataScopeKind) -> Self {
        self.role_scopes.push(RoleScope {
            code: code.to_string(),
            data_scope,
        });
        self
    }

    /// Registers a department with its ancestor path and full subtree.
    pub fn with_department(mut self, id: i64, ancestors: &str, subtree: &[i64]) -> Self {
        self.dept_paths.insert(id, ancestors.to_string());
        self.dept_subtrees.insert(id, subtree.to_vec());
        self
    }

    pub fn with_custom_grant(mut self, code: &str, dept_id: i64) -> Self {
        self.custom_grants.push((code.to_string(), dept_id));
        self
    }

    pub fn with_perm(mut self, code: &str, perm: &str) -> Self {
        self.role_perms.push(RolePerm {
            role_code: code.to_string(),
            perm: perm.to_string(),
        });
        self
    }

    /// Makes every store call fail, for degradation tests.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    fn check(&self) -> AppResult<()> {
        if self.fail {
            Err(AppError::database("stub store failure"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CredentialStore for StubStore {
    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        self.check()?;
        Ok(self.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_id(&self, user_id: i64) -> AppResult<Option<User>> {
        self.check()?;
        Ok(self.users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn role_codes_by_user(&self, user_id: i64) -> AppResult<Vec<String>> {
        self.check()?;
        Ok(self.user_roles.get(&user_id).cloned().unwrap_or_default())
    }

    async fn role_scopes(&self, role_codes: &[String]) -> AppResult<Vec<RoleScope>> {
        self.check()?;
        Ok(self
            .role_scopes
            .iter()
            .filter(|r| role_codes.contains(&r.code))
            .cloned()
            .collect())
    }

    async fn department_path(&self, dept_id: i64) -> AppResult<Option<String>> {
        self.check()?;
        Ok(self.dept_paths.get(&dept_id).cloned())
    }

    async fn descendant_department_ids(
        &self,
        dept_id: i64,
        _own_path: &str,
    ) -> AppResult<Vec<i64>> {
        self.check()?;
        Ok(self
            .dept_subtrees
            .get(&dept_id)
            .cloned()
            .unwrap_or_else(|| vec![dept_id]))
    }

    async fn custom_department_ids(&self, role_codes: &[String]) -> AppResult<Vec<(String, i64)>> {
        self.check()?;
        Ok(self
            .custom_grants
            .iter()
            .filter(|(code, _)| role_codes.contains(code))
            .cloned()
            .collect())
    }

    async fn all_role_codes(&self) -> AppResult<Vec<String>> {
        self.check()?;
        Ok(self.role_scopes.iter().map(|r| r.code.clone()).collect())
    }

    async fn perms_by_roles(&self, role_codes: &[String]) -> AppResult<Vec<RolePerm>> {
        self.check()?;
        Ok(self
            .role_perms
            .iter()
            .filter(|p| role_codes.contains(&p.role_code))
            .cloned()
            .collect())
    }
}
