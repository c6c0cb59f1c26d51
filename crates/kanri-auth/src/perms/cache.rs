//! Cached role → permission-string mapping.
//!
//! Permissions live in one cache hash keyed by role code, holding a
//! JSON-serialized string list per role. Roles that genuinely have no
//! permissions are stored as `"[]"` so an empty grant set is
//! distinguishable from a cache miss. Explicit refresh after role or
//! menu edits keeps the hash current; a daily TTL bounds staleness if a
//! refresh is ever missed.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use kanri_cache::{CacheManager, keys};
use kanri_core::AppResult;
use kanri_core::traits::CacheProvider;

use crate::store::CredentialStore;

/// Safety-net TTL on the whole permission hash.
const ROLE_PERMS_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Maintains and serves the cached role-permission mapping.
#[derive(Debug, Clone)]
pub struct RolePermissionCache {
    cache: Arc<CacheManager>,
    store: Arc<dyn CredentialStore>,
}

impl RolePermissionCache {
    /// Creates the cache over the given backends.
    pub fn new(cache: Arc<CacheManager>, store: Arc<dyn CredentialStore>) -> Self {
        Self { cache, store }
    }

    /// Rebuilds the whole hash from the store. Called at startup and
    /// after bulk permission edits.
    pub async fn refresh_all(&self) -> AppResult<()> {
        let codes = self.store.all_role_codes().await?;
        let grants = self.load_grants(&codes).await?;

        // Drop the old hash so roles deleted since the last refresh
        // don't linger.
        self.cache.delete(&keys::role_perms()).await?;

        for code in &codes {
            let perms: Vec<&String> = grants.get(code).into_iter().flatten().collect();
            let json = serde_json::to_string(&perms)?;
            self.cache.hash_set(&keys::role_perms(), code, &json).await?;
        }
        self.cache
            .expire(&keys::role_perms(), ROLE_PERMS_TTL)
            .await?;

        info!(roles = codes.len(), "role permission cache rebuilt");
        Ok(())
    }

    /// Refreshes a single role's entry.
    pub async fn refresh_by_code(&self, role_code: &str) -> AppResult<()> {
        self.refresh_by_codes(&[role_code.to_string()]).await
    }

    /// Refreshes the entries of the named roles. Roles that no longer
    /// exist (or were disabled) are removed from the hash.
    pub async fn refresh_by_codes(&self, role_codes: &[String]) -> AppResult<()> {
        let live: BTreeSet<String> = self
            .store
            .role_scopes(role_codes)
            .await?
            .into_iter()
            .map(|r| r.code)
            .collect();
        let grants = self.load_grants(role_codes).await?;

        for code in role_codes {
            if live.contains(code) {
                let perms: Vec<&String> = grants.get(code).into_iter().flatten().collect();
                let json = serde_json::to_string(&perms)?;
                self.cache.hash_set(&keys::role_perms(), code, &json).await?;
            } else {
                self.cache.hash_delete(&keys::role_perms(), code).await?;
            }
        }

        info!(roles = role_codes.len(), "role permission cache refreshed");
        Ok(())
    }

    /// Refreshes the named roles after a committed permission edit.
    ///
    /// The edit already succeeded, so a refresh failure is logged and
    /// swallowed rather than surfaced to the caller; the hash TTL
    /// bounds how long the stale entries can survive.
    pub async fn refresh_after_mutation(&self, role_codes: &[String]) {
        if let Err(e) = self.refresh_by_codes(role_codes).await {
            warn!(
                error = %e,
                roles = role_codes.len(),
                "permission cache refresh failed after mutation"
            );
        }
    }

    /// The union of permission strings granted through the given roles.
    ///
    /// Reads cache-first; roles missing from the hash (or unreadable)
    /// fall back to one batched store query. The fallback does not
    /// repopulate the hash — only explicit refreshes write it.
    pub async fn user_perms_by_roles(&self, role_codes: &[String]) -> AppResult<BTreeSet<String>> {
        let mut perms = BTreeSet::new();
        let mut missing = Vec::new();

        for code in role_codes {
            match self.cache.hash_get(&keys::role_perms(), code).await {
                Ok(Some(json)) => match serde_json::from_str::<Vec<String>>(&json) {
                    Ok(list) => perms.extend(list),
                    Err(e) => {
                        warn!(role = %code, error = %e, "corrupt permission cache entry");
                        missing.push(code.clone());
                    }
                },
                Ok(None) => missing.push(code.clone()),
                Err(e) => {
                    warn!(role = %code, error = %e, "permission cache unavailable");
                    missing.push(code.clone());
                }
            }
        }

        if !missing.is_empty() {
            for row in self.store.perms_by_roles(&missing).await? {
                perms.insert(row.perm);
            }
        }

        Ok(perms)
    }

    async fn load_grants(&self, codes: &[String]) -> AppResult<BTreeMap<String, BTreeSet<String>>> {
        let mut grants: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for row in self.store.perms_by_roles(codes).await? {
            grants.entry(row.role_code).or_default().insert(row.perm);
        }
        Ok(grants)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{StubStore, failing_cache, memory_cache};
    use kanri_entity::role::DataScopeKind;

    fn stocked_store() -> StubStore {
        StubStore::default()
            .with_role_scope("EDITOR", DataScopeKind::DeptOnly)
            .with_role_scope("VIEWER", DataScopeKind::SelfOnly)
            .with_perm("EDITOR", "system:user:list")
            .with_perm("EDITOR", "system:user:update")
            .with_perm("VIEWER", "system:user:list")
    }

    fn codes(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn refresh_all_then_read_from_cache() {
        let cache = memory_cache();
        let perms = RolePermissionCache::new(cache.clone(), Arc::new(stocked_store()));

        perms.refresh_all().await.unwrap();

        let granted = perms.user_perms_by_roles(&codes(&["EDITOR"])).await.unwrap();
        assert!(granted.contains("system:user:list"));
        assert!(granted.contains("system:user:update"));
        assert_eq!(granted.len(), 2);
    }

    #[tokio::test]
    async fn empty_grant_set_is_cached_as_a_sentinel() {
        let cache = memory_cache();
        let store = stocked_store().with_role_scope("INTERN", DataScopeKind::SelfOnly);
        let perms = RolePermissionCache::new(cache.clone(), Arc::new(store));

        perms.refresh_all().await.unwrap();

        let entry = cache
            .hash_get(&keys::role_perms(), "INTERN")
            .await
            .unwrap();
        assert_eq!(entry.as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn union_across_roles_deduplicates() {
        let perms = RolePermissionCache::new(memory_cache(), Arc::new(stocked_store()));
        perms.refresh_all().await.unwrap();

        let granted = perms
            .user_perms_by_roles(&codes(&["EDITOR", "VIEWER"]))
            .await
            .unwrap();
        assert_eq!(granted.len(), 2);
    }

    #[tokio::test]
    async fn cache_miss_falls_back_to_the_store_without_repopulating() {
        let cache = memory_cache();
        let perms = RolePermissionCache::new(cache.clone(), Arc::new(stocked_store()));

        // No refresh has happened yet.
        let granted = perms.user_perms_by_roles(&codes(&["EDITOR"])).await.unwrap();
        assert_eq!(granted.len(), 2);

        // The fallback read left the hash untouched.
        let entry = cache.hash_get(&keys::role_perms(), "EDITOR").await.unwrap();
        assert!(entry.is_none());
    }

    #[tokio::test]
    async fn post_mutation_refresh_swallows_cache_failure() {
        let perms = RolePermissionCache::new(failing_cache(), Arc::new(stocked_store()));

        // The plain refresh surfaces the backend error...
        assert!(perms.refresh_by_code("EDITOR").await.is_err());

        // ...while the post-mutation path only logs it, so the caller's
        // already-committed edit is not reported as failed.
        perms.refresh_after_mutation(&codes(&["EDITOR"])).await;
    }

    #[tokio::test]
    async fn unreachable_cache_still_resolves_perms_from_the_store() {
        let perms = RolePermissionCache::new(failing_cache(), Arc::new(stocked_store()));

        let granted = perms.user_perms_by_roles(&codes(&["EDITOR"])).await.unwrap();
        assert_eq!(granted.len(), 2);
    }

    #[tokio::test]
    async fn targeted_refresh_removes_deleted_roles() {
        let cache = memory_cache();
        let perms = RolePermissionCache::new(cache.clone(), Arc::new(stocked_store()));
        perms.refresh_all().await.unwrap();

        // "GHOST" is not in the store, so a targeted refresh must
        // clear whatever the hash held for it.
        cache
            .hash_set(&keys::role_perms(), "GHOST", r#"["system:user:remove"]"#)
            .await
            .unwrap();
        perms.refresh_by_code("GHOST").await.unwrap();

        let entry = cache.hash_get(&keys::role_perms(), "GHOST").await.unwrap();
        assert!(entry.is_none());
    }
}
