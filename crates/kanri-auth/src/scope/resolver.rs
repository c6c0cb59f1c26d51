//! Resolves a user's roles into concrete data-scope entries.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, error};

use kanri_core::AppResult;
use kanri_entity::role::DataScopeKind;

use crate::identity::{DEFAULT_ROLE, SUPER_ADMIN_ROLE};
use crate::store::CredentialStore;

use super::RoleDataScope;

/// Turns role codes plus the user's department into materialized
/// [`RoleDataScope`] entries, expanding department subtrees and custom
/// grants along the way.
#[derive(Debug, Clone)]
pub struct DataScopeResolver {
    store: Arc<dyn CredentialStore>,
}

impl DataScopeResolver {
    /// Creates a resolver over the given credential store.
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Resolves scope entries for a user, degrading to an empty list on
    /// store failure.
    ///
    /// An empty list renders as a match-nothing predicate, so a broken
    /// store hides rows instead of exposing them.
    pub async fn resolve_data_scopes(
        &self,
        user_id: i64,
        role_codes: &[String],
        dept_id: Option<i64>,
    ) -> Vec<RoleDataScope> {
        match self.try_resolve(user_id, role_codes, dept_id).await {
            Ok(scopes) => scopes,
            Err(e) => {
                error!(user_id, error = %e, "data scope resolution failed, denying all rows");
                Vec::new()
            }
        }
    }

    /// Returns the scopes already embedded in a token, or resolves them
    /// fresh when the identity carries none (stateful sessions).
    pub async fn effective_scopes(
        &self,
        identity: &crate::identity::UserDetails,
    ) -> Vec<RoleDataScope> {
        if !identity.scopes.is_empty() {
            return identity.scopes.clone();
        }
        self.resolve_data_scopes(identity.user_id, &identity.roles, identity.dept_id)
            .await
    }

    async fn try_resolve(
        &self,
        user_id: i64,
        role_codes: &[String],
        dept_id: Option<i64>,
    ) -> AppResult<Vec<RoleDataScope>> {
        // Super admin needs no per-role entries; a single ALL wins.
        if role_codes.iter().any(|c| c == SUPER_ADMIN_ROLE) {
            return Ok(vec![RoleDataScope::all(SUPER_ADMIN_ROLE)]);
        }

        let rows = self.store.role_scopes(role_codes).await?;
        if rows.is_empty() {
            // No enabled roles at all: the user still sees their own rows.
            debug!(user_id, "no enabled roles, assigning default self-only scope");
            return Ok(vec![RoleDataScope::self_only(DEFAULT_ROLE)]);
        }

        // Expand the department subtree once, shared by every
        // dept-and-descendants role the user holds.
        let descendant_ids = if rows
            .iter()
            .any(|r| r.data_scope == DataScopeKind::DeptAndDescendants)
        {
            self.subtree_ids(dept_id).await?
        } else {
            None
        };

        // Batch-load custom grants for all custom-scoped roles.
        let custom_codes: Vec<String> = rows
            .iter()
            .filter(|r| r.data_scope == DataScopeKind::Custom)
            .map(|r| r.code.clone())
            .collect();
        let mut custom_grants: HashMap<String, Vec<i64>> = HashMap::new();
        if !custom_codes.is_empty() {
            for (code, id) in self.store.custom_department_ids(&custom_codes).await? {
                custom_grants.entry(code).or_default().push(id);
            }
        }

        let mut scopes = Vec::with_capacity(rows.len());
        for row in rows {
            match row.data_scope {
                DataScopeKind::All => scopes.push(RoleDataScope::all(row.code)),
                DataScopeKind::SelfOnly => scopes.push(RoleDataScope::self_only(row.code)),
                DataScopeKind::DeptOnly => {
                    // A user without a department contributes nothing
                    // through this role; other roles still apply.
                    if let Some(d) = dept_id {
                        scopes.push(RoleDataScope::depts(
                            row.code,
                            DataScopeKind::DeptOnly,
                            vec![d],
                        ));
                    }
                }
                DataScopeKind::DeptAndDescendants => {
                    if let Some(ids) = &descendant_ids {
                        if !ids.is_empty() {
                            scopes.push(RoleDataScope::depts(
                                row.code,
                                DataScopeKind::DeptAndDescendants,
                                ids.clone(),
                            ));
                        }
                    }
                }
                DataScopeKind::Custom => {
                    if let Some(ids) = custom_grants.get(&row.code) {
                        if !ids.is_empty() {
                            scopes.push(RoleDataScope::depts(
                                row.code,
                                DataScopeKind::Custom,
                                ids.clone(),
                            ));
                        }
                    }
                }
            }
        }

        Ok(scopes)
    }

    /// Department plus all enabled descendants, via the materialized
    /// ancestor path. `None` when the user has no (known) department.
    async fn subtree_ids(&self, dept_id: Option<i64>) -> AppResult<Option<Vec<i64>>> {
        let Some(dept_id) = dept_id else {
            return Ok(None);
        };
        let Some(ancestors) = self.store.department_path(dept_id).await? else {
            return Ok(None);
        };
        let own_path = format!("{ancestors},{dept_id}");
        let ids = self
            .store
            .descendant_department_ids(dept_id, &own_path)
            .await?;
        Ok(Some(ids))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::StubStore;

    fn codes(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn super_admin_short_circuits() {
        let store = Arc::new(StubStore::default());
        let resolver = DataScopeResolver::new(store);

        let scopes = resolver
            .resolve_data_scopes(1, &codes(&["ROOT", "EDITOR"]), Some(3))
            .await;
        assert_eq!(scopes, vec![RoleDataScope::all("ROOT")]);
    }

    #[tokio::test]
    async fn zero_roles_degrades_to_self_only() {
        let store = Arc::new(StubStore::default());
        let resolver = DataScopeResolver::new(store);

        let scopes = resolver.resolve_data_scopes(7, &[], Some(3)).await;
        assert_eq!(scopes, vec![RoleDataScope::self_only("DEFAULT")]);
    }

    #[tokio::test]
    async fn dept_subtree_expands_through_materialized_path() {
        let store = Arc::new(
            StubStore::default()
                .with_role_scope("MANAGER", DataScopeKind::DeptAndDescendants)
                .with_department(3, "0", &[3, 7, 9]),
        );
        let resolver = DataScopeResolver::new(store);

        let scopes = resolver
            .resolve_data_scopes(1, &codes(&["MANAGER"]), Some(3))
            .await;
        assert_eq!(
            scopes,
            vec![RoleDataScope::depts(
                "MANAGER",
                DataScopeKind::DeptAndDescendants,
                vec![3, 7, 9]
            )]
        );
    }

    #[tokio::test]
    async fn dept_roles_contribute_nothing_without_a_department() {
        let store = Arc::new(
            StubStore::default()
                .with_role_scope("MANAGER", DataScopeKind::DeptAndDescendants)
                .with_role_scope("VIEWER", DataScopeKind::SelfOnly),
        );
        let resolver = DataScopeResolver::new(store);

        let scopes = resolver
            .resolve_data_scopes(1, &codes(&["MANAGER", "VIEWER"]), None)
            .await;
        // The department-bound role is skipped; self-only still applies.
        assert_eq!(scopes, vec![RoleDataScope::self_only("VIEWER")]);
    }

    #[tokio::test]
    async fn custom_scope_without_grants_contributes_nothing() {
        let store = Arc::new(StubStore::default().with_role_scope("AUDITOR", DataScopeKind::Custom));
        let resolver = DataScopeResolver::new(store);

        let scopes = resolver
            .resolve_data_scopes(1, &codes(&["AUDITOR"]), Some(3))
            .await;
        assert!(scopes.is_empty());
    }

    #[tokio::test]
    async fn union_keeps_one_entry_per_contributing_role() {
        let store = Arc::new(
            StubStore::default()
                .with_role_scope("EDITOR", DataScopeKind::DeptOnly)
                .with_role_scope("AUDITOR", DataScopeKind::Custom)
                .with_custom_grant("AUDITOR", 11)
                .with_custom_grant("AUDITOR", 12),
        );
        let resolver = DataScopeResolver::new(store);

        let scopes = resolver
            .resolve_data_scopes(1, &codes(&["EDITOR", "AUDITOR"]), Some(3))
            .await;
        assert_eq!(scopes.len(), 2);
        assert!(scopes.contains(&RoleDataScope::depts(
            "EDITOR",
            DataScopeKind::DeptOnly,
            vec![3]
        )));
        assert!(scopes.contains(&RoleDataScope::depts(
            "AUDITOR",
            DataScopeKind::Custom,
            vec![11, 12]
        )));
    }

    #[tokio::test]
    async fn store_failure_resolves_to_empty() {
        let store = Arc::new(StubStore::default().failing());
        let resolver = DataScopeResolver::new(store);

        let scopes = resolver
            .resolve_data_scopes(1, &codes(&["EDITOR"]), Some(3))
            .await;
        assert!(scopes.is_empty());
    }
}
