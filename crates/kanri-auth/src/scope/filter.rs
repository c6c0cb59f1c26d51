//! Renders resolved data scopes into a parameterized SQL predicate.

use sqlx::{Postgres, QueryBuilder};

use kanri_core::{AppError, AppResult};
use kanri_entity::role::DataScopeKind;

use crate::identity::UserDetails;

use super::RoleDataScope;

/// Column names a scope predicate filters on, with an optional table
/// alias for joined queries.
#[derive(Debug, Clone)]
pub struct ScopeColumns {
    /// Column holding the row's owning department ID.
    pub dept_column: String,
    /// Column holding the row's owning user ID.
    pub user_column: String,
    /// Table alias to qualify both columns with, if the query uses one.
    pub table_alias: Option<String>,
}

impl ScopeColumns {
    /// Unqualified columns.
    pub fn new(dept_column: impl Into<String>, user_column: impl Into<String>) -> Self {
        Self {
            dept_column: dept_column.into(),
            user_column: user_column.into(),
            table_alias: None,
        }
    }

    /// Columns qualified by a table alias.
    pub fn with_alias(
        alias: impl Into<String>,
        dept_column: impl Into<String>,
        user_column: impl Into<String>,
    ) -> Self {
        Self {
            dept_column: dept_column.into(),
            user_column: user_column.into(),
            table_alias: Some(alias.into()),
        }
    }

    fn qualified(&self, column: &str) -> String {
        match &self.table_alias {
            Some(alias) => format!("{alias}.{column}"),
            None => column.to_string(),
        }
    }
}

/// Whether any resolved entry grants unrestricted visibility.
pub fn has_all_scope(scopes: &[RoleDataScope]) -> bool {
    scopes.iter().any(|s| s.kind == DataScopeKind::All)
}

/// Appends the row-visibility predicate for `identity` to `builder`.
///
/// The builder must already hold a `WHERE` clause; the predicate is
/// appended as ` AND (...)` with every value bound as a parameter.
/// Entries are OR-united, so any one role's visibility suffices.
/// Super admins and `All` entries append nothing; an identity with no
/// usable entries appends ` AND 1 = 0` so the query matches no rows.
pub fn apply_data_scope(
    builder: &mut QueryBuilder<'_, Postgres>,
    identity: &UserDetails,
    scopes: &[RoleDataScope],
    columns: &ScopeColumns,
) -> AppResult<()> {
    for name in [&columns.dept_column, &columns.user_column]
        .into_iter()
        .chain(columns.table_alias.as_ref())
    {
        if !is_valid_identifier(name) {
            return Err(AppError::validation(format!(
                "Invalid SQL identifier in scope columns: '{name}'"
            )));
        }
    }

    if identity.is_super_admin() || has_all_scope(scopes) {
        return Ok(());
    }

    let usable = scopes.iter().filter(|s| match s.kind {
        DataScopeKind::All => false,
        DataScopeKind::SelfOnly => true,
        _ => !s.dept_ids.is_empty(),
    });

    let mut first = true;
    for scope in usable {
        if first {
            builder.push(" AND (");
        } else {
            builder.push(" OR ");
        }
        first = false;

        match scope.kind {
            DataScopeKind::SelfOnly => {
                builder.push(format!("{} = ", columns.qualified(&columns.user_column)));
                builder.push_bind(identity.user_id);
            }
            _ => {
                builder.push(format!("{} IN (", columns.qualified(&columns.dept_column)));
                let mut first_id = true;
                for id in &scope.dept_ids {
                    if !first_id {
                        builder.push(", ");
                    }
                    first_id = false;
                    builder.push_bind(*id);
                }
                builder.push(")");
            }
        }
    }

    if first {
        // Nothing usable: match no rows rather than all of them.
        builder.push(" AND 1 = 0");
    } else {
        builder.push(")");
    }

    Ok(())
}

fn is_valid_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(roles: &[&str]) -> UserDetails {
        UserDetails {
            user_id: 42,
            username: "taro".to_string(),
            dept_id: Some(3),
            roles: roles.iter().map(|s| s.to_string()).collect(),
            scopes: vec![],
        }
    }

    fn rendered(identity: &UserDetails, scopes: &[RoleDataScope]) -> String {
        let mut builder =
            QueryBuilder::<Postgres>::new("SELECT * FROM users u WHERE u.enabled = TRUE");
        let columns = ScopeColumns::with_alias("u", "dept_id", "id");
        apply_data_scope(&mut builder, identity, scopes, &columns).unwrap();
        builder.sql().to_string()
    }

    #[test]
    fn super_admin_appends_nothing() {
        let sql = rendered(&identity(&["ROOT"]), &[]);
        assert_eq!(sql, "SELECT * FROM users u WHERE u.enabled = TRUE");
    }

    #[test]
    fn all_scope_appends_nothing() {
        let scopes = vec![RoleDataScope::all("DIRECTOR")];
        let sql = rendered(&identity(&["DIRECTOR"]), &scopes);
        assert_eq!(sql, "SELECT * FROM users u WHERE u.enabled = TRUE");
    }

    #[test]
    fn empty_scopes_match_nothing() {
        let sql = rendered(&identity(&["EDITOR"]), &[]);
        assert!(sql.ends_with(" AND 1 = 0"));
    }

    #[test]
    fn self_only_binds_the_user_id() {
        let scopes = vec![RoleDataScope::self_only("VIEWER")];
        let sql = rendered(&identity(&["VIEWER"]), &scopes);
        assert!(sql.contains("u.id = $1"), "got: {sql}");
    }

    #[test]
    fn dept_entries_render_parameterized_in_lists() {
        let scopes = vec![RoleDataScope::depts(
            "MANAGER",
            kanri_entity::role::DataScopeKind::DeptAndDescendants,
            vec![3, 7, 9],
        )];
        let sql = rendered(&identity(&["MANAGER"]), &scopes);
        assert!(sql.contains("u.dept_id IN ($1, $2, $3)"), "got: {sql}");
    }

    #[test]
    fn multiple_entries_are_or_united() {
        let scopes = vec![
            RoleDataScope::depts(
                "EDITOR",
                kanri_entity::role::DataScopeKind::DeptOnly,
                vec![3],
            ),
            RoleDataScope::self_only("VIEWER"),
        ];
        let sql = rendered(&identity(&["EDITOR", "VIEWER"]), &scopes);
        assert!(
            sql.contains("AND (u.dept_id IN ($1) OR u.id = $2)"),
            "got: {sql}"
        );
    }

    #[test]
    fn dept_entry_with_no_ids_is_skipped() {
        let scopes = vec![
            RoleDataScope::depts("AUDITOR", kanri_entity::role::DataScopeKind::Custom, vec![]),
            RoleDataScope::self_only("VIEWER"),
        ];
        let sql = rendered(&identity(&["AUDITOR", "VIEWER"]), &scopes);
        assert!(sql.contains("AND (u.id = $1)"), "got: {sql}");
    }

    #[test]
    fn rejects_malicious_identifiers() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM users WHERE TRUE");
        let columns = ScopeColumns::new("dept_id; DROP TABLE users", "id");
        let result = apply_data_scope(
            &mut builder,
            &identity(&["VIEWER"]),
            &[RoleDataScope::self_only("VIEWER")],
            &columns,
        );
        assert!(result.is_err());
    }
}
