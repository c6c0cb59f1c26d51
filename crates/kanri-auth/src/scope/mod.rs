//! Multi-role data-scope resolution and SQL predicate generation.

pub mod filter;
pub mod resolver;

use serde::{Deserialize, Serialize};

use kanri_entity::role::DataScopeKind;

pub use filter::{ScopeColumns, apply_data_scope, has_all_scope};
pub use resolver::DataScopeResolver;

/// One role's contribution to a user's row visibility.
///
/// Kind and department list are fully materialized at resolution time so
/// that predicate generation needs no further lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDataScope {
    /// The role this entry came from.
    pub role_code: String,
    /// The visibility rule kind.
    pub kind: DataScopeKind,
    /// Concrete department IDs for department-based kinds; empty for
    /// `All` and `SelfOnly`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dept_ids: Vec<i64>,
}

impl RoleDataScope {
    /// An unrestricted entry.
    pub fn all(role_code: impl Into<String>) -> Self {
        Self {
            role_code: role_code.into(),
            kind: DataScopeKind::All,
            dept_ids: Vec::new(),
        }
    }

    /// An own-rows-only entry.
    pub fn self_only(role_code: impl Into<String>) -> Self {
        Self {
            role_code: role_code.into(),
            kind: DataScopeKind::SelfOnly,
            dept_ids: Vec::new(),
        }
    }

    /// A department-based entry with its materialized ID list.
    pub fn depts(role_code: impl Into<String>, kind: DataScopeKind, dept_ids: Vec<i64>) -> Self {
        Self {
            role_code: role_code.into(),
            kind,
            dept_ids,
        }
    }
}
