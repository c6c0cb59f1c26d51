//! Role entity model and data-scope kinds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// The row-level visibility rule attached to a role.
///
/// Multiple kinds held by one user are combined by **union** (logical OR),
/// never intersection — any role with broader access wins that breadth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "data_scope_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DataScopeKind {
    /// All rows, no filter.
    All,
    /// The user's own department and every descendant department.
    DeptAndDescendants,
    /// The user's own department only.
    DeptOnly,
    /// Rows authored by the user only.
    SelfOnly,
    /// An explicit list of departments assigned to the role.
    Custom,
}

impl DataScopeKind {
    /// Return the kind as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::DeptAndDescendants => "dept_and_descendants",
            Self::DeptOnly => "dept_only",
            Self::SelfOnly => "self_only",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for DataScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DataScopeKind {
    type Err = kanri_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "dept_and_descendants" => Ok(Self::DeptAndDescendants),
            "dept_only" => Ok(Self::DeptOnly),
            "self_only" => Ok(Self::SelfOnly),
            "custom" => Ok(Self::Custom),
            _ => Err(kanri_core::AppError::validation(format!(
                "Invalid data scope kind: '{s}'"
            ))),
        }
    }
}

/// A role in the credential store.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Role {
    /// Unique role identifier.
    pub id: i64,
    /// Unique role code (e.g. `"EDITOR"`). The `"ROOT"` code is reserved
    /// for the super administrator and bypasses every filter.
    pub code: String,
    /// Human-readable role name.
    pub name: String,
    /// Row-level visibility rule for this role.
    pub data_scope: DataScopeKind,
    /// Whether the role is currently enabled.
    pub enabled: bool,
    /// When the role was created.
    pub created_at: DateTime<Utc>,
}

/// Projection of a role's code and data-scope kind, as read by the
/// data-scope resolution engine.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RoleScope {
    /// Role code.
    pub code: String,
    /// Stored data-scope kind.
    pub data_scope: DataScopeKind,
}
