//! Department entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A node in the organizational department tree.
///
/// `ancestors` holds the materialized path of ancestor ids from the root,
/// comma-delimited (e.g. `"0,3"` for a department under 3 under the
/// root 0). Descendant queries match on this prefix instead of recursing.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Department {
    /// Unique department identifier.
    pub id: i64,
    /// Parent department id (`None` for the root).
    pub parent_id: Option<i64>,
    /// Comma-delimited ancestor id chain.
    pub ancestors: String,
    /// Department name.
    pub name: String,
    /// Display ordering among siblings.
    pub order_num: i32,
    /// Whether the department is currently enabled.
    pub enabled: bool,
    /// When the department was created.
    pub created_at: DateTime<Utc>,
}

impl Department {
    /// The materialized path of this department itself, i.e. the prefix
    /// that every descendant's `ancestors` column starts with.
    pub fn own_path(&self) -> String {
        format!("{},{}", self.ancestors, self.id)
    }
}
