//! Server-side session records for the stateful token strategy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The session payload stored in the cache under both the access-token
/// and refresh-token keys of the stateful strategy.
///
/// Carries identity fields only — no secret material. The opaque token
/// string that indexes this record is the sole proof of possession.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnlineUser {
    /// User identifier.
    pub user_id: i64,
    /// Login name.
    pub username: String,
    /// Department the user belonged to at login time.
    pub dept_id: Option<i64>,
    /// Role codes held at login time.
    pub roles: Vec<String>,
    /// When this session was established.
    pub login_at: DateTime<Utc>,
    /// Client address recorded at login, when known.
    pub ip_address: Option<String>,
}
