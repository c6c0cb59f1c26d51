//! JWT claims carried by the stateless strategy.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::UserDetails;
use crate::scope::RoleDataScope;

/// Claims payload embedded in every stateless token.
///
/// The access token is self-contained: identity, roles, and resolved
/// data scopes all travel inside it, so a request needs no store
/// round-trip beyond the revocation checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject — the user ID.
    pub sub: i64,
    /// Username for convenience.
    pub username: String,
    /// Department ID at issuance time.
    pub dept: Option<i64>,
    /// Role codes at issuance time.
    pub roles: Vec<String>,
    /// Resolved data scopes at issuance time.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<RoleDataScope>,
    /// Security version the token was issued under. Tokens older than
    /// the user's current version counter are revoked.
    pub ver: i64,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
    /// JWT ID for blocklist tracking.
    pub jti: Uuid,
    /// Token type: "access" or "refresh".
    pub token_type: TokenType,
}

/// Distinguishes access tokens from refresh tokens.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived access token for API requests.
    Access,
    /// Long-lived refresh token for obtaining new access tokens.
    Refresh,
}

impl Claims {
    /// Rebuilds the identity this token was issued for.
    pub fn to_user_details(&self) -> UserDetails {
        UserDetails {
            user_id: self.sub,
            username: self.username.clone(),
            dept_id: self.dept,
            roles: self.roles.clone(),
            scopes: self.scopes.clone(),
        }
    }

    /// Returns the remaining TTL in seconds (0 if expired).
    pub fn remaining_ttl_seconds(&self) -> u64 {
        let remaining = self.exp - Utc::now().timestamp();
        if remaining > 0 { remaining as u64 } else { 0 }
    }
}
