//! Cache key builders for all Kanri cache entries.
//!
//! Centralising key construction prevents typos and makes it easy
//! to find every key the application uses.

/// Prefix applied to all Kanri cache keys.
const PREFIX: &str = "kanri";

// ── Stateless (JWT) strategy keys ──────────────────────────

/// Blocklist entry for a revoked JWT, keyed by its jti claim.
/// TTL equals the token's remaining lifetime, never indefinite.
pub fn token_blocklist(jti: &str) -> String {
    format!("{PREFIX}:auth:blocklist:{jti}")
}

/// Per-user monotonic security-version counter. Tokens embedding a
/// version lower than this counter are revoked.
pub fn security_version(user_id: i64) -> String {
    format!("{PREFIX}:auth:ver:{user_id}")
}

// ── Stateful (cache) strategy keys ─────────────────────────

/// Forward key: access token → online-user record.
pub fn online_access(token: &str) -> String {
    format!("{PREFIX}:online:access:{token}")
}

/// Forward key: refresh token → online-user record.
pub fn online_refresh(token: &str) -> String {
    format!("{PREFIX}:online:refresh:{token}")
}

/// Reverse index: user → current access token (single-device login).
pub fn user_access_token(user_id: i64) -> String {
    format!("{PREFIX}:online:user_access:{user_id}")
}

/// Reverse index: user → current refresh token.
pub fn user_refresh_token(user_id: i64) -> String {
    format!("{PREFIX}:online:user_refresh:{user_id}")
}

// ── Role-permission keys ───────────────────────────────────

/// Hash of role code → JSON-serialized permission list.
pub fn role_perms() -> String {
    format!("{PREFIX}:role:perms")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_version_key() {
        assert_eq!(security_version(42), "kanri:auth:ver:42");
    }

    #[test]
    fn test_online_keys_distinct_keyspaces() {
        let access = online_access("abc");
        let refresh = online_refresh("abc");
        assert_ne!(access, refresh);
        assert!(access.contains("online:access"));
        assert!(refresh.contains("online:refresh"));
    }
}
