//! Authentication and session-strategy configuration.

use serde::{Deserialize, Serialize};

/// Authentication configuration.
///
/// The session strategy is chosen once at startup and never mixed at
/// runtime: `"jwt"` issues signed stateless tokens with a revocation
/// side-channel, `"cache"` issues opaque handles backed entirely by
/// server-side session records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Session strategy: `"jwt"` (stateless) or `"cache"` (stateful).
    #[serde(default = "default_strategy")]
    pub strategy: String,
    /// Secret key for JWT signing (HMAC-SHA256). Unused by the cache strategy.
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Access token TTL in minutes.
    #[serde(default = "default_access_ttl")]
    pub access_ttl_minutes: u64,
    /// Refresh token TTL in hours.
    #[serde(default = "default_refresh_ttl")]
    pub refresh_ttl_hours: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            jwt_secret: default_jwt_secret(),
            access_ttl_minutes: default_access_ttl(),
            refresh_ttl_hours: default_refresh_ttl(),
        }
    }
}

impl AuthConfig {
    /// Access token lifetime as a `Duration`.
    pub fn access_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.access_ttl_minutes * 60)
    }

    /// Refresh token lifetime as a `Duration`.
    pub fn refresh_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.refresh_ttl_hours * 3600)
    }
}

fn default_strategy() -> String {
    "jwt".to_string()
}

fn default_jwt_secret() -> String {
    "CHANGE_ME_IN_PRODUCTION".to_string()
}

fn default_access_ttl() -> u64 {
    30
}

fn default_refresh_ttl() -> u64 {
    168
}
