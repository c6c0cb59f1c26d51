//! `AuthUser` extractor — pulls the bearer token from the Authorization
//! header, validates it through the active token strategy, and injects
//! the identity.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use kanri_auth::identity::UserDetails;

use crate::error::ApiError;
use crate::state::AppState;

/// The raw bearer token from the Authorization header.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

impl<S: Send + Sync> FromRequestParts<S> for BearerToken {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(ApiError::invalid_token)?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(ApiError::invalid_token)?;

        Ok(Self(token.to_string()))
    }
}

/// Extracted authenticated identity available in handlers.
#[derive(Debug, Clone)]
pub struct AuthUser(pub UserDetails);

impl std::ops::Deref for AuthUser {
    type Target = UserDetails;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;

        // Cheap signature/existence check before the full parse.
        if !state.token_manager.validate_token(&token).await {
            return Err(ApiError::invalid_token());
        }

        // Every rejection reason collapses into the same 401; an
        // infrastructure failure is additionally logged but never
        // surfaced to the caller.
        let identity = state.token_manager.parse_token(&token).await.map_err(|e| {
            if !e.is_unauthorized() {
                tracing::error!(error = %e, "token validation failed on infrastructure error");
            }
            ApiError::invalid_token()
        })?;

        Ok(AuthUser(identity))
    }
}
