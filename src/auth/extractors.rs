//! Axum extractors for authentication.

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::debug;

use super::cookie::extract_access_token;
use super::errors::{ApiAuthError, AuthErrorKind};
use super::state::HasAuthBackend;
use super::types::AuthenticatedUser;
use crate::jwt::JwtError;

/// Validate the request's access token and build the principal.
fn authenticate_request<S>(parts: &Parts, state: &S) -> Result<AuthenticatedUser, AuthErrorKind>
where
    S: HasAuthBackend,
{
    let token = extract_access_token(&parts.headers).ok_or(AuthErrorKind::NotAuthenticated)?;

    let claims = state
        .jwt()
        .validate_access_token(token)
        .map_err(|e| match e {
            JwtError::Expired => AuthErrorKind::TokenExpired,
            other => {
                debug!(error = %other, "Rejected access token");
                AuthErrorKind::InvalidToken
            }
        })?;

    let user_id = claims.user_id().map_err(|_| AuthErrorKind::InvalidToken)?;

    Ok(AuthenticatedUser {
        user_id,
        username: claims.username.clone(),
        claims,
    })
}

/// Extractor for API endpoints that require authentication.
/// Reads the `access_token` cookie, falling back to `Authorization: Bearer`.
pub struct Auth(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for Auth
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authenticate_request(parts, state)
            .map(Auth)
            .map_err(ApiAuthError::new)
    }
}
