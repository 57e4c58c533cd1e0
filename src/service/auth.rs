//! Registration, login, refresh-token rotation and logout.

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::error::{ResultExt, ServiceError, validate_credentials};
use crate::db::Database;
use crate::jwt::{JwtConfig, RefreshTokenResult};
use crate::password::{hash_password_blocking, verify_dummy_blocking, verify_password_blocking};

/// Value of `token_type` in token responses.
pub const TOKEN_TYPE: &str = "Bearer";

/// Shared by the unknown-user and wrong-password paths so callers cannot
/// tell which one happened.
const INVALID_CREDENTIALS: &str = "Invalid username or password";

const INVALID_REFRESH: &str = "Invalid or expired refresh token";

#[derive(Debug, Clone, Serialize)]
pub struct RegisteredUser {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds
    pub expires_in: u64,
    #[serde(skip)]
    pub refresh_expires_in: u64,
}

#[derive(Clone)]
pub struct AuthService {
    db: Database,
    jwt: Arc<JwtConfig>,
}

impl AuthService {
    pub fn new(db: Database, jwt: Arc<JwtConfig>) -> Self {
        Self { db, jwt }
    }

    pub async fn register(
        &self,
        username: &str,
        password: &str,
    ) -> Result<RegisteredUser, ServiceError> {
        validate_credentials(username, password)?;

        let existing = self
            .db
            .users()
            .get_by_username(username)
            .await
            .internal("Failed to look up username")?;

        if existing.is_some() {
            return Err(ServiceError::conflict("Username is already taken"));
        }

        let password_hash = hash_password_blocking(password.to_string())
            .await
            .internal("Failed to hash password")?;

        let id = match self.db.users().create(username, &password_hash).await {
            Ok(id) => id,
            // Lost a race with a concurrent registration of the same name
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(ServiceError::conflict("Username is already taken"));
            }
            Err(e) => return Err::<RegisteredUser, _>(e).internal("Failed to create user"),
        };

        info!(user_id = id, username, "User registered");

        Ok(RegisteredUser {
            id,
            username: username.to_string(),
        })
    }

    /// Verify credentials and open a new refresh session.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, ServiceError> {
        if username.is_empty() || password.is_empty() {
            return Err(ServiceError::validation(
                "Username and password are required",
            ));
        }

        let Some(user) = self
            .db
            .users()
            .get_by_username(username)
            .await
            .internal("Failed to look up user")?
        else {
            // Same Argon2 cost as a wrong password, so timing does not reveal
            // which usernames exist
            if !verify_dummy_blocking(password.to_string())
                .await
                .internal("Failed to verify password")?
            {
                warn!("Dummy password hash unavailable");
            }
            return Err(ServiceError::unauthorized(INVALID_CREDENTIALS));
        };

        let matches = verify_password_blocking(password.to_string(), user.password_hash.clone())
            .await
            .internal("Failed to verify password")?;

        if !matches {
            return Err(ServiceError::unauthorized(INVALID_CREDENTIALS));
        }

        let (pair, refresh) = self.issue_pair(user.id, &user.username)?;

        self.db
            .tokens()
            .create(&refresh.jti, user.id, refresh.issued_at, refresh.expires_at)
            .await
            .internal("Failed to store refresh token")?;

        info!(user_id = user.id, "User logged in");
        Ok(pair)
    }

    /// Exchange a live refresh token for a new pair, revoking the old one.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ServiceError> {
        let claims = self
            .jwt
            .validate_refresh_token(refresh_token)
            .map_err(|_| ServiceError::unauthorized(INVALID_REFRESH))?;

        let claimed_user_id = claims
            .user_id()
            .map_err(|_| ServiceError::unauthorized(INVALID_REFRESH))?;

        let session = self
            .db
            .tokens()
            .get_by_jti(&claims.jti)
            .await
            .internal("Failed to check refresh token")?
            .ok_or_else(|| ServiceError::unauthorized("Refresh token has been revoked"))?;

        if session.user_id != claimed_user_id {
            warn!(
                session_user = session.user_id,
                claimed_user = claimed_user_id,
                "Refresh token does not belong to session owner"
            );
            self.revoke_session(&claims.jti).await;
            return Err(ServiceError::unauthorized(INVALID_REFRESH));
        }

        let Some(user) = self
            .db
            .users()
            .get_by_id(session.user_id)
            .await
            .internal("Failed to get user")?
        else {
            self.revoke_session(&claims.jti).await;
            return Err(ServiceError::unauthorized("User not found"));
        };

        let (pair, next) = self.issue_pair(user.id, &user.username)?;

        let rotated = self
            .db
            .tokens()
            .rotate(
                &claims.jti,
                user.id,
                &next.jti,
                next.issued_at,
                next.expires_at,
            )
            .await
            .internal("Failed to rotate refresh token")?;

        if !rotated {
            // Another request exchanged this token first
            return Err(ServiceError::unauthorized("Refresh token has been revoked"));
        }

        info!(user_id = user.id, "Refresh token rotated");
        Ok(pair)
    }

    /// Revoke every refresh session of the user. Idempotent.
    ///
    /// Access tokens already handed out stay valid until they expire.
    pub async fn logout(&self, user_id: i64) -> Result<(), ServiceError> {
        let revoked = self
            .db
            .tokens()
            .delete_all_by_user(user_id)
            .await
            .internal("Failed to revoke refresh tokens")?;

        info!(user_id, revoked, "User logged out");
        Ok(())
    }

    fn issue_pair(
        &self,
        user_id: i64,
        username: &str,
    ) -> Result<(TokenPair, RefreshTokenResult), ServiceError> {
        let access = self
            .jwt
            .generate_access_token(user_id, username)
            .internal("Failed to generate access token")?;
        let refresh = self
            .jwt
            .generate_refresh_token(user_id, username)
            .internal("Failed to generate refresh token")?;

        let pair = TokenPair {
            access_token: access.token,
            refresh_token: refresh.token.clone(),
            token_type: TOKEN_TYPE,
            expires_in: access.duration,
            refresh_expires_in: refresh.duration,
        };
        Ok((pair, refresh))
    }

    async fn revoke_session(&self, jti: &str) {
        if let Err(e) = self.db.tokens().delete_by_jti(jti).await {
            warn!(error = %e, "Failed to revoke refresh token");
        }
    }
}
