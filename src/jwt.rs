//! JWT token generation and validation.
//!
//! Access tokens are stateless: validation never consults the database, so a
//! token issued before logout keeps working until its own `exp`. Refresh tokens
//! carry a JTI that must still exist in the `refresh_tokens` table to be used.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Token type for distinguishing access vs refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived access token - stateless, no JTI
    Access,
    /// Long-lived refresh token - tracked in database with JTI
    Refresh,
}

/// JWT claims for access tokens (stateless, no JTI).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user id, decimal)
    pub sub: String,
    /// Username
    pub username: String,
    /// Token type
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// JWT claims for refresh tokens (tracked with JTI).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// JWT ID (unique identifier for revocation tracking)
    pub jti: String,
    /// Subject (user id, decimal)
    pub sub: String,
    /// Username
    pub username: String,
    /// Token type
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

impl AccessClaims {
    /// The user id carried in `sub`.
    pub fn user_id(&self) -> Result<i64, JwtError> {
        self.sub.parse().map_err(|_| JwtError::Invalid)
    }
}

impl RefreshClaims {
    /// The user id carried in `sub`.
    pub fn user_id(&self) -> Result<i64, JwtError> {
        self.sub.parse().map_err(|_| JwtError::Invalid)
    }
}

/// Default access token duration: 15 minutes
pub const ACCESS_TOKEN_DURATION_SECS: u64 = 15 * 60;

/// Default refresh token duration: 7 days
pub const REFRESH_TOKEN_DURATION_SECS: u64 = 7 * 24 * 60 * 60;

/// Configuration for JWT operations.
#[derive(Clone)]
pub struct JwtConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_duration: u64,
    refresh_duration: u64,
}

/// Result of generating an access token (no JTI).
#[derive(Debug, Clone)]
pub struct AccessTokenResult {
    /// The JWT token string
    pub token: String,
    /// Token duration in seconds
    pub duration: u64,
}

/// Result of generating a refresh token (with JTI for tracking).
#[derive(Debug, Clone)]
pub struct RefreshTokenResult {
    /// The JWT token string
    pub token: String,
    /// JWT ID (unique identifier for database tracking)
    pub jti: String,
    /// Issued at timestamp (Unix seconds)
    pub issued_at: u64,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: u64,
    /// Token duration in seconds
    pub duration: u64,
}

impl JwtConfig {
    /// Create a new JWT configuration with the given secret and default lifetimes.
    pub fn new(secret: &[u8]) -> Self {
        Self::with_durations(
            secret,
            ACCESS_TOKEN_DURATION_SECS,
            REFRESH_TOKEN_DURATION_SECS,
        )
    }

    /// Create a JWT configuration with explicit token lifetimes (seconds).
    pub fn with_durations(secret: &[u8], access_duration: u64, refresh_duration: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_duration,
            refresh_duration,
        }
    }

    /// Lifetime of access tokens in seconds.
    pub fn access_duration(&self) -> u64 {
        self.access_duration
    }

    /// Lifetime of refresh tokens in seconds.
    pub fn refresh_duration(&self) -> u64 {
        self.refresh_duration
    }

    /// Generate an access token for a user.
    pub fn generate_access_token(
        &self,
        user_id: i64,
        username: &str,
    ) -> Result<AccessTokenResult, JwtError> {
        let now = unix_now()?;

        let claims = AccessClaims {
            sub: user_id.to_string(),
            username: username.to_string(),
            token_type: TokenType::Access,
            iat: now,
            exp: now + self.access_duration,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(JwtError::Encoding)?;

        Ok(AccessTokenResult {
            token,
            duration: self.access_duration,
        })
    }

    /// Generate a refresh token for a user.
    /// Every refresh token gets a fresh JTI, so two tokens issued within the
    /// same second are still distinct sessions.
    pub fn generate_refresh_token(
        &self,
        user_id: i64,
        username: &str,
    ) -> Result<RefreshTokenResult, JwtError> {
        let now = unix_now()?;

        let jti = uuid::Uuid::new_v4().to_string();
        let exp = now + self.refresh_duration;

        let claims = RefreshClaims {
            jti: jti.clone(),
            sub: user_id.to_string(),
            username: username.to_string(),
            token_type: TokenType::Refresh,
            iat: now,
            exp,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(JwtError::Encoding)?;

        Ok(RefreshTokenResult {
            token,
            jti,
            issued_at: now,
            expires_at: exp,
            duration: self.refresh_duration,
        })
    }

    /// Validate and decode an access token.
    pub fn validate_access_token(&self, token: &str) -> Result<AccessClaims, JwtError> {
        let token_data =
            jsonwebtoken::decode::<AccessClaims>(token, &self.decoding_key, &validation())
                .map_err(JwtError::from)?;

        if token_data.claims.token_type != TokenType::Access {
            return Err(JwtError::Invalid);
        }

        Ok(token_data.claims)
    }

    /// Validate and decode a refresh token.
    pub fn validate_refresh_token(&self, token: &str) -> Result<RefreshClaims, JwtError> {
        let token_data =
            jsonwebtoken::decode::<RefreshClaims>(token, &self.decoding_key, &validation())
                .map_err(JwtError::from)?;

        if token_data.claims.token_type != TokenType::Refresh {
            return Err(JwtError::Invalid);
        }

        Ok(token_data.claims)
    }
}

/// Only HS256 is accepted; a token signed with any other algorithm fails.
fn validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation
}

fn unix_now() -> Result<u64, JwtError> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| JwtError::TimeError)?
        .as_secs())
}

/// Errors that can occur during JWT operations.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Failed to encode token: {0}")]
    Encoding(jsonwebtoken::errors::Error),
    #[error("Token has expired")]
    Expired,
    /// Bad signature, unexpected algorithm, malformed token or wrong token type.
    #[error("Invalid token")]
    Invalid,
    #[error("System time error")]
    TimeError,
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => JwtError::Expired,
            _ => {
                tracing::debug!(error = %e, "Token rejected");
                JwtError::Invalid
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_and_validate_access_token() {
        let config = JwtConfig::new(b"test-secret-key-for-testing");

        let result = config.generate_access_token(42, "alice").unwrap();

        assert_eq!(result.duration, ACCESS_TOKEN_DURATION_SECS);

        let claims = config.validate_access_token(&result.token).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.user_id().unwrap(), 42);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.exp - claims.iat, ACCESS_TOKEN_DURATION_SECS);
    }

    #[test]
    fn test_generate_and_validate_refresh_token() {
        let config = JwtConfig::new(b"test-secret-key-for-testing");

        let result = config.generate_refresh_token(42, "alice").unwrap();

        assert_eq!(result.duration, REFRESH_TOKEN_DURATION_SECS);
        assert_eq!(result.expires_at - result.issued_at, REFRESH_TOKEN_DURATION_SECS);
        assert!(!result.jti.is_empty());

        let claims = config.validate_refresh_token(&result.token).unwrap();
        assert_eq!(claims.user_id().unwrap(), 42);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.token_type, TokenType::Refresh);
        assert_eq!(claims.jti, result.jti);
    }

    #[test]
    fn test_custom_durations() {
        let config = JwtConfig::with_durations(b"test-secret-key-for-testing", 60, 120);

        let access = config.generate_access_token(1, "alice").unwrap();
        let refresh = config.generate_refresh_token(1, "alice").unwrap();

        assert_eq!(access.duration, 60);
        assert_eq!(refresh.duration, 120);
        assert_eq!(config.access_duration(), 60);
    }

    #[test]
    fn test_wrong_token_type_rejected() {
        let config = JwtConfig::new(b"test-secret-key-for-testing");

        let access = config.generate_access_token(1, "alice").unwrap();
        let refresh = config.generate_refresh_token(1, "alice").unwrap();

        assert!(matches!(
            config.validate_refresh_token(&access.token),
            Err(JwtError::Invalid)
        ));
        assert!(matches!(
            config.validate_access_token(&refresh.token),
            Err(JwtError::Invalid)
        ));
    }

    #[test]
    fn test_invalid_token() {
        let config = JwtConfig::new(b"test-secret-key-for-testing");

        let result = config.validate_access_token("invalid-token");
        assert!(matches!(result, Err(JwtError::Invalid)));
    }

    #[test]
    fn test_wrong_secret() {
        let config1 = JwtConfig::new(b"secret-1");
        let config2 = JwtConfig::new(b"secret-2");

        let result = config1.generate_access_token(1, "alice").unwrap();

        assert!(matches!(
            config2.validate_access_token(&result.token),
            Err(JwtError::Invalid)
        ));
    }

    #[test]
    fn test_unexpected_algorithm_rejected() {
        let secret = b"test-secret-key-for-testing";
        let now = unix_now().unwrap();

        let claims = AccessClaims {
            sub: "1".to_string(),
            username: "alice".to_string(),
            token_type: TokenType::Access,
            iat: now,
            exp: now + 60,
        };

        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS384),
            &claims,
            &EncodingKey::from_secret(secret),
        )
        .unwrap();

        let config = JwtConfig::new(secret);
        assert!(matches!(
            config.validate_access_token(&token),
            Err(JwtError::Invalid)
        ));
    }

    #[test]
    fn test_expired_token() {
        let secret = b"test-secret";
        let encoding_key = EncodingKey::from_secret(secret);
        let now = unix_now().unwrap();

        // Expired 50 seconds ago
        let claims = AccessClaims {
            sub: "1".to_string(),
            username: "alice".to_string(),
            token_type: TokenType::Access,
            iat: now - 100,
            exp: now - 50,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &encoding_key).unwrap();

        let config = JwtConfig::new(secret);
        assert!(matches!(
            config.validate_access_token(&token),
            Err(JwtError::Expired)
        ));
    }

    #[test]
    fn test_expired_refresh_token() {
        let secret = b"test-secret";
        let now = unix_now().unwrap();

        let claims = RefreshClaims {
            jti: "jti-1".to_string(),
            sub: "1".to_string(),
            username: "alice".to_string(),
            token_type: TokenType::Refresh,
            iat: now - 100,
            exp: now - 1,
        };

        let token =
            jsonwebtoken::encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))
                .unwrap();

        let config = JwtConfig::new(secret);
        assert!(matches!(
            config.validate_refresh_token(&token),
            Err(JwtError::Expired)
        ));
    }

    #[test]
    fn test_non_numeric_subject_is_invalid() {
        let claims = AccessClaims {
            sub: "not-a-number".to_string(),
            username: "alice".to_string(),
            token_type: TokenType::Access,
            iat: 0,
            exp: 0,
        };
        assert!(matches!(claims.user_id(), Err(JwtError::Invalid)));
    }

    #[test]
    fn test_unique_jti_per_refresh_token() {
        let config = JwtConfig::new(b"test-secret-key-for-testing");

        let result1 = config.generate_refresh_token(1, "alice").unwrap();
        let result2 = config.generate_refresh_token(1, "alice").unwrap();

        assert_ne!(
            result1.jti, result2.jti,
            "Each refresh token should have a unique jti"
        );
        assert_ne!(result1.token, result2.token);
    }
}
