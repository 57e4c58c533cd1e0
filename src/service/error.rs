//! Error taxonomy shared by the auth and reward services.

use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Malformed input the client has to fix.
    #[error("{0}")]
    Validation(String),
    /// Missing, invalid, expired or revoked credential.
    #[error("{0}")]
    Unauthorized(String),
    /// Authenticated but not entitled to the resource.
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    /// Uniqueness or state violation.
    #[error("{0}")]
    Conflict(String),
    /// Store or infrastructure failure; the message is for logs only.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}

/// Extension trait for concise error mapping on Results.
pub trait ResultExt<T> {
    /// Log the error with `context` and classify it as `Internal`.
    fn internal(self, context: &str) -> Result<T, ServiceError>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn internal(self, context: &str) -> Result<T, ServiceError> {
        self.map_err(|e| {
            error!(error = %e, "{}", context);
            ServiceError::Internal(format!("{}: {}", context, e))
        })
    }
}

/// Minimum username length in characters.
pub const MIN_USERNAME_LEN: usize = 3;

/// Minimum password length in characters.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Check registration credentials before anything is hashed or stored.
pub fn validate_credentials(username: &str, password: &str) -> Result<(), ServiceError> {
    if username.is_empty() {
        return Err(ServiceError::validation("Username must not be empty"));
    }
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(ServiceError::validation(format!(
            "Username must be at least {} characters",
            MIN_USERNAME_LEN
        )));
    }
    if password.is_empty() {
        return Err(ServiceError::validation("Password must not be empty"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ServiceError::validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}
