//! Authentication user types.

use crate::jwt::AccessClaims;

/// The principal of an authenticated request.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// Database user ID, taken from the `sub` claim
    pub user_id: i64,
    pub username: String,
    /// JWT claims from the access token
    pub claims: AccessClaims,
}
