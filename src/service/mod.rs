//! Business operations behind the HTTP layer.
//!
//! Services are cheap `Clone` handles over the database pool and the JWT
//! configuration; all durable state lives in SQLite.

mod auth;
mod error;
mod rewards;

pub use auth::{AuthService, RegisteredUser, TOKEN_TYPE, TokenPair};
pub use error::{
    MIN_PASSWORD_LEN, MIN_USERNAME_LEN, ResultExt, ServiceError, validate_credentials,
};
pub use rewards::{
    LeaderboardEntry, MAX_LEADERBOARD_LIMIT, REFERRAL_BONUS, RewardService, TaskReward, UserStatus,
};
