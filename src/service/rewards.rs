//! Balance mutations (task rewards, referral bonus) and the read side that
//! reports on them.

use serde::Serialize;
use tracing::info;

use super::error::{ResultExt, ServiceError};
use crate::db::{CompletionOutcome, Database, LinkOutcome, Task};

/// Points credited to the referrer when a user names them.
pub const REFERRAL_BONUS: i64 = 100;

/// Largest number of entries a leaderboard request returns.
pub const MAX_LEADERBOARD_LIMIT: i64 = 100;

#[derive(Debug, Clone, Serialize)]
pub struct UserStatus {
    pub id: i64,
    pub username: String,
    pub balance: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub id: i64,
    pub username: String,
    pub balance: i64,
    pub rank: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskReward {
    pub task_id: i64,
    pub points: i64,
    /// Balance after the reward was credited
    pub balance: i64,
}

#[derive(Clone)]
pub struct RewardService {
    db: Database,
}

impl RewardService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Mark a task as completed by the user and credit its points once.
    pub async fn complete_task(
        &self,
        user_id: i64,
        task_id: i64,
    ) -> Result<TaskReward, ServiceError> {
        let task = self
            .db
            .tasks()
            .get_by_id(task_id)
            .await
            .internal("Failed to get task")?
            .ok_or_else(|| ServiceError::not_found("Task not found"))?;

        let outcome = self
            .db
            .tasks()
            .complete(user_id, task.id, task.points)
            .await
            .internal("Failed to complete task")?;

        match outcome {
            CompletionOutcome::Completed { balance } => {
                info!(user_id, task_id, points = task.points, balance, "Task completed");
                Ok(TaskReward {
                    task_id: task.id,
                    points: task.points,
                    balance,
                })
            }
            CompletionOutcome::AlreadyCompleted => {
                Err(ServiceError::conflict("Task already completed"))
            }
            CompletionOutcome::UserNotFound => Err(ServiceError::not_found("User not found")),
        }
    }

    /// Record `referrer_id` as the user's referrer and credit the referral
    /// bonus to the referrer. A user's referrer can be set only once.
    pub async fn add_referrer(&self, user_id: i64, referrer_id: i64) -> Result<(), ServiceError> {
        if user_id == referrer_id {
            return Err(ServiceError::validation("You cannot refer yourself"));
        }

        let outcome = self
            .db
            .users()
            .link_referrer(user_id, referrer_id, REFERRAL_BONUS)
            .await
            .internal("Failed to add referrer")?;

        match outcome {
            LinkOutcome::Linked { referrer_balance } => {
                info!(user_id, referrer_id, referrer_balance, "Referrer added");
                Ok(())
            }
            LinkOutcome::AlreadyLinked => Err(ServiceError::conflict("Referrer is already set")),
            LinkOutcome::UserNotFound => Err(ServiceError::not_found("User not found")),
            LinkOutcome::ReferrerNotFound => Err(ServiceError::not_found("Referrer not found")),
        }
    }

    pub async fn status(&self, user_id: i64) -> Result<UserStatus, ServiceError> {
        let user = self
            .db
            .users()
            .get_by_id(user_id)
            .await
            .internal("Failed to get user")?
            .ok_or_else(|| ServiceError::not_found("User not found"))?;

        Ok(UserStatus {
            id: user.id,
            username: user.username,
            balance: user.balance,
            referrer_id: user.referrer_id,
        })
    }

    /// Highest balances first; equal balances are ordered by ascending id.
    /// A `limit` above [`MAX_LEADERBOARD_LIMIT`] is capped to it.
    pub async fn leaderboard(&self, limit: i64) -> Result<Vec<LeaderboardEntry>, ServiceError> {
        if limit < 1 {
            return Err(ServiceError::validation("Limit must be at least 1"));
        }

        let users = self
            .db
            .users()
            .top_by_balance(limit.min(MAX_LEADERBOARD_LIMIT))
            .await
            .internal("Failed to load leaderboard")?;

        Ok(users
            .into_iter()
            .enumerate()
            .map(|(i, user)| LeaderboardEntry {
                id: user.id,
                username: user.username,
                balance: user.balance,
                rank: i + 1,
            })
            .collect())
    }

    pub async fn completed_tasks(&self, user_id: i64) -> Result<Vec<Task>, ServiceError> {
        self.db
            .tasks()
            .completed_by_user(user_id)
            .await
            .internal("Failed to list completed tasks")
    }
}
