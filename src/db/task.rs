//! Tasks and the per-user completion records that gate their reward.

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct TaskStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub points: i64,
}

/// Task definition as read from a seed file.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub points: i64,
}

/// Result of recording a task completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// Completion stored and reward credited; carries the user's new balance.
    Completed { balance: i64 },
    AlreadyCompleted,
    UserNotFound,
}

impl TaskStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a task by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Task>, sqlx::Error> {
        sqlx::query_as("SELECT id, title, description, points FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Insert a task unless one with the same title exists. Returns the task ID.
    pub async fn create_if_missing(&self, task: &NewTask) -> Result<i64, sqlx::Error> {
        sqlx::query(
            "INSERT INTO tasks (title, description, points) VALUES (?, ?, ?)
             ON CONFLICT (title) DO NOTHING",
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.points)
        .execute(&self.pool)
        .await?;

        let (id,): (i64,) = sqlx::query_as("SELECT id FROM tasks WHERE title = ?")
            .bind(&task.title)
            .fetch_one(&self.pool)
            .await?;
        Ok(id)
    }

    /// Record that `user_id` completed `task_id` and credit `points`.
    ///
    /// The balance increment and the completion row commit together: either
    /// both are stored or neither is, including when the caller is cancelled
    /// mid-way (the transaction rolls back on drop).
    pub async fn complete(
        &self,
        user_id: i64,
        task_id: i64,
        points: i64,
    ) -> Result<CompletionOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let balance: Option<(i64,)> =
            sqlx::query_as("UPDATE users SET balance = balance + ? WHERE id = ? RETURNING balance")
                .bind(points)
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some((balance,)) = balance else {
            tx.rollback().await?;
            return Ok(CompletionOutcome::UserNotFound);
        };

        let inserted =
            sqlx::query("INSERT OR IGNORE INTO user_tasks (user_id, task_id) VALUES (?, ?)")
                .bind(user_id)
                .bind(task_id)
                .execute(&mut *tx)
                .await?
                .rows_affected();

        if inserted == 0 {
            tx.rollback().await?;
            return Ok(CompletionOutcome::AlreadyCompleted);
        }

        tx.commit().await?;
        Ok(CompletionOutcome::Completed { balance })
    }

    /// Tasks completed by a user, oldest completion first.
    pub async fn completed_by_user(&self, user_id: i64) -> Result<Vec<Task>, sqlx::Error> {
        sqlx::query_as(
            "SELECT t.id, t.title, t.description, t.points
             FROM user_tasks ut JOIN tasks t ON t.id = ut.task_id
             WHERE ut.user_id = ?
             ORDER BY ut.completed_at, ut.rowid",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }
}
