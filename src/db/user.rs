use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub balance: i64,
    pub referrer_id: Option<i64>,
}

/// Result of trying to set a user's referrer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    /// Link stored and bonus credited; carries the referrer's new balance.
    Linked { referrer_balance: i64 },
    UserNotFound,
    AlreadyLinked,
    ReferrerNotFound,
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user with a zero balance. Returns the user ID.
    pub async fn create(&self, username: &str, password_hash: &str) -> Result<i64, sqlx::Error> {
        let result = sqlx::query("INSERT INTO users (username, password_hash) VALUES (?, ?)")
            .bind(username)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    /// Get a user by username.
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, username, password_hash, balance, referrer_id FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, username, password_hash, balance, referrer_id FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Atomically add `delta` to a user's balance.
    /// Returns the new balance, or `None` if the user does not exist.
    pub async fn add_balance(&self, id: i64, delta: i64) -> Result<Option<i64>, sqlx::Error> {
        let row: Option<(i64,)> =
            sqlx::query_as("UPDATE users SET balance = balance + ? WHERE id = ? RETURNING balance")
                .bind(delta)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|r| r.0))
    }

    /// Users ordered by balance (highest first), ties broken by ascending id.
    pub async fn top_by_balance(&self, limit: i64) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, username, password_hash, balance, referrer_id FROM users
             ORDER BY balance DESC, id ASC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    /// Set `referrer_id` on a user that has none yet and credit `bonus` to the
    /// referrer, in one transaction.
    pub async fn link_referrer(
        &self,
        user_id: i64,
        referrer_id: i64,
        bonus: i64,
    ) -> Result<LinkOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let linked = sqlx::query(
            "UPDATE users SET referrer_id = ?2
             WHERE id = ?1 AND referrer_id IS NULL
               AND EXISTS (SELECT 1 FROM users WHERE id = ?2)",
        )
        .bind(user_id)
        .bind(referrer_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if linked == 0 {
            tx.rollback().await?;
            return self.classify_link_failure(user_id).await;
        }

        let (referrer_balance,): (i64,) =
            sqlx::query_as("UPDATE users SET balance = balance + ? WHERE id = ? RETURNING balance")
                .bind(bonus)
                .bind(referrer_id)
                .fetch_one(&mut *tx)
                .await?;

        tx.commit().await?;
        Ok(LinkOutcome::Linked { referrer_balance })
    }

    async fn classify_link_failure(&self, user_id: i64) -> Result<LinkOutcome, sqlx::Error> {
        let outcome = match self.get_by_id(user_id).await? {
            None => LinkOutcome::UserNotFound,
            Some(user) if user.referrer_id.is_some() => LinkOutcome::AlreadyLinked,
            Some(_) => LinkOutcome::ReferrerNotFound,
        };
        Ok(outcome)
    }
}
