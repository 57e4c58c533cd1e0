//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::db::{Database, NewTask};
use crate::jwt::{ACCESS_TOKEN_DURATION_SECS, REFRESH_TOKEN_DURATION_SECS};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "pointkeeper",
    about = "User accounts with point balances, task rewards and referrals"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "8080")]
    pub port: u16,

    /// Path to SQLite database file (":memory:" for a throwaway database)
    #[arg(short, long, default_value = "pointkeeper.db")]
    pub database: String,

    /// Path to file containing JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Access token lifetime in seconds
    #[arg(long, default_value_t = ACCESS_TOKEN_DURATION_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub access_token_ttl: u64,

    /// Refresh token lifetime in seconds
    #[arg(long, default_value_t = REFRESH_TOKEN_DURATION_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub refresh_token_ttl: u64,

    /// Set the Secure flag on auth cookies (enable behind HTTPS)
    #[arg(long)]
    pub secure_cookies: bool,

    /// JSON file with tasks to create on startup: [{"title", "description", "points"}]
    #[arg(long)]
    pub tasks_file: Option<String>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
/// The filter is read from `RUST_LOG` and defaults to `info`.
pub fn init_logging(format: &LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
        LogFormat::Compact => builder.compact().init(),
    }
}

/// Load JWT secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("JWT_SECRET") {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("JWT_SECRET") };
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        }
    } else {
        error!(
            "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        return None;
    };

    validate_jwt_secret(secret)
}

fn validate_jwt_secret(secret: String) -> Option<String> {
    if secret.len() < MIN_JWT_SECRET_LENGTH {
        error!(
            "JWT secret is shorter than {} characters. Use a longer secret",
            MIN_JWT_SECRET_LENGTH
        );
        return None;
    }
    Some(secret)
}

/// Build ServerConfig from validated arguments.
pub fn build_config(args: &Args, db: Database, jwt_secret: String) -> ServerConfig {
    ServerConfig {
        db,
        jwt_secret: jwt_secret.into_bytes(),
        access_token_ttl: args.access_token_ttl,
        refresh_token_ttl: args.refresh_token_ttl,
        secure_cookies: args.secure_cookies,
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}

/// Create the tasks listed in a JSON file. Tasks whose title already exists
/// are left untouched. Returns the number of tasks in the file.
pub async fn seed_tasks(db: &Database, path: &str) -> Option<usize> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            error!(path = %path, error = %e, "Failed to read tasks file");
            return None;
        }
    };

    let tasks: Vec<NewTask> = match serde_json::from_str(&content) {
        Ok(tasks) => tasks,
        Err(e) => {
            error!(path = %path, error = %e, "Invalid tasks file");
            return None;
        }
    };

    for task in &tasks {
        if task.points < 0 {
            error!(title = %task.title, "Task points must not be negative");
            return None;
        }
        if let Err(e) = db.tasks().create_if_missing(task).await {
            error!(title = %task.title, error = %e, "Failed to create task");
            return None;
        }
    }

    info!(path = %path, count = tasks.len(), "Tasks seeded");
    Some(tasks.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("pointkeeper-{}-{}", uuid::Uuid::new_v4(), name))
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["pointkeeper"]).unwrap();
        assert_eq!(args.database, "pointkeeper.db");
        assert_eq!(args.access_token_ttl, 900);
        assert_eq!(args.refresh_token_ttl, 7 * 24 * 60 * 60);
        assert!(!args.secure_cookies);
        assert!(args.tasks_file.is_none());
    }

    #[test]
    fn test_args_reject_zero_ttl() {
        assert!(Args::try_parse_from(["pointkeeper", "--access-token-ttl", "0"]).is_err());
    }

    #[test]
    fn test_short_jwt_secret_rejected() {
        assert!(validate_jwt_secret("too-short".to_string()).is_none());
        assert!(validate_jwt_secret("x".repeat(MIN_JWT_SECRET_LENGTH)).is_some());
    }

    #[tokio::test]
    async fn test_seed_tasks_is_idempotent() {
        let db = Database::open(":memory:").await.unwrap();
        let path = temp_path("tasks.json");
        std::fs::write(
            &path,
            r#"[
                {"title": "Follow on X", "description": "Follow the account", "points": 50},
                {"title": "Join Telegram", "points": 25}
            ]"#,
        )
        .unwrap();
        let path_str = path.to_str().unwrap();

        assert_eq!(seed_tasks(&db, path_str).await, Some(2));
        assert_eq!(seed_tasks(&db, path_str).await, Some(2));

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tasks")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 2);

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_seed_tasks_rejects_bad_file() {
        let db = Database::open(":memory:").await.unwrap();
        let path = temp_path("bad.json");
        std::fs::write(&path, "not json").unwrap();

        assert_eq!(seed_tasks(&db, path.to_str().unwrap()).await, None);
        assert_eq!(seed_tasks(&db, "/nonexistent/tasks.json").await, None);

        std::fs::remove_file(&path).ok();
    }
}
