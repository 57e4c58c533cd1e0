//! Shared helpers for the router-level tests.

#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode, header},
};
use pointkeeper::{ServerConfig, create_app, db::Database};
use serde_json::Value;
use tower::ServiceExt;

pub const JWT_SECRET: &str = "test-jwt-secret-that-is-at-least-32-chars";
pub const PASSWORD: &str = "hunter22";

pub struct TestApp {
    pub router: Router,
    pub db: Database,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// All `Set-Cookie` header values.
    pub fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }
}

impl TestApp {
    pub async fn new() -> Self {
        let db = Database::open(":memory:")
            .await
            .expect("Failed to open test database");
        let config = ServerConfig::new(db.clone(), JWT_SECRET);
        Self {
            router: create_app(&config),
            db,
        }
    }

    /// App whose tokens expire after the given number of seconds.
    pub async fn with_ttls(access: u64, refresh: u64) -> Self {
        let db = Database::open(":memory:")
            .await
            .expect("Failed to open test database");
        let mut config = ServerConfig::new(db.clone(), JWT_SECRET);
        config.access_token_ttl = access;
        config.refresh_token_ttl = refresh;
        Self {
            router: create_app(&config),
            db,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn post_json(&self, uri: &str, body: Value, token: Option<&str>) -> TestResponse {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method("POST").uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// `POST /api/users/{task}/task/complete` as the token's user.
    pub async fn complete_task(&self, task: i64, token: &str) -> TestResponse {
        self.post(&format!("/api/users/{}/task/complete", task), Some(token))
            .await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// Register a user and return its ID.
    pub async fn register(&self, username: &str) -> i64 {
        let response = self
            .post_json(
                "/register",
                serde_json::json!({ "username": username, "password": PASSWORD }),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.body["id"].as_i64().unwrap()
    }

    /// Log in and return `(access_token, refresh_token)`.
    pub async fn login(&self, username: &str) -> (String, String) {
        let response = self
            .post_json(
                "/login",
                serde_json::json!({ "username": username, "password": PASSWORD }),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
        (
            response.body["access_token"].as_str().unwrap().to_string(),
            response.body["refresh_token"].as_str().unwrap().to_string(),
        )
    }

    /// Register and log in; returns `(id, access_token)`.
    pub async fn signup(&self, username: &str) -> (i64, String) {
        let id = self.register(username).await;
        let (access, _) = self.login(username).await;
        (id, access)
    }

    pub async fn create_task(&self, title: &str, points: i64) -> i64 {
        self.db
            .tasks()
            .create_if_missing(&pointkeeper::db::NewTask {
                title: title.to_string(),
                description: String::new(),
                points,
            })
            .await
            .unwrap()
    }
}
