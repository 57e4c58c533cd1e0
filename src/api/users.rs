//! User endpoints.
//!
//! In `/{id}/status` and `/{id}/tasks`, `{id}` is the user being read and has
//! to match the authenticated principal. In `/{id}/task/complete` it is the
//! task and in `/{id}/referrer` the referrer; the acting user is always the
//! principal.

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::{ApiError, parse_path_id};
use super::tokens::Credentials;
use crate::auth::{Auth, AuthenticatedUser};
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;
use crate::service::{AuthService, RewardService};

const DEFAULT_LEADERBOARD_LIMIT: i64 = 10;

#[derive(Clone)]
pub struct UsersState {
    pub auth: AuthService,
    pub rewards: RewardService,
    pub jwt: Arc<JwtConfig>,
}

impl_has_auth_backend!(UsersState);

/// Routes reachable without an access token.
pub fn public_router(state: UsersState) -> Router {
    Router::new()
        .route("/register", post(register))
        .with_state(state)
}

/// Routes nested under `/api/users`.
pub fn router(state: UsersState) -> Router {
    Router::new()
        .route("/leaderboard", get(leaderboard))
        .route("/{id}/status", get(status))
        .route("/{id}/tasks", get(completed_tasks))
        .route("/{id}/task/complete", post(complete_task))
        .route("/{id}/referrer", post(add_referrer))
        .with_state(state)
}

/// Resolve the `{id}` segment and require it to be the caller.
fn own_user_id(
    path: Result<Path<String>, PathRejection>,
    user: &AuthenticatedUser,
) -> Result<i64, ApiError> {
    let id = parse_path_id(path, "user")?;
    if id != user.user_id {
        return Err(ApiError::forbidden("You can only act on your own account"));
    }
    Ok(id)
}

async fn register(
    State(state): State<UsersState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;

    let user = state
        .auth
        .register(&payload.username, &payload.password)
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

async fn status(
    State(state): State<UsersState>,
    Auth(user): Auth,
    path: Result<Path<String>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = own_user_id(path, &user)?;
    let status = state.rewards.status(id).await?;
    Ok(Json(status))
}

#[derive(Deserialize)]
struct LeaderboardQuery {
    limit: Option<i64>,
}

async fn leaderboard(
    State(state): State<UsersState>,
    Auth(_user): Auth,
    query: Result<Query<LeaderboardQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let entries = state
        .rewards
        .leaderboard(query.limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT))
        .await?;
    Ok(Json(entries))
}

async fn completed_tasks(
    State(state): State<UsersState>,
    Auth(user): Auth,
    path: Result<Path<String>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = own_user_id(path, &user)?;
    let tasks = state.rewards.completed_tasks(id).await?;
    Ok(Json(tasks))
}

async fn complete_task(
    State(state): State<UsersState>,
    Auth(user): Auth,
    path: Result<Path<String>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let task_id = parse_path_id(path, "task")?;

    let reward = state.rewards.complete_task(user.user_id, task_id).await?;
    Ok(Json(reward))
}

#[derive(Serialize)]
struct ReferrerResponse {
    referrer_id: i64,
}

async fn add_referrer(
    State(state): State<UsersState>,
    Auth(user): Auth,
    path: Result<Path<String>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let referrer_id = parse_path_id(path, "referrer")?;

    state.rewards.add_referrer(user.user_id, referrer_id).await?;
    Ok(Json(ReferrerResponse { referrer_id }))
}
