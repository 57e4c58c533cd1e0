//! Session endpoints.
//!
//! - POST `/login` - Verify credentials, return a token pair and set cookies
//! - POST `/refresh` - Exchange a refresh token for a new pair (rotation)
//! - POST `/api/logout` - Revoke every refresh session and clear cookies

use axum::{
    Json, Router,
    body::Bytes,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{AppendHeaders, IntoResponse},
    routing::post,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::error::ApiError;
use crate::auth::{
    ACCESS_COOKIE_NAME, Auth, REFRESH_COOKIE_NAME, clear_cookie, get_cookie, set_cookie,
};
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;
use crate::service::{AuthService, TokenPair};

#[derive(Clone)]
pub struct TokensState {
    pub auth: AuthService,
    pub jwt: Arc<JwtConfig>,
    pub secure_cookies: bool,
}

impl_has_auth_backend!(TokensState);

/// Routes reachable without an access token.
pub fn public_router(state: TokensState) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .with_state(state)
}

/// Routes nested under `/api`.
pub fn router(state: TokensState) -> Router {
    Router::new()
        .route("/logout", post(logout))
        .with_state(state)
}

#[derive(Deserialize)]
pub(super) struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize, Default)]
struct RefreshRequest {
    #[serde(default)]
    refresh_token: Option<String>,
}

fn token_response(pair: TokenPair, secure: bool) -> impl IntoResponse {
    let access_cookie = set_cookie(
        ACCESS_COOKIE_NAME,
        &pair.access_token,
        pair.expires_in,
        secure,
    );
    let refresh_cookie = set_cookie(
        REFRESH_COOKIE_NAME,
        &pair.refresh_token,
        pair.refresh_expires_in,
        secure,
    );

    (
        StatusCode::OK,
        AppendHeaders([(SET_COOKIE, access_cookie), (SET_COOKIE, refresh_cookie)]),
        Json(pair),
    )
}

async fn login(
    State(state): State<TokensState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;

    let pair = state.auth.login(&payload.username, &payload.password).await?;

    Ok(token_response(pair, state.secure_cookies))
}

/// The refresh token comes from the JSON body when given, otherwise from the
/// `refresh_token` cookie.
async fn refresh(
    State(state): State<TokensState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let request: RefreshRequest = if body.iter().all(u8::is_ascii_whitespace) {
        RefreshRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::bad_request(format!("Invalid request body: {}", e)))?
    };

    let token = request
        .refresh_token
        .filter(|token| !token.is_empty())
        .or_else(|| {
            get_cookie(&headers, REFRESH_COOKIE_NAME)
                .filter(|token| !token.is_empty())
                .map(str::to_string)
        })
        .ok_or_else(|| ApiError::unauthorized("No refresh token"))?;

    let pair = state.auth.refresh(&token).await?;

    Ok(token_response(pair, state.secure_cookies))
}

async fn logout(
    State(state): State<TokensState>,
    Auth(user): Auth,
) -> Result<impl IntoResponse, ApiError> {
    state.auth.logout(user.user_id).await?;

    let clear_access = clear_cookie(ACCESS_COOKIE_NAME, state.secure_cookies);
    let clear_refresh = clear_cookie(REFRESH_COOKIE_NAME, state.secure_cookies);

    Ok((
        StatusCode::OK,
        AppendHeaders([(SET_COOKIE, clear_access), (SET_COOKIE, clear_refresh)]),
        Json(json!({ "success": true })),
    ))
}
