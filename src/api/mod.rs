mod error;
mod tokens;
mod users;

use axum::Router;
use std::sync::Arc;

use crate::db::Database;
use crate::jwt::JwtConfig;
use crate::service::{AuthService, RewardService};

pub use error::ApiError;
pub use tokens::TokensState;
pub use users::UsersState;

fn states(db: Database, jwt: Arc<JwtConfig>, secure_cookies: bool) -> (TokensState, UsersState) {
    let auth = AuthService::new(db.clone(), jwt.clone());

    let tokens_state = TokensState {
        auth: auth.clone(),
        jwt: jwt.clone(),
        secure_cookies,
    };

    let users_state = UsersState {
        auth,
        rewards: RewardService::new(db),
        jwt,
    };

    (tokens_state, users_state)
}

/// Create the router for `/register`, `/login` and `/refresh`.
pub fn create_public_router(db: Database, jwt: Arc<JwtConfig>, secure_cookies: bool) -> Router {
    let (tokens_state, users_state) = states(db, jwt, secure_cookies);

    Router::new()
        .merge(users::public_router(users_state))
        .merge(tokens::public_router(tokens_state))
}

/// Create the authenticated API router (mounted at `/api`).
pub fn create_api_router(db: Database, jwt: Arc<JwtConfig>, secure_cookies: bool) -> Router {
    let (tokens_state, users_state) = states(db, jwt, secure_cookies);

    Router::new()
        .nest("/users", users::router(users_state))
        .merge(tokens::router(tokens_state))
}
