//! Bearer authentication for the `/api` routes.
//!
//! Access tokens are validated statelessly (signature, expiry, token type).
//! Refresh tokens never authenticate a request; they are only exchanged at
//! `POST /refresh`.

mod cookie;
mod errors;
mod extractors;
mod state;
mod types;

pub use cookie::{
    ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME, bearer_token, clear_cookie, extract_access_token,
    get_cookie, set_cookie,
};
pub use errors::{ApiAuthError, AuthErrorKind};
pub use extractors::Auth;
pub use state::HasAuthBackend;
pub use types::AuthenticatedUser;
