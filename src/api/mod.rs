mod admin;
mod error;
mod sessions;
mod users;

use axum::Router;
use std::sync::Arc;

use crate::rate_limit::RateLimitConfig;
use crate::session::SessionManager;

pub use admin::MAX_EXPERIENCE_GRANT;
pub use error::ApiError;

/// Create the API router.
pub fn create_api_router(sessions: SessionManager, rate_limit: Arc<RateLimitConfig>) -> Router {
    let users_state = users::UsersState {
        sessions: sessions.clone(),
    };

    let sessions_state = sessions::SessionsState {
        sessions: sessions.clone(),
        rate_limit,
    };

    let admin_state = admin::AdminState { sessions };

    Router::new()
        .nest("/users", users::router(users_state))
        .nest("/sessions", sessions::router(sessions_state))
        .nest("/admin", admin::router(admin_state))
}
