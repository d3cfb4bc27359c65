//! User API endpoints.
//!
//! - POST `/` - Register a user
//! - GET `/me` - Profile of the authenticated user, with level progress

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use super::error::{ApiError, is_unique_violation, validate_username};
use crate::auth::{Auth, Subject, UserOnly};
use crate::db::StoreError;
use crate::impl_has_auth_backend;
use crate::level::{EXPERIENCE_TABLE, LevelProgress};
use crate::password::{hash_password_blocking, validate_password};
use crate::session::SessionManager;

#[derive(Clone)]
pub struct UsersState {
    pub sessions: SessionManager,
}

impl_has_auth_backend!(UsersState);

pub fn router(state: UsersState) -> Router {
    Router::new()
        .route("/", post(create_user))
        .route("/me", get(me))
        .with_state(state)
}

#[derive(Deserialize)]
struct CreateUserRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct CreateUserResponse {
    id: i64,
    username: String,
}

async fn create_user(
    State(state): State<UsersState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = validate_username(&payload.username)?.to_string();
    validate_password(&payload.password).map_err(ApiError::bad_request)?;

    let hash = hash_password_blocking(payload.password)
        .await
        .map_err(|e| ApiError::internal("Failed to hash password", e))?;

    let sessions = &state.sessions;
    let id = match sessions
        .bounded(sessions.db().users().create(&username, &hash))
        .await
    {
        Ok(id) => id,
        Err(StoreError::Database(e)) if is_unique_violation(&e) => {
            return Err(ApiError::conflict("Username is already taken"));
        }
        Err(e) => return Err(ApiError::db_error("Failed to create user", e)),
    };

    tracing::info!(user_id = id, username = %username, "User registered");
    Ok((StatusCode::CREATED, Json(CreateUserResponse { id, username })))
}

#[derive(Serialize)]
struct ProfileResponse {
    id: i64,
    username: String,
    #[serde(flatten)]
    progress: LevelProgress,
}

async fn me(Auth(auth, ..): Auth<UserOnly>) -> Result<impl IntoResponse, ApiError> {
    let Subject::User(user) = auth.subject else {
        return Err(ApiError::unauthorized("Not authenticated"));
    };

    Ok(Json(ProfileResponse {
        id: user.id,
        username: user.username,
        progress: LevelProgress::new(user.experience, &EXPERIENCE_TABLE),
    }))
}
