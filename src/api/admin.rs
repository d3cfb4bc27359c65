//! Admin API endpoints.
//!
//! User management requires any active admin. Admin management requires a
//! super admin.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use super::error::{ApiError, ResultExt, is_unique_violation, validate_username};
use crate::auth::{AdminOnly, Auth, SuperAdminOnly};
use crate::db::{AdminRole, StoreError, TokenKind};
use crate::impl_has_auth_backend;
use crate::level::{EXPERIENCE_TABLE, LevelProgress};
use crate::password::{hash_password_blocking, validate_password};
use crate::session::SessionManager;

/// Largest experience grant accepted in one request.
pub const MAX_EXPERIENCE_GRANT: u32 = 1_000_000;

/// State for admin endpoints.
#[derive(Clone)]
pub struct AdminState {
    pub sessions: SessionManager,
}

impl_has_auth_backend!(AdminState);

pub fn router(state: AdminState) -> Router {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/{id}/disable", post(disable_user))
        .route("/users/{id}/enable", post(enable_user))
        .route("/users/{id}/experience", post(grant_experience))
        .route("/admins", get(list_admins).post(create_admin))
        .route("/admins/{id}/disable", post(disable_admin))
        .route("/admins/{id}/enable", post(enable_admin))
        .with_state(state)
}

#[derive(Serialize)]
struct ActiveResponse {
    id: i64,
    active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    revoked: Option<u64>,
}

/// List all users.
async fn list_users(
    State(state): State<AdminState>,
    _auth: Auth<AdminOnly>,
) -> Result<impl IntoResponse, ApiError> {
    let sessions = &state.sessions;
    let users = sessions
        .bounded(sessions.db().users().list())
        .await
        .db_err("Failed to list users")?;

    Ok(Json(users))
}

/// Deactivate a user and revoke every token it holds.
async fn disable_user(
    State(state): State<AdminState>,
    Auth(auth, ..): Auth<AdminOnly>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let sessions = &state.sessions;
    let found = sessions
        .bounded(sessions.db().users().set_active(id, false))
        .await
        .db_err("Failed to disable user")?;
    if !found {
        return Err(ApiError::not_found("User not found"));
    }

    let revoked = sessions
        .delete_all_owners_tokens(TokenKind::User, id)
        .await
        .db_err("Failed to revoke user tokens")?;

    tracing::info!(admin_id = auth.subject.id(), user_id = id, revoked, "User disabled");
    Ok(Json(ActiveResponse {
        id,
        active: false,
        revoked: Some(revoked),
    }))
}

async fn enable_user(
    State(state): State<AdminState>,
    Auth(auth, ..): Auth<AdminOnly>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let sessions = &state.sessions;
    let found = sessions
        .bounded(sessions.db().users().set_active(id, true))
        .await
        .db_err("Failed to enable user")?;
    if !found {
        return Err(ApiError::not_found("User not found"));
    }

    tracing::info!(admin_id = auth.subject.id(), user_id = id, "User enabled");
    Ok(Json(ActiveResponse {
        id,
        active: true,
        revoked: None,
    }))
}

#[derive(Deserialize)]
struct GrantExperienceRequest {
    amount: u32,
}

/// Add experience to a user and report the resulting level.
async fn grant_experience(
    State(state): State<AdminState>,
    Auth(auth, ..): Auth<AdminOnly>,
    Path(id): Path<i64>,
    Json(payload): Json<GrantExperienceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.amount == 0 || payload.amount > MAX_EXPERIENCE_GRANT {
        return Err(ApiError::bad_request(
            "Amount must be between 1 and 1000000",
        ));
    }

    let sessions = &state.sessions;
    let total = sessions
        .bounded(sessions.db().users().add_experience(id, payload.amount))
        .await
        .db_err("Failed to add experience")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    tracing::info!(
        admin_id = auth.subject.id(),
        user_id = id,
        amount = payload.amount,
        total,
        "Experience granted"
    );
    Ok(Json(LevelProgress::new(total, &EXPERIENCE_TABLE)))
}

/// List all admins.
async fn list_admins(
    State(state): State<AdminState>,
    _auth: Auth<SuperAdminOnly>,
) -> Result<impl IntoResponse, ApiError> {
    let sessions = &state.sessions;
    let admins = sessions
        .bounded(sessions.db().admins().list())
        .await
        .db_err("Failed to list admins")?;

    Ok(Json(admins))
}

#[derive(Deserialize)]
struct CreateAdminRequest {
    username: String,
    password: String,
    #[serde(default = "default_role")]
    role: AdminRole,
}

fn default_role() -> AdminRole {
    AdminRole::Standard
}

#[derive(Serialize)]
struct CreateAdminResponse {
    id: i64,
    username: String,
    role: AdminRole,
}

async fn create_admin(
    State(state): State<AdminState>,
    Auth(auth, ..): Auth<SuperAdminOnly>,
    Json(payload): Json<CreateAdminRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = validate_username(&payload.username)?.to_string();
    validate_password(&payload.password).map_err(ApiError::bad_request)?;

    let hash = hash_password_blocking(payload.password)
        .await
        .map_err(|e| ApiError::internal("Failed to hash password", e))?;

    let sessions = &state.sessions;
    let id = match sessions
        .bounded(sessions.db().admins().create(&username, &hash, payload.role))
        .await
    {
        Ok(id) => id,
        Err(StoreError::Database(e)) if is_unique_violation(&e) => {
            return Err(ApiError::conflict("Username is already taken"));
        }
        Err(e) => return Err(ApiError::db_error("Failed to create admin", e)),
    };

    tracing::info!(
        admin_id = auth.subject.id(),
        new_admin_id = id,
        role = payload.role.as_str(),
        "Admin created"
    );
    Ok((
        StatusCode::CREATED,
        Json(CreateAdminResponse {
            id,
            username,
            role: payload.role,
        }),
    ))
}

/// Deactivate another admin and revoke its tokens.
async fn disable_admin(
    State(state): State<AdminState>,
    Auth(auth, ..): Auth<SuperAdminOnly>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    if auth.subject.id() == id {
        return Err(ApiError::bad_request("Cannot disable your own account"));
    }

    let sessions = &state.sessions;
    let found = sessions
        .bounded(sessions.db().admins().set_active(id, false))
        .await
        .db_err("Failed to disable admin")?;
    if !found {
        return Err(ApiError::not_found("Admin not found"));
    }

    let revoked = sessions
        .delete_all_owners_tokens(TokenKind::Admin, id)
        .await
        .db_err("Failed to revoke admin tokens")?;

    tracing::info!(admin_id = auth.subject.id(), target_id = id, revoked, "Admin disabled");
    Ok(Json(ActiveResponse {
        id,
        active: false,
        revoked: Some(revoked),
    }))
}

async fn enable_admin(
    State(state): State<AdminState>,
    Auth(auth, ..): Auth<SuperAdminOnly>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let sessions = &state.sessions;
    let found = sessions
        .bounded(sessions.db().admins().set_active(id, true))
        .await
        .db_err("Failed to enable admin")?;
    if !found {
        return Err(ApiError::not_found("Admin not found"));
    }

    tracing::info!(admin_id = auth.subject.id(), target_id = id, "Admin enabled");
    Ok(Json(ActiveResponse {
        id,
        active: true,
        revoked: None,
    }))
}
