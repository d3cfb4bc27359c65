//! Session API endpoints.
//!
//! - POST `/user` - Log in as a user, returns a bearer token
//! - POST `/admin` - Log in as an admin, returns a bearer token
//! - GET `/verify` - Check the presented token
//! - GET `/` - List the caller's sessions
//! - DELETE `/current` - Log out the presented token
//! - DELETE `/` - Log out everywhere
//! - DELETE `/{id}` - Revoke one of the caller's sessions

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::{ApiError, ResultExt};
use crate::auth::{AnySubject, Auth};
use crate::db::{Token, TokenKind};
use crate::impl_has_auth_backend;
use crate::password::{MAX_PASSWORD_LENGTH, verify_password_blocking};
use crate::rate_limit::{RateLimitConfig, rate_limit_login};
use crate::session::SessionManager;

#[derive(Clone)]
pub struct SessionsState {
    pub sessions: SessionManager,
    pub rate_limit: Arc<RateLimitConfig>,
}

impl_has_auth_backend!(SessionsState);

pub fn router(state: SessionsState) -> Router {
    let login_router = Router::new()
        .route("/user", post(login_user))
        .route("/admin", post(login_admin))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.rate_limit.clone(),
            rate_limit_login,
        ));

    let session_router = Router::new()
        .route("/", get(list_sessions).delete(end_all_sessions))
        .route("/verify", get(verify))
        .route("/current", delete(logout))
        .route("/{id}", delete(revoke_session))
        .with_state(state);

    Router::new().merge(login_router).merge(session_router)
}

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    token: String,
    token_type: TokenKind,
    owner: i64,
    times_extended: i64,
    last_touched: i64,
}

impl From<Token> for LoginResponse {
    fn from(token: Token) -> Self {
        Self {
            token: token.secret,
            token_type: token.kind,
            owner: token.owner,
            times_extended: token.times_extended,
            last_touched: token.last_touched,
        }
    }
}

/// Credentials of a candidate subject, as loaded from the store.
struct Candidate {
    id: i64,
    password_hash: String,
    active: bool,
}

/// Check a password against a candidate and open a session.
/// Every failure mode produces the same response.
async fn open_session(
    sessions: &SessionManager,
    kind: TokenKind,
    candidate: Option<Candidate>,
    password: String,
) -> Result<LoginResponse, ApiError> {
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ApiError::invalid_credentials());
    }

    // Unknown usernames still pay for a hash verification.
    let stored_hash = candidate.as_ref().map(|c| c.password_hash.clone());
    let valid = verify_password_blocking(password, stored_hash)
        .await
        .map_err(|e| ApiError::internal("Password verification failed", e))?;

    let Some(candidate) = candidate else {
        tracing::debug!(token_type = kind.as_str(), "Login for unknown username");
        return Err(ApiError::invalid_credentials());
    };
    if !valid {
        tracing::debug!(
            token_type = kind.as_str(),
            owner = candidate.id,
            "Login with wrong password"
        );
        return Err(ApiError::invalid_credentials());
    }

    if !candidate.active {
        tracing::debug!(
            token_type = kind.as_str(),
            owner = candidate.id,
            "Login for inactive subject"
        );
        return Err(ApiError::invalid_credentials());
    }

    let token = sessions
        .create_session(kind, candidate.id)
        .await
        .db_err("Failed to create session")?;

    tracing::info!(token_type = kind.as_str(), owner = candidate.id, "Logged in");
    Ok(token.into())
}

async fn login_user(
    State(state): State<SessionsState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let sessions = &state.sessions;
    let candidate = sessions
        .bounded(sessions.db().users().get_by_username(payload.username.trim()))
        .await
        .db_err("Failed to look up user")?
        .map(|user| Candidate {
            id: user.id,
            password_hash: user.password_hash,
            active: user.active,
        });

    let response = open_session(sessions, TokenKind::User, candidate, payload.password).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn login_admin(
    State(state): State<SessionsState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let sessions = &state.sessions;
    let candidate = sessions
        .bounded(sessions.db().admins().get_by_username(payload.username.trim()))
        .await
        .db_err("Failed to look up admin")?
        .map(|admin| Candidate {
            id: admin.id,
            password_hash: admin.password_hash,
            active: admin.active,
        });

    let response = open_session(sessions, TokenKind::Admin, candidate, payload.password).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyResponse {
    token_type: TokenKind,
    owner: i64,
    times_extended: i64,
    last_touched: i64,
}

/// Lightweight check that the presented token is still valid.
async fn verify(Auth(auth, ..): Auth<AnySubject>) -> impl IntoResponse {
    Json(VerifyResponse {
        token_type: auth.token.kind,
        owner: auth.token.owner,
        times_extended: auth.token.times_extended,
        last_touched: auth.token.last_touched,
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionInfo {
    id: i64,
    token_type: TokenKind,
    owner: i64,
    times_extended: i64,
    last_touched: i64,
    is_current: bool,
}

#[derive(Serialize)]
struct ListSessionsResponse {
    sessions: Vec<SessionInfo>,
}

async fn list_sessions(
    State(state): State<SessionsState>,
    Auth(auth, ..): Auth<AnySubject>,
) -> Result<impl IntoResponse, ApiError> {
    let tokens = state
        .sessions
        .list_sessions(auth.token.kind, auth.token.owner)
        .await
        .db_err("Failed to list sessions")?;

    let sessions = tokens
        .into_iter()
        .filter_map(|token| {
            let id = token.id?;
            Some(SessionInfo {
                id,
                token_type: token.kind,
                owner: token.owner,
                times_extended: token.times_extended,
                last_touched: token.last_touched,
                is_current: token.id == auth.token.id,
            })
        })
        .collect();

    Ok(Json(ListSessionsResponse { sessions }))
}

async fn logout(
    State(state): State<SessionsState>,
    Auth(auth, ..): Auth<AnySubject>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .sessions
        .end_session(&auth.token.secret)
        .await
        .db_err("Failed to end session")?;

    tracing::info!(
        token_type = auth.token.kind.as_str(),
        owner = auth.token.owner,
        "Logged out"
    );
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
struct RevokedCount {
    revoked: u64,
}

async fn end_all_sessions(
    State(state): State<SessionsState>,
    Auth(auth, ..): Auth<AnySubject>,
) -> Result<impl IntoResponse, ApiError> {
    let revoked = state
        .sessions
        .end_all_sessions(auth.token.kind, auth.token.owner)
        .await
        .db_err("Failed to end sessions")?;

    tracing::info!(
        token_type = auth.token.kind.as_str(),
        owner = auth.token.owner,
        revoked,
        "Logged out everywhere"
    );
    Ok(Json(RevokedCount { revoked }))
}

#[derive(Serialize)]
struct RevokedFlag {
    revoked: bool,
}

async fn revoke_session(
    State(state): State<SessionsState>,
    Auth(auth, ..): Auth<AnySubject>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let revoked = state
        .sessions
        .revoke_session(auth.token.kind, auth.token.owner, id)
        .await
        .db_err("Failed to revoke session")?;

    Ok(Json(RevokedFlag { revoked }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::db::Database;
    use crate::password::hash_password;
    use crate::session::SessionPolicy;

    async fn manager() -> SessionManager {
        let db = Database::open(":memory:").await.unwrap();
        SessionManager::new(db, Arc::new(ManualClock::new(0)), SessionPolicy::default())
    }

    #[tokio::test]
    async fn test_unknown_username_is_invalid_credentials() {
        let sessions = manager().await;
        let result = open_session(&sessions, TokenKind::User, None, "no such account".into()).await;
        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_known_username_opens_session() {
        let sessions = manager().await;
        let candidate = Candidate {
            id: 7,
            password_hash: hash_password("hunter2hunter2").unwrap(),
            active: true,
        };
        let response = open_session(&sessions, TokenKind::User, Some(candidate), "hunter2hunter2".into())
            .await
            .unwrap();
        let token = sessions.find(&response.token).await.unwrap().unwrap();
        assert_eq!(token.owner, 7);
    }
}
