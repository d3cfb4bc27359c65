//! Authentication error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::db::StoreError;

/// Why a presented token was not accepted.
///
/// The variants are for logs and tests. Responses collapse every
/// authentication failure into the same 401 body.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid subject type: {0}")]
    InvalidSubject(String),
    #[error("token not found")]
    TokenNotFound,
    #[error("token expired")]
    TokenExpired,
    #[error("token owner not found")]
    SubjectNotFound,
    #[error("subject type not allowed on this route")]
    ForbiddenSubjectType,
    #[error("subject is inactive")]
    InactiveSubject,
    #[error("insufficient role")]
    InsufficientRole,
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),
}

impl AuthError {
    /// True for failures answered with the generic "unauthenticated" response.
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            AuthError::TokenNotFound
                | AuthError::TokenExpired
                | AuthError::SubjectNotFound
                | AuthError::ForbiddenSubjectType
                | AuthError::InactiveSubject
        )
    }

    fn status_code(&self) -> StatusCode {
        if self.is_unauthenticated() {
            return StatusCode::UNAUTHORIZED;
        }
        match self {
            AuthError::InsufficientRole => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &'static str {
        if self.is_unauthenticated() {
            return "Not authenticated";
        }
        match self {
            AuthError::InsufficientRole => "Insufficient permissions",
            _ => "Internal error",
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UnknownTokenType(kind) => AuthError::InvalidSubject(kind),
            other => AuthError::StoreUnavailable(other),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: &'static str,
        }

        if self.is_unauthenticated() {
            tracing::debug!(reason = %self, "Authentication rejected");
        } else if matches!(self, AuthError::InsufficientRole) {
            tracing::debug!("Authorization rejected: insufficient role");
        } else {
            tracing::error!(error = %self, "Authentication failed");
        }

        (
            self.status_code(),
            Json(ErrorResponse {
                error: self.message(),
            }),
        )
            .into_response()
    }
}
