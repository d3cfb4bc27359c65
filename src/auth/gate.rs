//! Resolve a presented token secret to an authenticated subject.

use super::errors::AuthError;
use super::types::{AuthOptions, Authenticated, Subject};
use crate::db::{StoreError, TokenKind};
use crate::session::SessionManager;

/// Authenticate a bearer secret against the token store.
///
/// Every call goes to the store; nothing is cached. Store timeouts fail
/// closed as "not found". Freshness extension is best-effort and never
/// turns a successful authentication into a failure: it is awaited inline,
/// bounded by the store timeout, and a failed or timed out write is logged
/// and dropped. The returned token reflects the write only when it landed.
pub async fn authenticate(
    sessions: &SessionManager,
    secret: &str,
    options: &AuthOptions,
) -> Result<Authenticated, AuthError> {
    let mut token = match sessions.find(secret).await {
        Ok(Some(token)) => token,
        Ok(None) => return Err(AuthError::TokenNotFound),
        Err(e) if e.is_timeout() => {
            tracing::warn!("Token lookup timed out");
            return Err(AuthError::TokenNotFound);
        }
        Err(e) => return Err(e.into()),
    };

    if sessions.is_expired(&token) {
        return Err(AuthError::TokenExpired);
    }

    let subject = match resolve_subject(sessions, token.kind, token.owner).await {
        Ok(Some(subject)) => subject,
        Ok(None) => return Err(AuthError::SubjectNotFound),
        Err(e) if e.is_timeout() => {
            tracing::warn!(owner = token.owner, "Owner lookup timed out");
            return Err(AuthError::SubjectNotFound);
        }
        Err(e) => return Err(e.into()),
    };

    if !options.kinds.is_empty() && !options.kinds.contains(&subject.kind()) {
        return Err(AuthError::ForbiddenSubjectType);
    }

    if options.require_active && !subject.is_active() {
        return Err(AuthError::InactiveSubject);
    }

    if !options.admin_roles.is_empty() {
        let role = subject
            .admin_role()
            .ok_or(AuthError::ForbiddenSubjectType)?;
        if !options.admin_roles.contains(&role) {
            return Err(AuthError::InsufficientRole);
        }
    }

    if let Err(e) = sessions.extend_last_touched(&mut token).await {
        tracing::warn!(error = %e, "Failed to extend token");
    }

    Ok(Authenticated { subject, token })
}

async fn resolve_subject(
    sessions: &SessionManager,
    kind: TokenKind,
    owner: i64,
) -> Result<Option<Subject>, StoreError> {
    let db = sessions.db();
    match kind {
        TokenKind::User => Ok(sessions
            .bounded(db.users().get_by_id(owner))
            .await?
            .map(Subject::User)),
        TokenKind::Admin => Ok(sessions
            .bounded(db.admins().get_by_id(owner))
            .await?
            .map(Subject::Admin)),
    }
}
