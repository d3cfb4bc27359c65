//! Axum extractors for authentication.

use std::marker::PhantomData;

use axum::{extract::FromRequestParts, http::request::Parts};

use super::bearer::get_bearer_token;
use super::errors::AuthError;
use super::gate::authenticate;
use super::state::HasAuthBackend;
use super::types::{AuthOptions, Authenticated};
use crate::db::{AdminRole, TokenKind};

/// Route-level requirements, checked by the `Auth` extractor.
pub trait SubjectConstraint: Send + Sync + 'static {
    const OPTIONS: AuthOptions;
}

/// Any active user or admin.
pub struct AnySubject;

impl SubjectConstraint for AnySubject {
    const OPTIONS: AuthOptions = AuthOptions::ANY;
}

/// Active users only.
pub struct UserOnly;

impl SubjectConstraint for UserOnly {
    const OPTIONS: AuthOptions = AuthOptions {
        kinds: &[TokenKind::User],
        require_active: true,
        admin_roles: &[],
    };
}

/// Active admins of any role.
pub struct AdminOnly;

impl SubjectConstraint for AdminOnly {
    const OPTIONS: AuthOptions = AuthOptions {
        kinds: &[TokenKind::Admin],
        require_active: true,
        admin_roles: &[],
    };
}

/// Active super admins.
pub struct SuperAdminOnly;

impl SubjectConstraint for SuperAdminOnly {
    const OPTIONS: AuthOptions = AuthOptions {
        kinds: &[TokenKind::Admin],
        require_active: true,
        admin_roles: &[AdminRole::Super],
    };
}

/// Extractor for endpoints that require a bearer token.
///
/// Use as `Auth<UserOnly>`, `Auth<AdminOnly>` etc. A missing header is
/// rejected the same way as an unknown token.
pub struct Auth<C: SubjectConstraint = AnySubject>(pub Authenticated, pub PhantomData<fn() -> C>);

impl<S, C> FromRequestParts<S> for Auth<C>
where
    S: HasAuthBackend + Send + Sync,
    C: SubjectConstraint,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let secret = get_bearer_token(&parts.headers).ok_or(AuthError::TokenNotFound)?;
        let authenticated = authenticate(state.sessions(), secret, &C::OPTIONS).await?;
        Ok(Auth(authenticated, PhantomData))
    }
}
