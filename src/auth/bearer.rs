//! Bearer token parsing.

use axum::http::{HeaderMap, header};

/// Extract the secret from an `Authorization: Bearer <secret>` header.
///
/// The scheme is matched case-insensitively. Empty secrets are treated as absent.
pub fn get_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, secret) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let secret = secret.trim();
    (!secret.is_empty()).then_some(secret)
}
