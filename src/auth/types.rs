//! Authentication subject types.

use crate::db::{Admin, AdminRole, Token, TokenKind, User};

/// The entity a token authenticates.
#[derive(Debug, Clone)]
pub enum Subject {
    User(User),
    Admin(Admin),
}

impl Subject {
    pub fn kind(&self) -> TokenKind {
        match self {
            Subject::User(_) => TokenKind::User,
            Subject::Admin(_) => TokenKind::Admin,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Subject::User(user) => user.id,
            Subject::Admin(admin) => admin.id,
        }
    }

    pub fn is_active(&self) -> bool {
        match self {
            Subject::User(user) => user.active,
            Subject::Admin(admin) => admin.active,
        }
    }

    /// Role of an admin subject, `None` for users.
    pub fn admin_role(&self) -> Option<AdminRole> {
        match self {
            Subject::Admin(admin) => Some(admin.role),
            Subject::User(_) => None,
        }
    }
}

/// Result of a successful authentication.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub subject: Subject,
    /// The presented token, reflecting any freshness extension.
    pub token: Token,
}

/// Per-route requirements checked by the gate. Empty slices mean "any".
#[derive(Debug, Clone, Copy)]
pub struct AuthOptions {
    pub kinds: &'static [TokenKind],
    pub require_active: bool,
    pub admin_roles: &'static [AdminRole],
}

impl AuthOptions {
    pub const ANY: AuthOptions = AuthOptions {
        kinds: &[],
        require_active: true,
        admin_roles: &[],
    };
}
