//! Session token lifecycle.
//!
//! Tokens are opaque 512-character hex secrets stored in the `tokens` table.
//! A token stays valid until its `last_touched` timestamp is older than the
//! expiration window. Authenticated requests push `last_touched` forward, at
//! most once per throttle window, so an active session never expires while
//! an idle one does.

use rand::RngCore;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::db::{Database, StoreError, Token, TokenKind};

/// Random bytes per secret. Hex encoding doubles the length.
pub const SECRET_BYTES: usize = 256;

/// Idle time after which a token expires: 7 days.
pub const TOKEN_EXPIRATION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Minimum time between two freshness extensions of the same token: 1 hour.
pub const EXTENSION_THROTTLE: Duration = Duration::from_secs(60 * 60);

/// Default bound on a single store operation.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Timing knobs for the session lifecycle.
#[derive(Debug, Clone, Copy)]
pub struct SessionPolicy {
    pub expiration: Duration,
    pub extension_throttle: Duration,
    pub store_timeout: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            expiration: TOKEN_EXPIRATION,
            extension_throttle: EXTENSION_THROTTLE,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }
}

/// Generate a fresh token secret.
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn millis(duration: Duration) -> i64 {
    duration.as_millis() as i64
}

/// Creates, extends and revokes session tokens.
///
/// Cheap to clone; holds the database pool, the clock and the policy.
#[derive(Clone)]
pub struct SessionManager {
    db: Database,
    clock: Arc<dyn Clock>,
    policy: SessionPolicy,
}

impl SessionManager {
    pub fn new(db: Database, clock: Arc<dyn Clock>, policy: SessionPolicy) -> Self {
        Self { db, clock, policy }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Run a store operation under the configured timeout.
    pub async fn bounded<T, E, F>(&self, op: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<StoreError>,
    {
        match tokio::time::timeout(self.policy.store_timeout, op).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(StoreError::Timeout(self.policy.store_timeout)),
        }
    }

    /// Build an unsaved token for the given owner.
    pub fn create_token(&self, kind: TokenKind, owner: i64) -> Token {
        Token {
            id: None,
            kind,
            owner,
            secret: generate_secret(),
            times_extended: 0,
            last_touched: self.now_millis(),
        }
    }

    /// True once the token has been idle for longer than the expiration window.
    pub fn is_expired(&self, token: &Token) -> bool {
        self.now_millis() - token.last_touched > millis(self.policy.expiration)
    }

    /// Push `last_touched` to now unless the token was touched within the
    /// throttle window. Returns whether the store was updated.
    ///
    /// On success the passed token is updated to mirror the stored row.
    pub async fn extend_last_touched(&self, token: &mut Token) -> Result<bool, StoreError> {
        let Some(id) = token.id else {
            return Ok(false);
        };

        let now = self.now_millis();
        let throttle = millis(self.policy.extension_throttle);
        if now - token.last_touched < throttle {
            return Ok(false);
        }

        let extended = self
            .bounded(self.db.tokens().touch(id, now, now - throttle))
            .await?;
        if extended {
            token.last_touched = now;
            token.times_extended += 1;
        }
        Ok(extended)
    }

    /// Revoke every token of an owner. Zero matches is not an error.
    pub async fn delete_all_owners_tokens(
        &self,
        kind: TokenKind,
        owner: i64,
    ) -> Result<u64, StoreError> {
        self.bounded(self.db.tokens().delete_all_by_owner(kind, owner))
            .await
    }

    /// Delete every expired token in one filtered bulk delete.
    pub async fn sweep_expired(&self) -> Result<u64, StoreError> {
        let cutoff = self.now_millis() - millis(self.policy.expiration);
        self.bounded(self.db.tokens().delete_touched_before(cutoff))
            .await
    }

    /// Create and persist a token for a subject that just proved its credentials.
    pub async fn create_session(&self, kind: TokenKind, owner: i64) -> Result<Token, StoreError> {
        let mut token = self.create_token(kind, owner);
        let id = self.bounded(self.db.tokens().insert(&token)).await?;
        token.id = Some(id);
        Ok(token)
    }

    /// Look up a token by secret.
    pub async fn find(&self, secret: &str) -> Result<Option<Token>, StoreError> {
        self.bounded(self.db.tokens().find_by_secret(secret)).await
    }

    /// Revoke a single token by secret. Returns whether it existed.
    pub async fn end_session(&self, secret: &str) -> Result<bool, StoreError> {
        self.bounded(self.db.tokens().delete_by_secret(secret))
            .await
    }

    /// Revoke every token of an owner.
    pub async fn end_all_sessions(&self, kind: TokenKind, owner: i64) -> Result<u64, StoreError> {
        self.delete_all_owners_tokens(kind, owner).await
    }

    /// List an owner's tokens, most recently used first.
    pub async fn list_sessions(
        &self,
        kind: TokenKind,
        owner: i64,
    ) -> Result<Vec<Token>, StoreError> {
        self.bounded(self.db.tokens().list_by_owner(kind, owner))
            .await
    }

    /// Revoke one of an owner's tokens by id.
    pub async fn revoke_session(
        &self,
        kind: TokenKind,
        owner: i64,
        id: i64,
    ) -> Result<bool, StoreError> {
        self.bounded(self.db.tokens().delete_owned(kind, owner, id))
            .await
    }
}
