//! Bearer token storage.
//!
//! Each row is an opaque session secret owned by either a user or an admin.
//! Rows are independent, so every operation here touches a single row or a
//! single filtered bulk delete.

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;
use std::str::FromStr;

use super::StoreError;

/// Which table a token's `owner` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    Admin,
    User,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Admin => "Admin",
            TokenKind::User => "User",
        }
    }
}

impl FromStr for TokenKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Admin" => Ok(TokenKind::Admin),
            "User" => Ok(TokenKind::User),
            other => Err(StoreError::UnknownTokenType(other.to_string())),
        }
    }
}

/// A session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Row id, `None` until the token has been inserted.
    pub id: Option<i64>,
    pub kind: TokenKind,
    pub owner: i64,
    pub secret: String,
    pub times_extended: i64,
    /// Epoch milliseconds of creation or last extension.
    pub last_touched: i64,
}

#[derive(sqlx::FromRow)]
struct TokenRow {
    id: i64,
    token_type: String,
    owner: i64,
    token: String,
    times_extended: i64,
    last_touched: i64,
}

impl TryFrom<TokenRow> for Token {
    type Error = StoreError;

    fn try_from(row: TokenRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Some(row.id),
            kind: row.token_type.parse()?,
            owner: row.owner,
            secret: row.token,
            times_extended: row.times_extended,
            last_touched: row.last_touched,
        })
    }
}

/// Store for session tokens.
pub struct TokenStore {
    pool: SqlitePool,
}

impl TokenStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a token. Returns the new row id.
    pub async fn insert(&self, token: &Token) -> Result<i64, StoreError> {
        let result = sqlx::query(
            "INSERT INTO tokens (token_type, owner, token, times_extended, last_touched) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(token.kind.as_str())
        .bind(token.owner)
        .bind(&token.secret)
        .bind(token.times_extended)
        .bind(token.last_touched)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Find a token by its exact secret.
    pub async fn find_by_secret(&self, secret: &str) -> Result<Option<Token>, StoreError> {
        let row: Option<TokenRow> = sqlx::query_as(
            "SELECT id, token_type, owner, token, times_extended, last_touched FROM tokens WHERE token = ?",
        )
        .bind(secret)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Token::try_from).transpose()
    }

    /// List all tokens of an owner, most recently used first.
    pub async fn list_by_owner(
        &self,
        kind: TokenKind,
        owner: i64,
    ) -> Result<Vec<Token>, StoreError> {
        let rows: Vec<TokenRow> = sqlx::query_as(
            "SELECT id, token_type, owner, token, times_extended, last_touched FROM tokens WHERE token_type = ? AND owner = ? ORDER BY last_touched DESC, id DESC",
        )
        .bind(kind.as_str())
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Token::try_from).collect()
    }

    /// Bump `last_touched` to `now` and count the extension, but only if the
    /// stored value is at or before `not_after`. Returns whether a row changed.
    pub async fn touch(&self, id: i64, now: i64, not_after: i64) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE tokens SET last_touched = ?, times_extended = times_extended + 1 WHERE id = ? AND last_touched <= ?",
        )
        .bind(now)
        .bind(id)
        .bind(not_after)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a token by its secret.
    pub async fn delete_by_secret(&self, secret: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM tokens WHERE token = ?")
            .bind(secret)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete one token by id, only if it belongs to the given owner.
    pub async fn delete_owned(
        &self,
        kind: TokenKind,
        owner: i64,
        id: i64,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM tokens WHERE id = ? AND token_type = ? AND owner = ?")
            .bind(id)
            .bind(kind.as_str())
            .bind(owner)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every token of an owner.
    pub async fn delete_all_by_owner(&self, kind: TokenKind, owner: i64) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM tokens WHERE token_type = ? AND owner = ?")
            .bind(kind.as_str())
            .bind(owner)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete every token last touched strictly before `cutoff`.
    pub async fn delete_touched_before(&self, cutoff: i64) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM tokens WHERE last_touched < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
