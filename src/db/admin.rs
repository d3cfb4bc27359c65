use sqlx::sqlite::SqlitePool;
use std::str::FromStr;

#[derive(Clone)]
pub struct AdminStore {
    pool: SqlitePool,
}

/// Admin role for authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminRole {
    /// Day-to-day operator: manages users.
    Standard,
    /// Can also manage other admins.
    Super,
}

impl AdminRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminRole::Standard => "standard",
            AdminRole::Super => "super",
        }
    }
}

impl FromStr for AdminRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(AdminRole::Standard),
            "super" => Ok(AdminRole::Super),
            other => Err(format!("unknown admin role `{}`", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Admin {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub role: AdminRole,
    pub active: bool,
}

#[derive(sqlx::FromRow)]
struct AdminRow {
    id: i64,
    username: String,
    password_hash: String,
    role: String,
    active: i32,
}

impl From<AdminRow> for Admin {
    fn from(row: AdminRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            // Unknown roles get the least privilege.
            role: row.role.parse().unwrap_or(AdminRole::Standard),
            active: row.active != 0,
        }
    }
}

/// Admin listing. Never carries the password hash.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AdminSummary {
    pub id: i64,
    pub username: String,
    pub role: AdminRole,
    pub active: bool,
    pub created_at: String,
}

#[derive(sqlx::FromRow)]
struct AdminSummaryRow {
    id: i64,
    username: String,
    role: String,
    active: i32,
    created_at: String,
}

impl From<AdminSummaryRow> for AdminSummary {
    fn from(row: AdminSummaryRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            role: row.role.parse().unwrap_or(AdminRole::Standard),
            active: row.active != 0,
            created_at: row.created_at,
        }
    }
}

impl AdminStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create an active admin. Returns the admin ID.
    pub async fn create(
        &self,
        username: &str,
        password_hash: &str,
        role: AdminRole,
    ) -> Result<i64, sqlx::Error> {
        let result =
            sqlx::query("INSERT INTO admins (username, password_hash, role) VALUES (?, ?, ?)")
                .bind(username)
                .bind(password_hash)
                .bind(role.as_str())
                .execute(&self.pool)
                .await?;
        Ok(result.last_insert_rowid())
    }

    /// Get an admin by username (case-insensitive).
    pub async fn get_by_username(&self, username: &str) -> Result<Option<Admin>, sqlx::Error> {
        let row: Option<AdminRow> = sqlx::query_as(
            "SELECT id, username, password_hash, role, active FROM admins WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Admin::from))
    }

    /// Get an admin by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Admin>, sqlx::Error> {
        let row: Option<AdminRow> = sqlx::query_as(
            "SELECT id, username, password_hash, role, active FROM admins WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Admin::from))
    }

    /// Enable or disable an admin. Returns false if the admin does not exist.
    pub async fn set_active(&self, id: i64, active: bool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE admins SET active = ? WHERE id = ?")
            .bind(active as i32)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List all admins, oldest first.
    pub async fn list(&self) -> Result<Vec<AdminSummary>, sqlx::Error> {
        let rows: Vec<AdminSummaryRow> = sqlx::query_as(
            "SELECT id, username, role, active, created_at FROM admins ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(AdminSummary::from).collect())
    }
}
