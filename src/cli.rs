//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::clock::SystemClock;
use crate::db::{AdminRole, Database};
use crate::password::hash_password_blocking;
use crate::rate_limit::{DEFAULT_LOGIN_ATTEMPTS_PER_MINUTE, RateLimitConfig};
use crate::session::SessionPolicy;
use clap::Parser;
use rand::Rng;
use rand::distr::Alphanumeric;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Length of the generated bootstrap admin password.
const GENERATED_PASSWORD_LENGTH: usize = 24;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "Reelgate",
    about = "Token sessions for users and admins of a video subscription service"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "REELGATE_PORT", default_value = "7300")]
    pub port: u16,

    /// Path to SQLite database file, or ":memory:"
    #[arg(short, long, env = "REELGATE_DATABASE", default_value = "reelgate.db")]
    pub database: String,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,

    /// Upper bound for a single store operation, in milliseconds
    #[arg(long, default_value = "5000", value_parser = clap::value_parser!(u64).range(1..))]
    pub store_timeout_ms: u64,

    /// Login attempts allowed per client IP and minute
    #[arg(long, default_value_t = DEFAULT_LOGIN_ATTEMPTS_PER_MINUTE)]
    pub login_attempts_per_minute: u32,

    /// Take the client IP from X-Forwarded-For (only behind a trusted proxy)
    #[arg(long)]
    pub trust_forwarded_for: bool,

    /// Create a super admin with this username and print its generated password
    #[arg(long, value_name = "USERNAME")]
    pub create_admin: Option<String>,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Generate a random alphanumeric password.
pub fn generate_password() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_PASSWORD_LENGTH)
        .map(char::from)
        .collect()
}

/// Handle the --create-admin flag: create a super admin with a generated password.
/// Returns false and logs an error if the admin could not be created.
pub async fn handle_create_admin(db: &Database, username: &str) -> bool {
    match db.admins().get_by_username(username).await {
        Ok(Some(_)) => {
            error!(username = %username, "Admin already exists");
            return false;
        }
        Ok(None) => {}
        Err(e) => {
            error!(error = %e, "Failed to check for existing admin");
            return false;
        }
    }

    let password = generate_password();
    let hash = match hash_password_blocking(password.clone()).await {
        Ok(hash) => hash,
        Err(e) => {
            error!(error = %e, "Failed to hash admin password");
            return false;
        }
    };

    match db.admins().create(username, &hash, AdminRole::Super).await {
        Ok(id) => {
            info!(admin_id = id, username = %username, "Super admin created");
            println!();
            println!("Super admin created: {}", username);
            println!("Password: {}", password);
            println!();
            true
        }
        Err(e) => {
            error!(error = %e, "Failed to create admin");
            false
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(db: Database, args: &Args) -> ServerConfig {
    ServerConfig {
        db,
        clock: Arc::new(SystemClock),
        session_policy: SessionPolicy {
            store_timeout: Duration::from_millis(args.store_timeout_ms),
            ..SessionPolicy::default()
        },
        rate_limit: Arc::new(RateLimitConfig::new(
            args.login_attempts_per_minute,
            args.trust_forwarded_for,
        )),
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
