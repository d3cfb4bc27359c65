pub mod api;
pub mod auth;
pub mod cleanup;
pub mod cli;
pub mod clock;
pub mod db;
pub mod level;
pub mod password;
pub mod rate_limit;
pub mod session;

use api::create_api_router;
use axum::Router;
use clock::Clock;
use db::Database;
use rate_limit::RateLimitConfig;
use session::{SessionManager, SessionPolicy};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Time source for token expiry and extension
    pub clock: Arc<dyn Clock>,
    /// Expiration, extension throttle and store timeout
    pub session_policy: SessionPolicy,
    /// Per-IP login quota, shared with the cleanup task for pruning
    pub rate_limit: Arc<RateLimitConfig>,
}

impl ServerConfig {
    /// Build the session manager shared by every router.
    pub fn session_manager(&self) -> SessionManager {
        SessionManager::new(self.db.clone(), self.clock.clone(), self.session_policy)
    }
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    Router::new().nest(
        "/api",
        create_api_router(config.session_manager(), config.rate_limit.clone()),
    )
}

/// Run cleanup tasks and spawn background scheduler.
/// Call this before starting the server.
pub async fn init_cleanup(config: &ServerConfig) {
    let sessions = config.session_manager();
    cleanup::run_cleanup(&sessions, &config.rate_limit).await;
    cleanup::spawn_cleanup_scheduler(sessions, config.rate_limit.clone());
}

/// Run the server on the given listener. This function blocks until the server exits.
/// Call `init_cleanup` before this to run cleanup on startup.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}
