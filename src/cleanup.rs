//! Scheduled removal of expired session tokens and stale rate-limit state.

use crate::rate_limit::RateLimitConfig;
use crate::session::SessionManager;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Interval between cleanup runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60); // 1 hour

/// Run all cleanup tasks once. Returns the number of tokens removed.
pub async fn run_cleanup(sessions: &SessionManager, rate_limit: &RateLimitConfig) -> u64 {
    let tracked = rate_limit.prune();
    debug!(tracked, "Pruned login rate limiter");

    match sessions.sweep_expired().await {
        Ok(count) => {
            if count > 0 {
                info!("Cleaned up {} expired tokens", count);
            }
            count
        }
        Err(e) => {
            error!("Failed to clean up expired tokens: {}", e);
            0
        }
    }
}

/// Spawn a background task that runs cleanup periodically.
/// Returns a handle that can be used to abort the task.
/// The first run is one interval out; `init_cleanup` already ran one at startup.
pub fn spawn_cleanup_scheduler(
    sessions: SessionManager,
    rate_limit: Arc<RateLimitConfig>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let start = tokio::time::Instant::now() + CLEANUP_INTERVAL;
        let mut interval = tokio::time::interval_at(start, CLEANUP_INTERVAL);

        loop {
            interval.tick().await;
            run_cleanup(&sessions, &rate_limit).await;
        }
    })
}
