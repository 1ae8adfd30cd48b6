//! Scheduled cleanup of expired temporary tokens.

use crate::db::Database;
use crate::temp_token;
use std::time::Duration;
use tracing::{error, info};

/// Interval between cleanup runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60); // 1 hour

/// Run all cleanup tasks once.
pub async fn run_cleanup(db: &Database) {
    match db
        .users()
        .clear_expired_temp_tokens(temp_token::unix_now())
        .await
    {
        Ok(count) if count > 0 => info!("Cleaned up {} expired temporary tokens", count),
        Ok(_) => {}
        Err(e) => error!("Failed to clean up expired temporary tokens: {}", e),
    }
}

/// Spawn a background task that runs cleanup periodically.
/// Returns a handle that can be used to abort the task.
pub fn spawn_cleanup_scheduler(db: Database) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

        loop {
            interval.tick().await;
            run_cleanup(&db).await;
        }
    })
}
