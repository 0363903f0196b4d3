// ── Notification watcher ──
//
// Background task that polls the id of the newest notification and
// flushes the cache when it changes, so the next listing sees it.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::gateway::Gateway;

/// Spawn the watcher. The first check runs immediately.
pub fn spawn_notification_watcher(
    gateway: Gateway,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(watch_task(gateway, interval, cancel))
}

async fn watch_task(gateway: Gateway, interval: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut latest: Option<String> = None;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = poll_once(&gateway, &mut latest).await {
                    warn!(error = %e, "notification poll failed");
                }
            }
        }
    }
    debug!("notification watcher stopped");
}

/// One poll. Returns whether the newest notification changed.
///
/// Changes are also published to [`Gateway::latest_notification`].
pub async fn poll_once(gateway: &Gateway, latest: &mut Option<String>) -> Result<bool, CoreError> {
    let lease = gateway.lease().await?;
    let current = lease.notifications().get_latest_notification_id().await?;
    if current == *latest {
        return Ok(false);
    }

    lease.flush_all();
    info!(notification_id = current.as_deref().unwrap_or("none"), "latest notification changed");
    gateway.publish_latest_notification(current.clone());
    *latest = current;
    Ok(true)
}
