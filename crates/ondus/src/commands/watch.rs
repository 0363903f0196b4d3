//! `watch`: run the notification watcher in the foreground.

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use ondus_core::{Gateway, spawn_notification_watcher};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::notifications;

pub async fn handle(gateway: &Gateway, global: &GlobalOpts) -> Result<(), CliError> {
    gateway.connect().await?;

    let interval = gateway.config().notification_poll_interval;
    let cancel = CancellationToken::new();
    let mut latest = gateway.latest_notification();
    let watcher = spawn_notification_watcher(gateway.clone(), interval, cancel.clone());
    output::notice(
        &format!("Watching for notifications every {}s (Ctrl-C to stop)", interval.as_secs()),
        global.quiet,
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let result = loop {
        tokio::select! {
            biased;
            signal = &mut ctrl_c => break signal.map_err(CliError::from),
            changed = latest.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let id = latest.borrow_and_update().clone();
                if let Some(id) = id {
                    announce(gateway, &id, global).await;
                }
            }
        }
    };

    cancel.cancel();
    if let Err(e) = watcher.await {
        warn!(error = %e, "notification watcher panicked");
    }
    result
}

async fn announce(gateway: &Gateway, id: &str, global: &GlobalOpts) {
    let found = async {
        let lease = gateway.lease().await?;
        lease.notifications().find(id).await
    }
    .await;

    match found {
        Ok(Some(n)) => {
            match output::render_single(global.format(), &*n, notifications::summary, |n| n.id.clone()) {
                Ok(out) => output::print_output(&out, global.quiet),
                Err(e) => warn!(error = %e, "failed to render notification"),
            }
        }
        Ok(None) => debug!(notification_id = id, "new notification vanished before lookup"),
        Err(e) => warn!(notification_id = id, error = %e, "failed to load new notification"),
    }
}
