//! Notification command handlers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tabled::Tabled;

use ondus_core::{EnrichedNotification, Gateway};

use crate::cli::{GlobalOpts, NotificationsArgs, NotificationsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct NotificationRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Appliance")]
    appliance: String,
    #[tabled(rename = "Message")]
    message: String,
    #[tabled(rename = "Read")]
    read: String,
}

impl From<&EnrichedNotification> for NotificationRow {
    fn from(n: &EnrichedNotification) -> Self {
        Self {
            id: n.id.clone(),
            time: output::or_dash(n.timestamp.map(util::local_time)),
            location: n.location_name.clone(),
            appliance: n.appliance_name.clone(),
            message: n.message.clone(),
            read: output::flag(n.is_read, true),
        }
    }
}

/// One-line summary, also used by `watch`.
pub fn summary(n: &EnrichedNotification) -> String {
    format!(
        "{}  {} / {}: {}",
        output::or_dash(n.timestamp.map(util::local_time)),
        n.location_name,
        n.appliance_name,
        n.message
    )
}

fn not_found(id: &str) -> CliError {
    CliError::NotFound {
        resource_type: "notification".into(),
        identifier: id.into(),
        list_command: "notifications list".into(),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    gateway: &Gateway,
    args: NotificationsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let lease = gateway.lease().await?;
    let directory = lease.notifications();

    match args.command {
        NotificationsCommand::List { location } => {
            let list = directory.get_notifications(location).await?;
            let out = output::render_list(
                global.format(),
                &list,
                |n: &Arc<EnrichedNotification>| NotificationRow::from(&**n),
                |n| n.id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        NotificationsCommand::Next {
            after,
            location,
            mark_read,
            delete,
        } => {
            let after = DateTime::<Utc>::from_timestamp(after, 0).ok_or_else(|| CliError::Validation {
                field: "after".into(),
                reason: format!("{after} is not a representable unix timestamp"),
            })?;
            let next = directory.next_after(after, location, mark_read, delete).await?;
            let out = output::render_single(
                global.format(),
                &next,
                |n| n.as_ref().map_or_else(|| "No newer notification".into(), summary),
                |n| n.as_ref().map(|n| n.id.clone()).unwrap_or_default(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        NotificationsCommand::Read { id } => {
            let notification = directory.find(&id).await?.ok_or_else(|| not_found(&id))?;
            if notification.is_read {
                output::notice("Notification already read", global.quiet);
                return Ok(());
            }
            if !directory.mark_as_read(&notification).await {
                return Err(CliError::OperationFailed {
                    action: format!("Marking notification {id} as read"),
                });
            }
            output::notice("Notification marked as read", global.quiet);
            Ok(())
        }

        NotificationsCommand::Delete { id } => {
            if !directory.delete(&id).await {
                return Err(CliError::OperationFailed {
                    action: format!("Deleting notification {id}"),
                });
            }
            output::notice("Notification deleted", global.quiet);
            Ok(())
        }
    }
}
