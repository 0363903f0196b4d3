// Notification endpoints
//
// Cursor pagination via `pageSize` + `continuationToken`. Mutations
// address a notification by id at the profile level.

use tracing::debug;

use crate::client::OndusClient;
use crate::error::Error;
use crate::models::{Notification, NotificationPage, NotificationReadCommand};

impl OndusClient {
    /// Fetch one page of notifications, newest first.
    ///
    /// `GET profile/notifications?pageSize={n}[&continuationToken={t}]`
    pub async fn list_notifications(
        &self,
        page_size: u32,
        continuation_token: Option<&str>,
    ) -> Result<NotificationPage, Error> {
        let mut url = self.api_url("profile/notifications")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("pageSize", &page_size.to_string());
            if let Some(token) = continuation_token {
                query.append_pair("continuationToken", token);
            }
        }
        debug!(page_size, has_token = continuation_token.is_some(), "listing notifications");
        self.get(url).await
    }

    /// Mark a notification as read.
    ///
    /// `PUT profile/notifications/{id}`
    pub async fn mark_notification_read(&self, notification: &Notification) -> Result<(), Error> {
        let url = self.api_url(&format!("profile/notifications/{}", notification.id))?;
        debug!(notification_id = %notification.id, "marking notification as read");
        self.put(url, &NotificationReadCommand::from(notification)).await
    }

    /// Delete a notification.
    ///
    /// `DELETE profile/notifications/{id}`
    pub async fn delete_notification(&self, notification_id: &str) -> Result<(), Error> {
        let url = self.api_url(&format!("profile/notifications/{notification_id}"))?;
        debug!(notification_id, "deleting notification");
        self.delete(url).await
    }
}
