// ── Notification directory ──
//
// Pages through the account's notifications, annotates them with names
// from the appliance graph, and caches the result for a long time. The
// notification watcher flushes the cache when something new arrives.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use ondus_api::models::Notification;

use crate::cache::CacheNamespace;
use crate::directory::appliances::{ApplianceMap, LocationMap};
use crate::error::CoreError;
use crate::gateway::Lease;
use crate::model::notification::{UNKNOWN_APPLIANCE, UNKNOWN_LOCATION};
use crate::model::{ApplianceType, EnrichedNotification, notification_message};

const NAMESPACE: &str = "notifications";
const NOTIFICATIONS_KEY: &str = "notifications";

/// The official app asks for 20 first and 10 per page afterwards.
const FIRST_PAGE_SIZE: u32 = 20;
const NEXT_PAGE_SIZE: u32 = 10;

pub type NotificationMap = BTreeMap<String, Arc<EnrichedNotification>>;

#[derive(Clone, Copy)]
pub struct NotificationDirectory<'a> {
    lease: &'a Lease,
}

impl<'a> NotificationDirectory<'a> {
    pub(crate) fn new(lease: &'a Lease) -> Self {
        Self { lease }
    }

    fn cache(&self) -> CacheNamespace<'a> {
        self.lease.cache().namespace(NAMESPACE)
    }

    async fn all(&self) -> Result<Arc<NotificationMap>, CoreError> {
        let lease = self.lease;
        self.cache()
            .get_or_populate(NOTIFICATIONS_KEY, lease.config().notification_ttl, move || async move {
                let directory = lease.appliances();
                let locations = directory.get_locations().await?;
                let appliances = directory.get_appliances().await?;
                let client = lease.upstream().await?;

                let mut notifications = NotificationMap::new();
                let mut page_size = FIRST_PAGE_SIZE;
                let mut token: Option<String> = None;
                loop {
                    let page = client.list_notifications(page_size, token.as_deref()).await?;
                    debug!(
                        page_size,
                        received = page.notifications.len(),
                        remaining = page.remaining_notifications,
                        "notification page fetched"
                    );
                    for notification in page.notifications {
                        let enriched = enrich(notification, &locations, &appliances);
                        notifications.insert(enriched.id.clone(), Arc::new(enriched));
                    }

                    if page.remaining_notifications == 0 {
                        break;
                    }
                    let Some(next) = page.continuation_token else {
                        warn!(
                            remaining = page.remaining_notifications,
                            "upstream reports more notifications but sent no continuation token"
                        );
                        break;
                    };
                    token = Some(next);
                    page_size = NEXT_PAGE_SIZE;
                }

                Ok::<_, CoreError>(notifications)
            })
            .await
    }

    /// Notifications, newest first, optionally for one location.
    pub async fn get_notifications(
        &self,
        location_id: Option<i64>,
    ) -> Result<Vec<Arc<EnrichedNotification>>, CoreError> {
        let all = self.all().await?;
        let mut list: Vec<_> = all
            .values()
            .filter(|n| location_id.is_none_or(|l| n.location_id == l))
            .cloned()
            .collect();
        list.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));
        Ok(list)
    }

    pub async fn find(
        &self,
        notification_id: &str,
    ) -> Result<Option<Arc<EnrichedNotification>>, CoreError> {
        Ok(self.all().await?.get(notification_id).cloned())
    }

    /// Id of the newest notification. Always asks the upstream.
    pub async fn get_latest_notification_id(&self) -> Result<Option<String>, CoreError> {
        let client = self.lease.upstream().await?;
        let page = client.list_notifications(1, None).await?;
        Ok(page.notifications.into_iter().next().map(|n| n.id))
    }

    /// Mark a notification as read. The cache is flushed either way.
    pub async fn mark_as_read(&self, notification: &EnrichedNotification) -> bool {
        let result = async {
            let client = self.lease.upstream().await?;
            client.mark_notification_read(&notification.to_wire()).await?;
            Ok::<_, CoreError>(())
        }
        .await;
        self.flush();

        match result {
            Ok(()) => {
                info!(notification_id = %notification.id, "notification marked as read");
                true
            }
            Err(e) => {
                warn!(notification_id = %notification.id, error = %e, "failed to mark notification as read");
                false
            }
        }
    }

    /// Delete a notification. The cache is flushed either way.
    pub async fn delete(&self, notification_id: &str) -> bool {
        let result = async {
            let client = self.lease.upstream().await?;
            client.delete_notification(notification_id).await?;
            Ok::<_, CoreError>(())
        }
        .await;
        self.flush();

        match result {
            Ok(()) => {
                info!(notification_id, "notification deleted");
                true
            }
            Err(e) => {
                warn!(notification_id, error = %e, "failed to delete notification");
                false
            }
        }
    }

    /// The oldest notification strictly newer than `after`.
    ///
    /// With `delete` the notification is removed upstream; otherwise, with
    /// `mark_as_read`, an unread notification is marked. The returned copy
    /// reflects a successful mutation.
    pub async fn next_after(
        &self,
        after: DateTime<Utc>,
        location_id: Option<i64>,
        mark_as_read: bool,
        delete: bool,
    ) -> Result<Option<EnrichedNotification>, CoreError> {
        let notifications = self.get_notifications(location_id).await?;
        let Some(next) = notifications
            .iter()
            .filter(|n| n.timestamp.is_some_and(|t| t > after))
            .min_by_key(|n| n.timestamp)
        else {
            return Ok(None);
        };

        let mut next = EnrichedNotification::clone(next);
        if delete {
            if self.delete(&next.id).await {
                next.is_read |= mark_as_read;
            }
        } else if mark_as_read && !next.is_read && self.mark_as_read(&next).await {
            next.is_read = true;
        }
        Ok(Some(next))
    }

    pub fn flush(&self) {
        self.cache().flush(&[NOTIFICATIONS_KEY]);
    }
}

fn enrich(
    notification: Notification,
    locations: &LocationMap,
    appliances: &ApplianceMap,
) -> EnrichedNotification {
    let appliance = appliances.get(&notification.appliance_id);
    EnrichedNotification {
        appliance_name: appliance.map_or_else(|| UNKNOWN_APPLIANCE.to_owned(), |a| a.name.clone()),
        appliance_type: appliance.map_or(ApplianceType::Unknown, |a| a.appliance_type()),
        location_name: locations
            .get(&notification.location_id)
            .map_or_else(|| UNKNOWN_LOCATION.to_owned(), |l| l.name.clone()),
        message: notification_message(notification.category, notification.notification_type).to_owned(),
        id: notification.id,
        appliance_id: notification.appliance_id,
        location_id: notification.location_id,
        category: notification.category,
        notification_type: notification.notification_type,
        is_read: notification.is_read,
        timestamp: notification.timestamp,
    }
}
