// ── Notification domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::appliance::ApplianceType;

pub const UNKNOWN_APPLIANCE: &str = "Unknown Appliance";
pub const UNKNOWN_LOCATION: &str = "Unknown Location";
pub const UNKNOWN_NOTIFICATION: &str = "Unknown notification";

/// An upstream notification annotated with names from the account graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedNotification {
    pub id: String,
    pub appliance_id: String,
    pub appliance_name: String,
    pub appliance_type: ApplianceType,
    pub location_id: i64,
    pub location_name: String,
    pub category: i64,
    pub notification_type: i64,
    pub is_read: bool,
    pub timestamp: Option<DateTime<Utc>>,
    pub message: String,
}

impl EnrichedNotification {
    /// Strip the annotations again, for mutations that echo the notification.
    pub fn to_wire(&self) -> ondus_api::models::Notification {
        ondus_api::models::Notification {
            id: self.id.clone(),
            appliance_id: self.appliance_id.clone(),
            location_id: self.location_id,
            category: self.category,
            is_read: self.is_read,
            timestamp: self.timestamp,
            notification_type: self.notification_type,
        }
    }
}

/// Human-readable text for a (category, type) pair as shown by the app.
pub fn notification_message(category: i64, notification_type: i64) -> &'static str {
    match (category, notification_type) {
        // Informational
        (10, 10) => "Installation successful",
        (10, 60) => "Firmware update available",
        (10, 410) => "Installation of Sense Guard successful",
        (10, 460) => "Firmware update of Sense Guard available",
        (10, 555) => "Sense Guard firmware updated",
        (10, 557) => "Sense firmware updated",

        // Warnings
        (20, 11) => "Battery low",
        (20, 12) => "Battery empty",
        (20, 20) => "Temperature below threshold",
        (20, 21) => "Temperature above threshold",
        (20, 30) => "Humidity below threshold",
        (20, 31) => "Humidity above threshold",
        (20, 40) => "Frost warning",
        (20, 80) => "Lost WiFi connection",
        (20, 320) => "Unusual water consumption detected",
        (20, 321) => "Unusual water consumption detected, water still on",
        (20, 330) => "Micro leakage detected",
        (20, 332) => "Micro leakage detected over several days",
        (20, 340) => "Multiple water consumption events detected",
        (20, 380) => "Pressure measurement skipped",
        (20, 381) => "Pressure measurement failed",

        // Alarms
        (30, 0) => "Flooding detected",
        (30, 50) => "Water detected",
        (30, 90) => "System error 90",
        (30, 100) => "System error 100",
        (30, 101) => "System error 101",
        (30, 102) => "System error 102",
        (30, 103) => "System error 103",
        (30, 104) => "System error 104",
        (30, 105) => "System error 105",
        (30, 106) => "System error 106",
        (30, 107) => "System error 107",
        (30, 309) => "Water leak detected, valve closed",
        (30, 310) => "Extremely high flow",
        (30, 390) => "System error 390",
        (30, 400) => "Maximum water volume reached",
        (30, 430) => "Water detected by Sense, water still on",
        (30, 431) => "Water detected by Sense, valve closed",

        _ => UNKNOWN_NOTIFICATION,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_and_unknown_messages() {
        assert_eq!(notification_message(30, 0), "Flooding detected");
        assert_eq!(notification_message(20, 11), "Battery low");
        assert_eq!(notification_message(99, 1), UNKNOWN_NOTIFICATION);
    }
}
