// Ondus API wire types
//
// Models for the Grohe Ondus JSON API. Fields use `#[serde(default)]`
// liberally because the API omits fields depending on appliance firmware
// and account state. Large objects model what the gateway reads and
// keep everything else in `extra`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Authentication ───────────────────────────────────────────────────

/// Token payload returned by the login redirect target and `oidc/token`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub refresh_token: String,
    #[serde(default)]
    pub refresh_expires_in: Option<i64>,
}

// ── Locations & rooms ────────────────────────────────────────────────

/// A location (house / flat) from `GET locations`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub location_type: i64,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub water_cost: Option<f64>,
    #[serde(default)]
    pub energy_cost: Option<f64>,
    #[serde(default)]
    pub heating_type: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub default_water_cost: Option<f64>,
    #[serde(default)]
    pub default_energy_cost: Option<f64>,
    #[serde(default)]
    pub default_heating_type: Option<i64>,
    #[serde(default)]
    pub emergency_shutdown_enable: bool,
    #[serde(default)]
    pub address: Option<Address>,
}

/// Postal address nested inside [`Location`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub housenumber: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub zipcode: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default, rename = "additionalInfo")]
    pub additional_info: Option<String>,
}

/// A room from `GET locations/{id}/rooms`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: i64,
    #[serde(default)]
    pub room_type: Option<i64>,
    #[serde(default)]
    pub role: Option<String>,
}

// ── Appliances ───────────────────────────────────────────────────────

/// One entry of `GET .../appliances/{id}/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplianceStatus {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub value: i64,
}

/// Alert threshold configured on an appliance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Threshold {
    #[serde(default)]
    pub quantity: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub value: i64,
    #[serde(default)]
    pub enabled: bool,
}

/// Appliance configuration block. Sense Guard valves carry dozens of
/// leakage-monitoring knobs; only the thresholds are modelled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplianceConfig {
    #[serde(default)]
    pub thresholds: Vec<Threshold>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Sense (leak / humidity sensor, type code 101) as listed under a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenseAppliance {
    pub appliance_id: String,
    #[serde(default)]
    pub name: String,
    /// Last time the appliance reported in.
    #[serde(default)]
    pub tdt: Option<DateTime<Utc>>,
    #[serde(default, rename = "type")]
    pub type_code: i64,
    #[serde(default)]
    pub installation_date: Option<String>,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub timezone: Option<i64>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub registration_complete: bool,
    #[serde(default)]
    pub config: ApplianceConfig,
}

/// Sense Guard (shutoff valve, type code 103) as listed under a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenseGuardAppliance {
    pub appliance_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tdt: Option<DateTime<Utc>>,
    #[serde(default, rename = "type")]
    pub type_code: i64,
    #[serde(default)]
    pub installation_date: Option<String>,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub timezone: Option<i64>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub registration_complete: bool,
    #[serde(default)]
    pub config: ApplianceConfig,
    #[serde(default)]
    pub calculate_average_since: Option<String>,
    #[serde(default)]
    pub pressure_notification: bool,
    #[serde(default)]
    pub snooze_status: Option<String>,
    #[serde(default)]
    pub snoozed_from: Option<DateTime<Utc>>,
    /// Set while the valve's leak reactions are snoozed.
    #[serde(default)]
    pub snoozed_until: Option<DateTime<Utc>>,
}

// ── Appliance details ────────────────────────────────────────────────

/// `GET .../appliances/{id}/details` for a Sense.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenseDetails {
    pub appliance_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub type_code: i64,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub tdt: Option<DateTime<Utc>>,
    #[serde(default)]
    pub snooze_status: Option<String>,
    #[serde(default)]
    pub status: Vec<ApplianceStatus>,
    #[serde(default)]
    pub data_latest: Option<SenseDataLatest>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenseDataLatest {
    #[serde(default)]
    pub measurement: Option<SenseMeasurement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenseMeasurement {
    #[serde(default)]
    pub battery: Option<i64>,
    #[serde(default)]
    pub humidity: Option<i64>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// `GET .../appliances/{id}/details` for a Sense Guard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenseGuardDetails {
    pub appliance_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub type_code: i64,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub tdt: Option<DateTime<Utc>>,
    #[serde(default)]
    pub snooze_status: Option<String>,
    #[serde(default)]
    pub pressure_notification: bool,
    #[serde(default)]
    pub status: Vec<ApplianceStatus>,
    #[serde(default)]
    pub installer: Option<Installer>,
    #[serde(default)]
    pub data_latest: Option<SenseGuardDataLatest>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Installer {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenseGuardDataLatest {
    #[serde(default)]
    pub measurement: Option<SenseGuardMeasurement>,
    #[serde(default)]
    pub average_monthly_consumption: Option<f64>,
    #[serde(default)]
    pub average_daily_consumption: Option<f64>,
    #[serde(default)]
    pub daily_consumption: Option<f64>,
    #[serde(default)]
    pub daily_cost: Option<f64>,
    #[serde(default)]
    pub withdrawals: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenseGuardMeasurement {
    #[serde(default)]
    pub flowrate: Option<f64>,
    #[serde(default)]
    pub pressure: Option<f64>,
    #[serde(default)]
    pub temperature_guard: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

// ── Aggregated data ──────────────────────────────────────────────────

/// `groupBy` bucket size for aggregated history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl Aggregation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }
}

/// `GET .../appliances/{id}/data/aggregated`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateData {
    pub appliance_id: String,
    #[serde(default, rename = "type")]
    pub type_code: i64,
    #[serde(default)]
    pub data: AggregatePayload,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregatePayload {
    #[serde(default)]
    pub group_by: Option<String>,
    #[serde(default, rename = "measurement")]
    pub measurements: Vec<AggregateMeasurement>,
    #[serde(default)]
    pub withdrawals: Vec<AggregateWithdrawal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateMeasurement {
    pub date: String,
    #[serde(default)]
    pub flowrate: Option<f64>,
    #[serde(default)]
    pub pressure: Option<f64>,
    #[serde(default)]
    pub temperature_guard: Option<f64>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub humidity: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateWithdrawal {
    pub date: String,
    #[serde(default)]
    pub waterconsumption: Option<f64>,
    #[serde(default)]
    pub hotwater_share: Option<f64>,
    #[serde(default)]
    pub water_cost: Option<f64>,
    #[serde(default)]
    pub energy_cost: Option<f64>,
}

// ── Commands ─────────────────────────────────────────────────────────

/// Live command document from `GET .../appliances/{id}/command`.
///
/// `commandb64` and `timestamp` are echoed by the server but rejected on
/// write; [`CommandDocument::for_submission`] clears them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandDocument {
    pub appliance_id: String,
    #[serde(default, rename = "type")]
    pub type_code: i64,
    pub command: CommandBody,
    #[serde(default)]
    pub commandb64: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl CommandDocument {
    /// Copy of this document with the read-only echoed fields cleared.
    pub fn for_submission(&self) -> Self {
        Self {
            commandb64: None,
            timestamp: None,
            ..self.clone()
        }
    }
}

/// Mutable command state of a Sense Guard.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandBody {
    #[serde(default)]
    pub valve_open: bool,
    #[serde(default)]
    pub buzzer_on: bool,
    #[serde(default)]
    pub buzzer_sound_profile: i64,
    #[serde(default)]
    pub measure_now: bool,
    #[serde(default)]
    pub pressure_measurement_running: bool,
    #[serde(default)]
    pub temp_user_unlock_on: bool,
    #[serde(default)]
    pub reason_for_change: i64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Body of `PUT .../appliances/{id}/snooze`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SnoozeCommand {
    pub snooze_duration: u32,
}

// ── Notifications ────────────────────────────────────────────────────

/// One page of `GET profile/notifications`.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationPage {
    #[serde(default)]
    pub continuation_token: Option<String>,
    #[serde(default)]
    pub remaining_notifications: i64,
    #[serde(default)]
    pub notifications: Vec<Notification>,
}

/// A notification as the upstream reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "notification_id")]
    pub id: String,
    #[serde(default)]
    pub appliance_id: String,
    #[serde(default)]
    pub location_id: i64,
    #[serde(default)]
    pub category: i64,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, rename = "notification_type")]
    pub notification_type: i64,
}

/// Body of `PUT profile/notifications/{id}`, mirroring what the app sends.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationReadCommand {
    #[serde(rename = "_id")]
    pub internal_id: i64,
    pub appliance_id: String,
    pub category: i64,
    #[serde(rename = "eventReactionId")]
    pub event_reaction_id: i64,
    pub id: String,
    pub is_read: bool,
    pub location_id: i64,
    #[serde(rename = "rawCategory")]
    pub raw_category: i64,
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(rename = "type")]
    pub notification_type: i64,
}

impl From<&Notification> for NotificationReadCommand {
    fn from(n: &Notification) -> Self {
        Self {
            internal_id: 0,
            appliance_id: n.appliance_id.clone(),
            category: n.category,
            event_reaction_id: 0,
            id: n.id.clone(),
            is_read: true,
            location_id: 0,
            raw_category: 0,
            timestamp: n.timestamp,
            notification_type: n.notification_type,
        }
    }
}
