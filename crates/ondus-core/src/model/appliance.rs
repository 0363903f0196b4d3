// ── Appliance domain types ──

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::location::{Location, Room};

/// Appliance family, decoded from the upstream integer type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum ApplianceType {
    /// Grohe Sense leak and climate sensor.
    #[strum(serialize = "Sense")]
    LeakSensor,
    /// Grohe Sense Guard shutoff valve.
    #[strum(serialize = "Sense Guard")]
    ValveGuard,
    #[strum(serialize = "Unknown")]
    Unknown,
}

impl ApplianceType {
    pub const LEAK_SENSOR_CODE: i64 = 101;
    pub const VALVE_GUARD_CODE: i64 = 103;

    pub fn from_code(code: i64) -> Self {
        match code {
            Self::LEAK_SENSOR_CODE => Self::LeakSensor,
            Self::VALVE_GUARD_CODE => Self::ValveGuard,
            _ => Self::Unknown,
        }
    }
}

/// Filter used by directory lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum ApplianceVariant {
    #[default]
    Any,
    #[strum(to_string = "sense", serialize = "leak-sensor")]
    LeakSensor,
    #[strum(to_string = "sense-guard", serialize = "valve-guard")]
    ValveGuard,
}

impl ApplianceVariant {
    pub fn matches(self, appliance: &Appliance) -> bool {
        match self {
            Self::Any => true,
            Self::LeakSensor => matches!(appliance.kind, ApplianceKind::LeakSensor),
            Self::ValveGuard => matches!(appliance.kind, ApplianceKind::ValveGuard(_)),
        }
    }
}

/// Alerting threshold configured on an appliance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Threshold {
    pub quantity: String,
    pub kind: String,
    pub value: i64,
    pub enabled: bool,
}

/// Snooze bookkeeping carried only by valve guards.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValveGuardState {
    pub snooze_status: Option<String>,
    pub snoozed_from: Option<DateTime<Utc>>,
    /// Set while leak reactions are snoozed.
    pub snoozed_until: Option<DateTime<Utc>>,
    pub pressure_notification: bool,
}

/// Variant-specific payload of an [`Appliance`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApplianceKind {
    LeakSensor,
    ValveGuard(ValveGuardState),
}

/// A hydrated appliance with its status readings and owners.
///
/// `room` and `location` are shared with every other appliance in the
/// same snapshot of the graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appliance {
    pub id: String,
    pub name: String,
    pub type_code: i64,
    /// Last time the upstream heard from the device.
    pub last_seen: Option<DateTime<Utc>>,
    pub serial_number: Option<String>,
    pub version: Option<String>,
    pub installation_date: Option<String>,
    pub registration_complete: bool,
    pub thresholds: Vec<Threshold>,
    /// Decoded status list, e.g. `battery -> 84`, `connection -> 1`.
    pub status: BTreeMap<String, i64>,
    pub room: Arc<Room>,
    pub location: Arc<Location>,
    #[serde(flatten)]
    pub kind: ApplianceKind,
}

impl Appliance {
    pub fn appliance_type(&self) -> ApplianceType {
        match self.kind {
            ApplianceKind::LeakSensor => ApplianceType::LeakSensor,
            ApplianceKind::ValveGuard(_) => ApplianceType::ValveGuard,
        }
    }

    pub fn valve_guard(&self) -> Option<&ValveGuardState> {
        match &self.kind {
            ApplianceKind::ValveGuard(state) => Some(state),
            ApplianceKind::LeakSensor => None,
        }
    }

    pub fn snoozed_until(&self) -> Option<DateTime<Utc>> {
        self.valve_guard().and_then(|g| g.snoozed_until)
    }

    pub fn is_snoozed(&self) -> bool {
        self.snoozed_until().is_some()
    }
}
