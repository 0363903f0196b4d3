// ── API-to-domain type conversions ──
//
// Bridges raw `ondus_api` response types into canonical
// `ondus_core::model` domain types. Appliances arrive as untyped JSON;
// `decode_appliance` branches once on the `type` code.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use ondus_api::models::{self as wire, ApplianceStatus, SenseAppliance, SenseGuardAppliance};

use crate::model::{
    Address, Appliance, ApplianceKind, ApplianceType, Location, Room, Threshold, ValveGuardState,
};

// ── Locations & rooms ──────────────────────────────────────────────

impl From<wire::Address> for Address {
    fn from(a: wire::Address) -> Self {
        Self {
            street: a.street,
            housenumber: a.housenumber,
            city: a.city,
            zipcode: a.zipcode,
            country: a.country,
        }
    }
}

impl From<wire::Location> for Location {
    fn from(l: wire::Location) -> Self {
        Self {
            id: l.id,
            name: l.name,
            location_type: l.location_type,
            role: l.role,
            timezone: l.timezone,
            water_cost: l.water_cost,
            energy_cost: l.energy_cost,
            currency: l.currency,
            heating_type: l.heating_type,
            emergency_shutdown_enable: l.emergency_shutdown_enable,
            address: l.address.map(Address::from),
        }
    }
}

/// Rooms carry no back-reference upstream; attach the owning location.
pub(crate) fn room_from_wire(room: wire::Room, location_id: i64) -> Room {
    Room {
        id: room.id,
        location_id,
        name: room.name,
        room_type: room.room_type,
        role: room.role,
    }
}

impl From<wire::Threshold> for Threshold {
    fn from(t: wire::Threshold) -> Self {
        Self {
            quantity: t.quantity,
            kind: t.kind,
            value: t.value,
            enabled: t.enabled,
        }
    }
}

pub(crate) fn status_map(status: Vec<ApplianceStatus>) -> BTreeMap<String, i64> {
    status.into_iter().map(|s| (s.kind, s.value)).collect()
}

// ── Appliances ─────────────────────────────────────────────────────

/// An appliance listing entry after the single branch on its type code.
#[derive(Debug)]
pub(crate) enum DecodedAppliance {
    LeakSensor(SenseAppliance),
    ValveGuard(SenseGuardAppliance),
    Unknown { code: i64, id: Option<String> },
}

impl DecodedAppliance {
    pub(crate) fn id(&self) -> Option<&str> {
        match self {
            Self::LeakSensor(a) => Some(&a.appliance_id),
            Self::ValveGuard(a) => Some(&a.appliance_id),
            Self::Unknown { id, .. } => id.as_deref(),
        }
    }
}

pub(crate) fn decode_appliance(raw: &Value) -> Result<DecodedAppliance, serde_json::Error> {
    let code = raw.get("type").and_then(Value::as_i64).unwrap_or_default();
    match ApplianceType::from_code(code) {
        ApplianceType::LeakSensor => {
            SenseAppliance::deserialize(raw).map(DecodedAppliance::LeakSensor)
        }
        ApplianceType::ValveGuard => {
            SenseGuardAppliance::deserialize(raw).map(DecodedAppliance::ValveGuard)
        }
        ApplianceType::Unknown => Ok(DecodedAppliance::Unknown {
            code,
            id: raw
                .get("appliance_id")
                .and_then(Value::as_str)
                .map(str::to_owned),
        }),
    }
}

/// Attach owners and status to a decoded appliance. `None` for unknown codes.
pub(crate) fn hydrate(
    decoded: DecodedAppliance,
    status: BTreeMap<String, i64>,
    room: &Arc<Room>,
    location: &Arc<Location>,
) -> Option<Appliance> {
    let appliance = match decoded {
        DecodedAppliance::LeakSensor(a) => Appliance {
            id: a.appliance_id,
            name: a.name,
            type_code: a.type_code,
            last_seen: a.tdt,
            serial_number: a.serial_number,
            version: a.version,
            installation_date: a.installation_date,
            registration_complete: a.registration_complete,
            thresholds: a.config.thresholds.into_iter().map(Threshold::from).collect(),
            status,
            room: Arc::clone(room),
            location: Arc::clone(location),
            kind: ApplianceKind::LeakSensor,
        },
        DecodedAppliance::ValveGuard(a) => Appliance {
            id: a.appliance_id,
            name: a.name,
            type_code: a.type_code,
            last_seen: a.tdt,
            serial_number: a.serial_number,
            version: a.version,
            installation_date: a.installation_date,
            registration_complete: a.registration_complete,
            thresholds: a.config.thresholds.into_iter().map(Threshold::from).collect(),
            status,
            room: Arc::clone(room),
            location: Arc::clone(location),
            kind: ApplianceKind::ValveGuard(ValveGuardState {
                snooze_status: a.snooze_status,
                snoozed_from: a.snoozed_from,
                snoozed_until: a.snoozed_until,
                pressure_notification: a.pressure_notification,
            }),
        },
        DecodedAppliance::Unknown { .. } => return None,
    };
    Some(appliance)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_by_type_code() {
        let guard = decode_appliance(&json!({
            "appliance_id": "g-1",
            "name": "Main valve",
            "type": 103,
            "snoozed_until": "2024-05-01T10:00:00Z",
        }))
        .unwrap();
        let DecodedAppliance::ValveGuard(guard) = guard else {
            panic!("expected a valve guard");
        };
        assert!(guard.snoozed_until.is_some());

        let sensor = decode_appliance(&json!({"appliance_id": "s-1", "type": 101})).unwrap();
        assert!(matches!(sensor, DecodedAppliance::LeakSensor(_)));
    }

    #[test]
    fn unknown_codes_keep_their_id() {
        let blue = decode_appliance(&json!({"appliance_id": "b-1", "type": 104})).unwrap();
        assert!(matches!(blue, DecodedAppliance::Unknown { code: 104, .. }));
        assert_eq!(blue.id(), Some("b-1"));
    }

    #[test]
    fn hydrate_skips_unknown() {
        let location = Arc::new(Location::from(
            serde_json::from_value::<wire::Location>(json!({"id": 1, "name": "Home"})).unwrap(),
        ));
        let room = Arc::new(room_from_wire(
            serde_json::from_value(json!({"id": 2, "name": "Cellar"})).unwrap(),
            1,
        ));
        let unknown = DecodedAppliance::Unknown { code: 7, id: None };
        assert!(hydrate(unknown, BTreeMap::new(), &room, &location).is_none());

        let sensor = decode_appliance(&json!({"appliance_id": "s-1", "type": 101})).unwrap();
        let status = status_map(vec![ApplianceStatus {
            kind: "battery".into(),
            value: 84,
        }]);
        let sensor = hydrate(sensor, status, &room, &location).unwrap();
        assert_eq!(sensor.status["battery"], 84);
        assert_eq!(sensor.room.location_id, 1);
    }
}
