// ── Actuation views ──
//
// Read-side projections of valve guards for consumers that report on
// snooze and valve state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::appliance::Appliance;

/// Snooze state of one valve guard at a given instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnoozeState {
    pub appliance_id: String,
    pub appliance_name: String,
    pub snoozing: bool,
    pub snoozed_until: Option<DateTime<Utc>>,
    /// Seconds until the snooze lapses; 0 when not snoozing.
    pub remaining_secs: i64,
}

impl SnoozeState {
    /// Project `appliance` at `now`. `None` for appliances that cannot snooze.
    pub fn at(appliance: &Appliance, now: DateTime<Utc>) -> Option<Self> {
        let guard = appliance.valve_guard()?;
        let remaining_secs = guard
            .snoozed_until
            .map_or(0, |until| (until - now).num_seconds().max(0));
        Some(Self {
            appliance_id: appliance.id.clone(),
            appliance_name: appliance.name.clone(),
            snoozing: remaining_secs > 0,
            snoozed_until: guard.snoozed_until,
            remaining_secs,
        })
    }
}

/// Whether a valve guard's valve is open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValveState {
    pub appliance_id: String,
    pub appliance_name: String,
    pub open: bool,
}

/// Result of applying one change across several valve guards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome<T> {
    /// State of every targeted appliance after the change.
    pub states: Vec<T>,
    /// At least one appliance failed to converge.
    pub partial_failure: bool,
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;
    use crate::model::appliance::tests::fixture;
    use crate::model::appliance::{ApplianceKind, ValveGuardState};

    #[test]
    fn snooze_projection() {
        let now = Utc::now();
        let guard = fixture(
            "g",
            ApplianceKind::ValveGuard(ValveGuardState {
                snoozed_until: Some(now + TimeDelta::seconds(90)),
                ..ValveGuardState::default()
            }),
        );

        let state = SnoozeState::at(&guard, now).unwrap_or_else(|| unreachable!());
        assert!(state.snoozing);
        assert_eq!(state.remaining_secs, 90);

        let later = SnoozeState::at(&guard, now + TimeDelta::seconds(120));
        assert!(later.is_some_and(|s| !s.snoozing && s.remaining_secs == 0));
    }

    #[test]
    fn sensors_have_no_snooze_state() {
        let sensor = fixture("s", ApplianceKind::LeakSensor);
        assert!(SnoozeState::at(&sensor, Utc::now()).is_none());
    }
}
