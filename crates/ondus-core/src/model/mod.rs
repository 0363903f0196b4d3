// ── Gateway domain model ──
//
// Canonical representations of the account graph. Built from the raw
// `ondus_api` wire types by `crate::convert`; consumers (the CLI) only
// depend on these.

pub mod actuation;
pub mod appliance;
pub mod location;
pub mod notification;

// ── Re-exports ──────────────────────────────────────────────────────

pub use actuation::{BatchOutcome, SnoozeState, ValveState};
pub use appliance::{
    Appliance, ApplianceKind, ApplianceType, ApplianceVariant, Threshold, ValveGuardState,
};
pub use location::{Address, Location, Room};
pub use notification::{EnrichedNotification, notification_message};
