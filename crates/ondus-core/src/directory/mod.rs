// ── Read-through directories ──
//
// Cached views of the upstream account, borrowed from a `Lease`.

pub mod appliances;
pub mod notifications;

pub use appliances::{ApplianceDirectory, ApplianceMap, LocationMap};
pub use notifications::{NotificationDirectory, NotificationMap};
