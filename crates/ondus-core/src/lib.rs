// ondus-core: Serialized, cached gateway over the Grohe Ondus API

pub mod actuation;
pub mod cache;
pub mod config;
mod convert;
pub mod directory;
pub mod error;
pub mod gateway;
pub mod model;
pub mod serializer;
pub mod session;
pub mod watcher;

// ── Primary re-exports ──────────────────────────────────────────────
pub use actuation::{ActuationController, ConvergencePoll};
pub use cache::{CacheNamespace, ReadThroughCache, cache_key};
pub use config::{Credentials, GatewayConfig};
pub use directory::{ApplianceDirectory, NotificationDirectory};
pub use error::CoreError;
pub use gateway::{Gateway, Lease};
pub use serializer::{RequestSerializer, Ticket};
pub use session::AuthSession;
pub use watcher::{poll_once, spawn_notification_watcher};

// Upstream payloads passed through unchanged.
pub use ondus_api::DEFAULT_BASE_URL;
pub use ondus_api::models::{AggregateData, Aggregation, SenseDetails, SenseGuardDetails};

// Model re-exports
pub use model::{
    Address, Appliance, ApplianceKind, ApplianceType, ApplianceVariant, BatchOutcome, EnrichedNotification,
    Location, Room, SnoozeState, ValveState,
};
