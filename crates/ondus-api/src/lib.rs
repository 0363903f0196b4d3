// ondus-api: Async Rust client for the Grohe Ondus cloud API

pub mod appliances;
pub mod auth;
pub mod client;
pub mod commands;
pub mod error;
pub mod locations;
pub mod models;
pub mod notifications;
pub mod transport;

pub use auth::AuthTokens;
pub use client::{DEFAULT_BASE_URL, OndusClient};
pub use error::Error;
pub use transport::TransportConfig;
