// ── Location and room domain types ──

use serde::{Deserialize, Serialize};

/// A house or flat registered on the account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: i64,
    pub name: String,
    pub location_type: i64,
    pub role: Option<String>,
    pub timezone: Option<String>,
    pub water_cost: Option<f64>,
    pub energy_cost: Option<f64>,
    pub currency: Option<String>,
    pub heating_type: Option<i64>,
    pub emergency_shutdown_enable: bool,
    pub address: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: Option<String>,
    pub housenumber: Option<String>,
    pub city: Option<String>,
    pub zipcode: Option<String>,
    pub country: Option<String>,
}

impl Address {
    /// Single-line rendering, skipping missing parts.
    pub fn one_line(&self) -> String {
        let street = [self.street.as_deref(), self.housenumber.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        let city = [self.zipcode.as_deref(), self.city.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        [street.as_str(), city.as_str(), self.country.as_deref().unwrap_or_default()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A room inside a location. Room ids are only unique per location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: i64,
    pub location_id: i64,
    pub name: String,
    pub room_type: Option<i64>,
    pub role: Option<String>,
}
