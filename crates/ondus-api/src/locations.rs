// Location and room endpoints
//
// The top two levels of the account hierarchy. Rooms are scoped to a
// location; appliances hang off rooms (see `appliances.rs`).

use tracing::debug;

use crate::client::OndusClient;
use crate::error::Error;
use crate::models::{Location, Room};

impl OndusClient {
    /// List every location on the account.
    ///
    /// `GET locations`
    pub async fn list_locations(&self) -> Result<Vec<Location>, Error> {
        let url = self.api_url("locations")?;
        debug!("listing locations");
        self.get(url).await
    }

    /// List the rooms of a location.
    ///
    /// `GET locations/{location_id}/rooms`
    pub async fn list_rooms(&self, location_id: i64) -> Result<Vec<Room>, Error> {
        let url = self.api_url(&format!("locations/{location_id}/rooms"))?;
        debug!(location_id, "listing rooms");
        self.get(url).await
    }
}
