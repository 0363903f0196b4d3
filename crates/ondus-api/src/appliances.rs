// Appliance endpoints
//
// Appliances are addressed through their owning location and room:
// `locations/{l}/rooms/{r}/appliances/{a}/...`. The room listing returns
// heterogeneous appliance objects, so it is left as raw JSON for the
// caller to branch on the `type` code.

use chrono::NaiveDate;
use tracing::debug;

use crate::client::OndusClient;
use crate::error::Error;
use crate::models::{
    AggregateData, Aggregation, ApplianceStatus, SenseDetails, SenseGuardDetails,
};

impl OndusClient {
    /// List the appliances installed in a room, undecoded.
    ///
    /// `GET locations/{l}/rooms/{r}/appliances`
    pub async fn list_appliances(
        &self,
        location_id: i64,
        room_id: i64,
    ) -> Result<Vec<serde_json::Value>, Error> {
        let url = self.api_url(&format!("locations/{location_id}/rooms/{room_id}/appliances"))?;
        debug!(location_id, room_id, "listing appliances");
        self.get(url).await
    }

    /// Current status readings (battery, wifi quality, connection, ...).
    ///
    /// `GET .../appliances/{a}/status`
    pub async fn appliance_status(
        &self,
        location_id: i64,
        room_id: i64,
        appliance_id: &str,
    ) -> Result<Vec<ApplianceStatus>, Error> {
        let url = self.appliance_url(location_id, room_id, appliance_id, "status")?;
        debug!(appliance_id, "fetching appliance status");
        self.get(url).await
    }

    /// Sense details with the latest measurement.
    ///
    /// `GET .../appliances/{a}/details`
    pub async fn sense_details(
        &self,
        location_id: i64,
        room_id: i64,
        appliance_id: &str,
    ) -> Result<SenseDetails, Error> {
        let url = self.appliance_url(location_id, room_id, appliance_id, "details")?;
        debug!(appliance_id, "fetching sense details");
        self.get(url).await
    }

    /// Sense Guard details with consumption and latest measurement.
    ///
    /// `GET .../appliances/{a}/details`
    pub async fn sense_guard_details(
        &self,
        location_id: i64,
        room_id: i64,
        appliance_id: &str,
    ) -> Result<SenseGuardDetails, Error> {
        let url = self.appliance_url(location_id, room_id, appliance_id, "details")?;
        debug!(appliance_id, "fetching sense guard details");
        self.get(url).await
    }

    /// Aggregated history between two dates (inclusive).
    ///
    /// `GET .../appliances/{a}/data/aggregated?groupBy=&from=&to=`
    pub async fn aggregated_data(
        &self,
        location_id: i64,
        room_id: i64,
        appliance_id: &str,
        group_by: Aggregation,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<AggregateData, Error> {
        let mut url = self.appliance_url(location_id, room_id, appliance_id, "data/aggregated")?;
        url.query_pairs_mut()
            .append_pair("groupBy", group_by.as_str())
            .append_pair("from", &from.format("%Y-%m-%d").to_string())
            .append_pair("to", &to.format("%Y-%m-%d").to_string());
        debug!(appliance_id, group_by = group_by.as_str(), %from, %to, "fetching aggregated data");
        self.get(url).await
    }
}
