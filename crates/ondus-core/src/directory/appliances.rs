// ── Appliance directory ──
//
// Assembles the location -> room -> appliance -> status graph. The graph
// is rebuilt in full on every cache miss and never patched in place.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, warn};

use ondus_api::models::{AggregateData, Aggregation, SenseDetails, SenseGuardDetails};

use crate::cache::{CacheNamespace, cache_key};
use crate::convert::{DecodedAppliance, decode_appliance, hydrate, room_from_wire, status_map};
use crate::error::CoreError;
use crate::gateway::Lease;
use crate::model::{Appliance, ApplianceVariant, Location};

const NAMESPACE: &str = "appliances";
const LOCATIONS_KEY: &str = "locations";
const APPLIANCES_KEY: &str = "appliances";

pub type LocationMap = BTreeMap<i64, Arc<Location>>;
pub type ApplianceMap = BTreeMap<String, Arc<Appliance>>;

/// Read access to the account's locations and appliances.
#[derive(Clone, Copy)]
pub struct ApplianceDirectory<'a> {
    lease: &'a Lease,
}

impl<'a> ApplianceDirectory<'a> {
    pub(crate) fn new(lease: &'a Lease) -> Self {
        Self { lease }
    }

    fn cache(&self) -> CacheNamespace<'a> {
        self.lease.cache().namespace(NAMESPACE)
    }

    /// All locations on the account, by id.
    pub async fn get_locations(&self) -> Result<Arc<LocationMap>, CoreError> {
        let lease = self.lease;
        self.cache()
            .get_or_populate(LOCATIONS_KEY, lease.config().cache_ttl, move || async move {
                let client = lease.upstream().await?;
                let locations = client.list_locations().await?;
                debug!(count = locations.len(), "locations fetched");
                Ok::<_, CoreError>(
                    locations
                        .into_iter()
                        .map(|l| (l.id, Arc::new(Location::from(l))))
                        .collect::<LocationMap>(),
                )
            })
            .await
    }

    /// Every recognised appliance on the account, by id, with status.
    pub async fn get_appliances(&self) -> Result<Arc<ApplianceMap>, CoreError> {
        let lease = self.lease;
        self.cache()
            .get_or_populate(APPLIANCES_KEY, lease.config().cache_ttl, move || async move {
                let locations = ApplianceDirectory::new(lease).get_locations().await?;
                let client = lease.upstream().await?;
                let mut appliances = ApplianceMap::new();

                for location in locations.values() {
                    for room in client.list_rooms(location.id).await? {
                        let room = Arc::new(room_from_wire(room, location.id));
                        for raw in client.list_appliances(location.id, room.id).await? {
                            let decoded = match decode_appliance(&raw) {
                                Ok(DecodedAppliance::Unknown { code, id }) => {
                                    warn!(type_code = code, appliance_id = ?id, raw = %raw, "skipping appliance of unknown type");
                                    continue;
                                }
                                Ok(decoded) => decoded,
                                Err(e) => {
                                    warn!(error = %e, raw = %raw, "skipping undecodable appliance");
                                    continue;
                                }
                            };
                            let Some(id) = decoded.id().map(str::to_owned) else {
                                continue;
                            };
                            let status = client.appliance_status(location.id, room.id, &id).await?;
                            if let Some(appliance) = hydrate(decoded, status_map(status), &room, location) {
                                appliances.insert(id, Arc::new(appliance));
                            }
                        }
                    }
                }

                debug!(count = appliances.len(), "appliance graph assembled");
                Ok::<_, CoreError>(appliances)
            })
            .await
    }

    /// Appliances of `variant`, optionally narrowed to one location and/or id.
    pub async fn get_appliances_of(
        &self,
        variant: ApplianceVariant,
        location_id: Option<i64>,
        appliance_id: Option<&str>,
    ) -> Result<Vec<Arc<Appliance>>, CoreError> {
        let appliances = self.get_appliances().await?;
        Ok(appliances
            .values()
            .filter(|a| variant.matches(a))
            .filter(|a| location_id.is_none_or(|l| a.location.id == l))
            .filter(|a| appliance_id.is_none_or(|id| a.id == id))
            .cloned()
            .collect())
    }

    pub async fn find(&self, appliance_id: &str) -> Result<Option<Arc<Appliance>>, CoreError> {
        Ok(self.get_appliances().await?.get(appliance_id).cloned())
    }

    /// Look up an appliance, requiring it to be of `variant`.
    pub async fn find_of(
        &self,
        variant: ApplianceVariant,
        appliance_id: &str,
    ) -> Result<Option<Arc<Appliance>>, CoreError> {
        Ok(self
            .find(appliance_id)
            .await?
            .filter(|a| variant.matches(a)))
    }

    /// Latest measurement of a Sense. `None` unless `appliance_id` is one.
    pub async fn get_sense_details(
        &self,
        appliance_id: &str,
    ) -> Result<Option<Arc<SenseDetails>>, CoreError> {
        let Some(appliance) = self.find_of(ApplianceVariant::LeakSensor, appliance_id).await? else {
            return Ok(None);
        };
        let lease = self.lease;
        let key = cache_key("sense_details", &appliance_id);
        let details = self
            .cache()
            .get_or_populate(&key, lease.config().cache_ttl, move || async move {
                let client = lease.upstream().await?;
                Ok::<_, CoreError>(
                    client
                        .sense_details(appliance.location.id, appliance.room.id, &appliance.id)
                        .await?,
                )
            })
            .await?;
        Ok(Some(details))
    }

    /// Consumption and latest measurement of a Sense Guard. `None` unless
    /// `appliance_id` is one.
    pub async fn get_sense_guard_details(
        &self,
        appliance_id: &str,
    ) -> Result<Option<Arc<SenseGuardDetails>>, CoreError> {
        let Some(appliance) = self.find_of(ApplianceVariant::ValveGuard, appliance_id).await? else {
            return Ok(None);
        };
        let lease = self.lease;
        let key = cache_key("sense_guard_details", &appliance_id);
        let details = self
            .cache()
            .get_or_populate(&key, lease.config().cache_ttl, move || async move {
                let client = lease.upstream().await?;
                Ok::<_, CoreError>(
                    client
                        .sense_guard_details(appliance.location.id, appliance.room.id, &appliance.id)
                        .await?,
                )
            })
            .await?;
        Ok(Some(details))
    }

    /// Aggregated history for any recognised appliance.
    pub async fn get_aggregated_data(
        &self,
        appliance_id: &str,
        group_by: Aggregation,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Option<Arc<AggregateData>>, CoreError> {
        let Some(appliance) = self.find(appliance_id).await? else {
            return Ok(None);
        };
        let lease = self.lease;
        let key = cache_key("aggregated_data", &(appliance_id, group_by, from, to));
        let data = self
            .cache()
            .get_or_populate(&key, lease.config().cache_ttl, move || async move {
                let client = lease.upstream().await?;
                Ok::<_, CoreError>(
                    client
                        .aggregated_data(
                            appliance.location.id,
                            appliance.room.id,
                            &appliance.id,
                            group_by,
                            from,
                            to,
                        )
                        .await?,
                )
            })
            .await?;
        Ok(Some(data))
    }

    /// Drop the cached locations and appliance graph.
    pub fn flush(&self) {
        self.cache().flush(&[LOCATIONS_KEY, APPLIANCES_KEY]);
    }
}
