// Sense Guard command endpoints
//
// Valve state lives in the appliance's command document; snoozing has
// its own resource. None of these calls wait for the device to act.

use tracing::debug;

use crate::client::OndusClient;
use crate::error::Error;
use crate::models::{CommandDocument, SnoozeCommand};

impl OndusClient {
    /// Read the live command document.
    ///
    /// `GET .../appliances/{a}/command`
    pub async fn get_command(
        &self,
        location_id: i64,
        room_id: i64,
        appliance_id: &str,
    ) -> Result<CommandDocument, Error> {
        let url = self.appliance_url(location_id, room_id, appliance_id, "command")?;
        debug!(appliance_id, "fetching command document");
        self.get(url).await
    }

    /// Submit a command document. The echoed `commandb64` / `timestamp`
    /// fields are cleared before sending.
    ///
    /// `POST .../appliances/{a}/command`
    pub async fn send_command(
        &self,
        location_id: i64,
        room_id: i64,
        appliance_id: &str,
        document: &CommandDocument,
    ) -> Result<(), Error> {
        let url = self.appliance_url(location_id, room_id, appliance_id, "command")?;
        debug!(appliance_id, valve_open = document.command.valve_open, "sending command");
        self.post(url, &document.for_submission()).await
    }

    /// Snooze leak reactions for `minutes`.
    ///
    /// `PUT .../appliances/{a}/snooze`
    pub async fn snooze(
        &self,
        location_id: i64,
        room_id: i64,
        appliance_id: &str,
        minutes: u32,
    ) -> Result<(), Error> {
        let url = self.appliance_url(location_id, room_id, appliance_id, "snooze")?;
        debug!(appliance_id, minutes, "snoozing appliance");
        self.put(url, &SnoozeCommand { snooze_duration: minutes }).await
    }

    /// Cancel a snooze.
    ///
    /// `DELETE .../appliances/{a}/snooze`
    pub async fn wake(&self, location_id: i64, room_id: i64, appliance_id: &str) -> Result<(), Error> {
        let url = self.appliance_url(location_id, room_id, appliance_id, "snooze")?;
        debug!(appliance_id, "waking appliance");
        self.delete(url).await
    }
}
