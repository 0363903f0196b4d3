//! Location command handler.

use std::sync::Arc;

use tabled::Tabled;

use ondus_core::{Address, Gateway, Location};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct LocationRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Timezone")]
    timezone: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Emergency shutdown")]
    shutdown: String,
}

impl From<&Arc<Location>> for LocationRow {
    fn from(l: &Arc<Location>) -> Self {
        Self {
            id: l.id,
            name: l.name.clone(),
            timezone: output::or_dash(l.timezone.as_deref()),
            address: l.address.as_ref().map(Address::one_line).unwrap_or_default(),
            shutdown: output::flag(l.emergency_shutdown_enable, true),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(gateway: &Gateway, global: &GlobalOpts) -> Result<(), CliError> {
    let lease = gateway.lease().await?;
    let locations = lease.appliances().get_locations().await?;
    let list: Vec<Arc<Location>> = locations.values().cloned().collect();

    let out = output::render_list(
        global.format(),
        &list,
        |l| LocationRow::from(l),
        |l| l.id.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
