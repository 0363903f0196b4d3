//! Appliance command handlers: listing, details, usage history.

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{Days, Local};
use tabled::Tabled;

use ondus_core::{
    AggregateData, Appliance, ApplianceType, Gateway, SenseDetails, SenseGuardDetails,
};

use crate::cli::{AppliancesArgs, GlobalOpts, UsageArgs};
use crate::error::CliError;
use crate::output;

use super::util;

const DEFAULT_USAGE_DAYS: u64 = 7;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct ApplianceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Room")]
    room: String,
    #[tabled(rename = "Last seen")]
    last_seen: String,
    #[tabled(rename = "Snoozed until")]
    snoozed_until: String,
}

impl From<&Arc<Appliance>> for ApplianceRow {
    fn from(a: &Arc<Appliance>) -> Self {
        Self {
            id: a.id.clone(),
            name: a.name.clone(),
            kind: a.appliance_type().to_string(),
            location: a.location.name.clone(),
            room: a.room.name.clone(),
            last_seen: output::or_dash(a.last_seen.map(util::local_time)),
            snoozed_until: output::or_dash(a.snoozed_until().map(util::local_time)),
        }
    }
}

#[derive(Tabled)]
struct MeasurementRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Flow l/h")]
    flowrate: String,
    #[tabled(rename = "Pressure bar")]
    pressure: String,
    #[tabled(rename = "Temp °C")]
    temperature: String,
    #[tabled(rename = "Humidity %")]
    humidity: String,
}

#[derive(Tabled)]
struct WithdrawalRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Water l")]
    water: String,
    #[tabled(rename = "Hot water %")]
    hot_share: String,
    #[tabled(rename = "Water cost")]
    water_cost: String,
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn list(
    gateway: &Gateway,
    args: AppliancesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let lease = gateway.lease().await?;
    let list = lease
        .appliances()
        .get_appliances_of(args.kind.into(), args.location, None)
        .await?;

    let out = output::render_list(
        global.format(),
        &list,
        |a| ApplianceRow::from(a),
        |a| a.id.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn details(gateway: &Gateway, appliance_id: &str, global: &GlobalOpts) -> Result<(), CliError> {
    let lease = gateway.lease().await?;
    let directory = lease.appliances();
    let appliance = directory
        .find(appliance_id)
        .await?
        .ok_or_else(|| CliError::appliance_not_found(appliance_id))?;

    let out = match appliance.appliance_type() {
        ApplianceType::LeakSensor => {
            let details = directory
                .get_sense_details(appliance_id)
                .await?
                .ok_or_else(|| CliError::appliance_not_found(appliance_id))?;
            output::render_single(global.format(), &*details, sense_detail, |d| {
                d.appliance_id.clone()
            })?
        }
        ApplianceType::ValveGuard => {
            let details = directory
                .get_sense_guard_details(appliance_id)
                .await?
                .ok_or_else(|| CliError::appliance_not_found(appliance_id))?;
            output::render_single(global.format(), &*details, guard_detail, |d| {
                d.appliance_id.clone()
            })?
        }
        ApplianceType::Unknown => return Err(CliError::appliance_not_found(appliance_id)),
    };
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn usage(gateway: &Gateway, args: UsageArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let to = args.to.unwrap_or_else(|| Local::now().date_naive());
    let from = match args.from {
        Some(from) => from,
        None => to
            .checked_sub_days(Days::new(DEFAULT_USAGE_DAYS))
            .ok_or_else(|| CliError::Validation {
                field: "to".into(),
                reason: format!("{to} is too early"),
            })?,
    };
    if from > to {
        return Err(CliError::Validation {
            field: "from".into(),
            reason: format!("{from} is after {to}"),
        });
    }

    let lease = gateway.lease().await?;
    let data = lease
        .appliances()
        .get_aggregated_data(&args.appliance, args.group_by.into(), from, to)
        .await?
        .ok_or_else(|| CliError::appliance_not_found(&args.appliance))?;

    let out = output::render_single(global.format(), &*data, usage_detail, |d| {
        d.data
            .measurements
            .iter()
            .map(|m| m.date.clone())
            .chain(d.data.withdrawals.iter().map(|w| w.date.clone()))
            .collect::<Vec<_>>()
            .join("\n")
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Detail views ────────────────────────────────────────────────────

fn status_lines<'a>(out: &mut String, status: impl Iterator<Item = (&'a str, i64)>) {
    for (kind, value) in status {
        let _ = writeln!(out, "{:<14} {value}", format!("{kind}:"));
    }
}

fn sense_detail(d: &SenseDetails) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "ID:            {}", d.appliance_id);
    let _ = writeln!(out, "Name:          {}", d.name);
    let _ = writeln!(out, "Serial:        {}", output::or_dash(d.serial_number.as_deref()));
    let _ = writeln!(out, "Firmware:      {}", output::or_dash(d.version.as_deref()));
    let _ = writeln!(out, "Last seen:     {}", output::or_dash(d.tdt.map(util::local_time)));
    if let Some(m) = d.data_latest.as_ref().and_then(|l| l.measurement.as_ref()) {
        let _ = writeln!(out, "Temperature:   {} °C", output::or_dash(m.temperature));
        let _ = writeln!(out, "Humidity:      {} %", output::or_dash(m.humidity));
        let _ = writeln!(out, "Battery:       {} %", output::or_dash(m.battery));
        let _ = writeln!(out, "Measured at:   {}", output::or_dash(m.timestamp.as_deref()));
    }
    status_lines(&mut out, d.status.iter().map(|s| (s.kind.as_str(), s.value)));
    out.trim_end().to_owned()
}

fn guard_detail(d: &SenseGuardDetails) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "ID:            {}", d.appliance_id);
    let _ = writeln!(out, "Name:          {}", d.name);
    let _ = writeln!(out, "Serial:        {}", output::or_dash(d.serial_number.as_deref()));
    let _ = writeln!(out, "Firmware:      {}", output::or_dash(d.version.as_deref()));
    let _ = writeln!(out, "Last seen:     {}", output::or_dash(d.tdt.map(util::local_time)));
    let _ = writeln!(out, "Snooze:        {}", output::or_dash(d.snooze_status.as_deref()));
    if let Some(latest) = &d.data_latest {
        if let Some(m) = &latest.measurement {
            let _ = writeln!(out, "Flow rate:     {} l/h", output::or_dash(m.flowrate));
            let _ = writeln!(out, "Pressure:      {} bar", output::or_dash(m.pressure));
            let _ = writeln!(out, "Temperature:   {} °C", output::or_dash(m.temperature_guard));
        }
        let _ = writeln!(out, "Today:         {} l", output::or_dash(latest.daily_consumption));
        let _ = writeln!(out, "Daily average: {} l", output::or_dash(latest.average_daily_consumption));
        let _ = writeln!(out, "Month average: {} l", output::or_dash(latest.average_monthly_consumption));
    }
    status_lines(&mut out, d.status.iter().map(|s| (s.kind.as_str(), s.value)));
    out.trim_end().to_owned()
}

fn usage_detail(d: &AggregateData) -> String {
    let mut sections = Vec::new();
    if !d.data.measurements.is_empty() {
        let rows: Vec<MeasurementRow> = d
            .data
            .measurements
            .iter()
            .map(|m| MeasurementRow {
                date: m.date.clone(),
                flowrate: output::or_dash(m.flowrate),
                pressure: output::or_dash(m.pressure),
                temperature: output::or_dash(m.temperature.or(m.temperature_guard)),
                humidity: output::or_dash(m.humidity),
            })
            .collect();
        sections.push(output::render_table(&rows));
    }
    if !d.data.withdrawals.is_empty() {
        let rows: Vec<WithdrawalRow> = d
            .data
            .withdrawals
            .iter()
            .map(|w| WithdrawalRow {
                date: w.date.clone(),
                water: output::or_dash(w.waterconsumption),
                hot_share: output::or_dash(w.hotwater_share),
                water_cost: output::or_dash(w.water_cost),
            })
            .collect();
        sections.push(output::render_table(&rows));
    }
    if sections.is_empty() {
        return "No data in range".into();
    }
    sections.join("\n\n")
}
