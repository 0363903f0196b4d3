//! Snooze command handlers.

use tabled::Tabled;

use ondus_core::{Gateway, SnoozeState};

use crate::cli::{GlobalOpts, SnoozeArgs, SnoozeCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct SnoozeRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Snoozing")]
    snoozing: String,
    #[tabled(rename = "Until")]
    until: String,
    #[tabled(rename = "Remaining")]
    remaining: String,
}

impl From<&SnoozeState> for SnoozeRow {
    fn from(s: &SnoozeState) -> Self {
        Self {
            id: s.appliance_id.clone(),
            name: s.appliance_name.clone(),
            snoozing: output::flag(s.snoozing, false),
            until: output::or_dash(s.snoozed_until.filter(|_| s.snoozing).map(util::local_time)),
            remaining: if s.snoozing {
                util::short_duration(s.remaining_secs)
            } else {
                "-".into()
            },
        }
    }
}

fn render(states: &[SnoozeState], global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_list(
        global.format(),
        states,
        |s| SnoozeRow::from(s),
        |s| format!("{}\t{}", s.appliance_id, s.remaining_secs),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(gateway: &Gateway, args: SnoozeArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let lease = gateway.lease().await?;
    let actuation = lease.actuation();

    match args.command {
        SnoozeCommand::Status(target) => {
            let states = actuation
                .snooze_states(target.location, target.appliance.as_deref())
                .await?;
            if states.is_empty() {
                return Err(util::no_valve_guard(&target));
            }
            render(&states, global)
        }

        SnoozeCommand::Set { minutes, target } => {
            let outcome = actuation
                .set_snooze_all(target.location, target.appliance.as_deref(), minutes)
                .await?
                .ok_or_else(|| util::no_valve_guard(&target))?;
            render(&outcome.states, global)?;
            if outcome.partial_failure {
                return Err(CliError::OperationFailed {
                    action: if minutes == 0 { "Wake" } else { "Snooze" }.into(),
                });
            }
            Ok(())
        }
    }
}
