//! Valve command handlers.

use tabled::Tabled;

use ondus_core::{Gateway, ValveState};

use crate::cli::{GlobalOpts, TargetArgs, ValveArgs, ValveCommand};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct ValveRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Open")]
    open: String,
}

impl From<&ValveState> for ValveRow {
    fn from(v: &ValveState) -> Self {
        Self {
            id: v.appliance_id.clone(),
            name: v.appliance_name.clone(),
            open: output::flag(v.open, true),
        }
    }
}

fn render(states: &[ValveState], global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_list(
        global.format(),
        states,
        |v| ValveRow::from(v),
        |v| format!("{}\t{}", v.appliance_id, if v.open { "open" } else { "closed" }),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

async fn set(
    gateway: &Gateway,
    target: &TargetArgs,
    open: bool,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let lease = gateway.lease().await?;
    let outcome = lease
        .actuation()
        .set_valves(target.location, target.appliance.as_deref(), open)
        .await?
        .ok_or_else(|| util::no_valve_guard(target))?;
    render(&outcome.states, global)?;
    if outcome.partial_failure {
        return Err(CliError::OperationFailed {
            action: if open { "Opening the valve" } else { "Closing the valve" }.into(),
        });
    }
    Ok(())
}

pub async fn handle(gateway: &Gateway, args: ValveArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ValveCommand::Status(target) => {
            let lease = gateway.lease().await?;
            let states = lease
                .actuation()
                .valve_states(target.location, target.appliance.as_deref())
                .await?;
            if states.is_empty() {
                return Err(util::no_valve_guard(&target));
            }
            render(&states, global)
        }
        ValveCommand::Open(target) => set(gateway, &target, true, global).await,
        ValveCommand::Close(target) => set(gateway, &target, false, global).await,
    }
}
