//! Command dispatch: bridges CLI args -> gateway calls -> output formatting.

pub mod appliances;
pub mod config_cmd;
pub mod locations;
pub mod notifications;
pub mod snooze;
pub mod util;
pub mod valve;
pub mod watch;

use ondus_core::Gateway;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch an upstream-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, gateway: &Gateway, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Locations => locations::handle(gateway, global).await,
        Command::Appliances(args) => appliances::list(gateway, args, global).await,
        Command::Details { appliance } => appliances::details(gateway, &appliance, global).await,
        Command::Usage(args) => appliances::usage(gateway, args, global).await,
        Command::Notifications(args) => notifications::handle(gateway, args, global).await,
        Command::Snooze(args) => snooze::handle(gateway, args, global).await,
        Command::Valve(args) => valve::handle(gateway, args, global).await,
        Command::Watch => watch::handle(gateway, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
