//! Clap derive structures for the `ondus` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use ondus_core::{Aggregation, ApplianceVariant};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// ondus -- command-line access to Grohe Sense and Sense Guard appliances
#[derive(Debug, Parser)]
#[command(
    name = "ondus",
    version,
    about = "Monitor and control Grohe Sense appliances from the command line",
    long_about = "Talks to the Grohe Ondus cloud on behalf of one account.\n\n\
        Lists locations and appliances, reads measurements and notifications,\n\
        snoozes Sense Guard leak detection and opens or closes its valve.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Account e-mail (overrides config file)
    #[arg(long, short = 'u', env = "ONDUS_USERNAME", global = true)]
    pub username: Option<String>,

    /// Ondus API base URL (overrides config file)
    #[arg(long, env = "ONDUS_BASE_URL", global = true, hide_env = true)]
    pub base_url: Option<String>,

    /// Output format [default: table, or `output` from the config file]
    #[arg(long, short = 'o', env = "ONDUS_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds (overrides config file)
    #[arg(long, env = "ONDUS_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

impl GlobalOpts {
    pub fn format(&self) -> OutputFormat {
        self.output.unwrap_or(OutputFormat::Table)
    }
}

// ── Value Enums ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum KindFilter {
    /// Every recognised appliance
    #[default]
    Any,
    /// Sense leak sensors
    #[value(alias = "leak-sensor")]
    Sense,
    /// Sense Guard valves
    #[value(alias = "valve-guard")]
    SenseGuard,
}

impl From<KindFilter> for ApplianceVariant {
    fn from(kind: KindFilter) -> Self {
        match kind {
            KindFilter::Any => Self::Any,
            KindFilter::Sense => Self::LeakSensor,
            KindFilter::SenseGuard => Self::ValveGuard,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum GroupBy {
    Hour,
    #[default]
    Day,
    Week,
    Month,
    Year,
}

impl From<GroupBy> for Aggregation {
    fn from(group: GroupBy) -> Self {
        match group {
            GroupBy::Hour => Self::Hour,
            GroupBy::Day => Self::Day,
            GroupBy::Week => Self::Week,
            GroupBy::Month => Self::Month,
            GroupBy::Year => Self::Year,
        }
    }
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List locations on the account
    #[command(alias = "loc")]
    Locations,

    /// List appliances
    #[command(alias = "app", alias = "a")]
    Appliances(AppliancesArgs),

    /// Latest measurements of one appliance
    Details {
        /// Appliance id
        appliance: String,
    },

    /// Aggregated consumption and measurement history
    Usage(UsageArgs),

    /// List and manage notifications
    #[command(alias = "n")]
    Notifications(NotificationsArgs),

    /// Inspect or change Sense Guard leak-detection snooze
    Snooze(SnoozeArgs),

    /// Inspect, open or close Sense Guard valves
    Valve(ValveArgs),

    /// Watch for new notifications until interrupted
    Watch,

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared Target Arguments ──────────────────────────────────────────

/// Narrow a valve-guard operation to one appliance and/or location.
#[derive(Debug, Args)]
pub struct TargetArgs {
    /// Only this appliance
    #[arg(long, short = 'a')]
    pub appliance: Option<String>,

    /// Only appliances in this location
    #[arg(long, short = 'l')]
    pub location: Option<i64>,
}

// ── Appliances ───────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct AppliancesArgs {
    /// Appliance kind
    #[arg(long, short = 'k', value_enum, default_value_t)]
    pub kind: KindFilter,

    /// Only appliances in this location
    #[arg(long, short = 'l')]
    pub location: Option<i64>,
}

// ── Usage ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct UsageArgs {
    /// Appliance id
    pub appliance: String,

    /// Bucket size
    #[arg(long, short = 'g', value_enum, default_value_t)]
    pub group_by: GroupBy,

    /// First day (YYYY-MM-DD) [default: seven days before --to]
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Last day (YYYY-MM-DD) [default: today]
    #[arg(long)]
    pub to: Option<NaiveDate>,
}

// ── Notifications ────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct NotificationsArgs {
    #[command(subcommand)]
    pub command: NotificationsCommand,
}

#[derive(Debug, Subcommand)]
pub enum NotificationsCommand {
    /// List notifications, newest first
    #[command(alias = "ls")]
    List {
        /// Only notifications from this location
        #[arg(long, short = 'l')]
        location: Option<i64>,
    },

    /// Oldest notification newer than a unix timestamp
    Next {
        /// Unix timestamp, seconds
        after: i64,

        /// Only notifications from this location
        #[arg(long, short = 'l')]
        location: Option<i64>,

        /// Mark the notification as read
        #[arg(long)]
        mark_read: bool,

        /// Delete the notification
        #[arg(long)]
        delete: bool,
    },

    /// Mark a notification as read
    Read {
        /// Notification id
        id: String,
    },

    /// Delete a notification
    #[command(alias = "rm")]
    Delete {
        /// Notification id
        id: String,
    },
}

// ── Snooze ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SnoozeArgs {
    #[command(subcommand)]
    pub command: SnoozeCommand,
}

#[derive(Debug, Subcommand)]
pub enum SnoozeCommand {
    /// Show snooze state
    Status(TargetArgs),

    /// Snooze for a number of minutes (0 wakes)
    Set {
        /// Minutes to snooze; 0 ends an active snooze
        minutes: u32,

        #[command(flatten)]
        target: TargetArgs,
    },
}

// ── Valve ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ValveArgs {
    #[command(subcommand)]
    pub command: ValveCommand,
}

#[derive(Debug, Subcommand)]
pub enum ValveCommand {
    /// Show valve position
    Status(TargetArgs),

    /// Open the valve
    Open(TargetArgs),

    /// Close the valve
    Close(TargetArgs),
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current resolved configuration
    Show,

    /// Store the account password in the system keyring
    SetPassword,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
