//! Shared helpers for command handlers.

use chrono::{DateTime, Local, Utc};

use crate::cli::TargetArgs;
use crate::error::CliError;

/// Error for a valve-guard operation that matched nothing.
pub fn no_valve_guard(target: &TargetArgs) -> CliError {
    let identifier = match (&target.appliance, target.location) {
        (Some(id), _) => id.clone(),
        (None, Some(location)) => format!("in location {location}"),
        (None, None) => "any".into(),
    };
    CliError::NotFound {
        resource_type: "Sense Guard".into(),
        identifier,
        list_command: "appliances --kind sense-guard".into(),
    }
}

/// Local wall-clock rendering for table cells.
pub fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Compact duration such as `1h 05m` or `42s`.
pub fn short_duration(secs: i64) -> String {
    let secs = secs.max(0);
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}h {m:02}m")
    } else if m > 0 {
        format!("{m}m {s:02}s")
    } else {
        format!("{s}s")
    }
}
