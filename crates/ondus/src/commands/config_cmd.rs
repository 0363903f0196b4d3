//! Config subcommand handlers.

use std::fmt::Write as _;

use ondus_config::Config;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

const REDACTED: &str = "********";

/// Copy of `cfg` that is safe to print.
fn redacted(cfg: &Config) -> Config {
    Config {
        password: cfg.password.as_ref().map(|_| REDACTED.into()),
        ..cfg.clone()
    }
}

fn detail(cfg: &Config) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Config file:                {}", ondus_config::config_path().display());
    let _ = writeln!(out, "Username:                   {}", output::or_dash(cfg.username.as_deref()));
    let _ = writeln!(out, "Password:                   {}", output::or_dash(cfg.password.as_deref()));
    let _ = writeln!(out, "Password env:               {}", output::or_dash(cfg.password_env.as_deref()));
    let _ = writeln!(out, "Base URL:                   {}", cfg.base_url);
    let _ = writeln!(out, "Timeout:                    {}s", cfg.timeout);
    let _ = writeln!(out, "Cache TTL:                  {}s", cfg.cache_ttl);
    let _ = writeln!(out, "Notification cache TTL:     {}s", cfg.notification_cache_ttl);
    let _ = writeln!(out, "Snooze timeout:             {}s", cfg.snooze_timeout);
    let _ = writeln!(out, "Snooze poll delay:          {}s", cfg.snooze_poll_delay);
    let _ = writeln!(out, "Notification poll interval: {}s", cfg.notification_poll_interval);
    let _ = write!(out, "Output:                     {}", cfg.output);
    out
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, mut cfg: Config, global: &GlobalOpts) -> Result<(), CliError> {
    if let Some(ref username) = global.username {
        cfg.username = Some(username.clone());
    }

    match args.command {
        ConfigCommand::Show => {
            let out = output::render_single(global.format(), &redacted(&cfg), detail, |_| {
                ondus_config::config_path().display().to_string()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::SetPassword => {
            let username = ondus_config::resolve_username(&cfg)?;
            let password = rpassword::prompt_password(format!("Password for {username}: "))?;
            if password.is_empty() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "password cannot be empty".into(),
                });
            }
            ondus_config::store_password(&username, &password)?;
            output::notice(
                &format!("Password for {username} stored in system keyring"),
                global.quiet,
            );
            Ok(())
        }
    }
}
