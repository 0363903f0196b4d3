mod cli;
mod commands;
mod error;
mod output;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use ondus_config::Config;
use ondus_core::{Gateway, GatewayConfig};

use crate::cli::{Cli, Command, GlobalOpts, OutputFormat};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(mut cli: Cli) -> Result<(), CliError> {
    let cfg = ondus_config::load_config()?;
    if cli.global.output.is_none() {
        cli.global.output = OutputFormat::from_str(&cfg.output, true).ok();
    }

    match cli.command {
        // Config commands don't need an upstream session
        Command::Config(args) => commands::config_cmd::handle(args, cfg, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "ondus", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let gateway = Gateway::new(build_gateway_config(cfg, &cli.global)?)?;
            tracing::debug!(command = ?cmd, "dispatching command");
            commands::dispatch(cmd, &gateway, &cli.global).await
        }
    }
}

/// Apply CLI overrides on top of the file/env config.
fn apply_overrides(mut cfg: Config, global: &GlobalOpts) -> Config {
    if let Some(ref username) = global.username {
        cfg.username = Some(username.clone());
    }
    if let Some(ref base_url) = global.base_url {
        cfg.base_url.clone_from(base_url);
    }
    if let Some(timeout) = global.timeout {
        cfg.timeout = timeout;
    }
    cfg
}

fn build_gateway_config(cfg: Config, global: &GlobalOpts) -> Result<GatewayConfig, CliError> {
    Ok(ondus_config::to_gateway_config(&apply_overrides(cfg, global))?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config_values() {
        let cli = Cli::parse_from([
            "ondus",
            "--username",
            "flag@example.com",
            "--base-url",
            "http://localhost:9/v3/iot/",
            "--timeout",
            "5",
            "locations",
        ]);
        let cfg = Config {
            username: Some("file@example.com".into()),
            ..Config::default()
        };
        let cfg = apply_overrides(cfg, &cli.global);
        assert_eq!(cfg.username.as_deref(), Some("flag@example.com"));
        assert_eq!(cfg.base_url, "http://localhost:9/v3/iot/");
        assert_eq!(cfg.timeout, 5);
    }

    #[test]
    fn absent_flags_keep_config_values() {
        let cli = Cli::parse_from(["ondus", "locations"]);
        let cfg = apply_overrides(Config::default(), &cli.global);
        assert_eq!(cfg, Config::default());
    }
}
