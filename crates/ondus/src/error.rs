//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and process exit codes.

use miette::Diagnostic;
use thiserror::Error;

use ondus_config::ConfigError;
use ondus_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the Ondus API at {url}: {reason}")]
    #[diagnostic(
        code(ondus::connection_failed),
        help(
            "Check your network connection.\n\
             URL: {url}\n\
             Override with --base-url or ONDUS_BASE_URL."
        )
    )]
    ConnectionFailed { url: String, reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(ondus::auth_failed),
        help(
            "Verify the account e-mail and password.\n\
             Run: ondus config set-password"
        )
    )]
    AuthFailed { message: String },

    #[error("No {what} configured")]
    #[diagnostic(
        code(ondus::no_credentials),
        help(
            "Pass --username (or set ONDUS_USERNAME) and store the password with:\n  \
             ondus config set-password\n\
             Or set ONDUS_PASSWORD."
        )
    )]
    NoCredentials { what: String },

    #[error("Keyring unavailable: {message}")]
    #[diagnostic(
        code(ondus::keyring),
        help("Set ONDUS_PASSWORD or `password_env` in the config file instead.")
    )]
    Keyring { message: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(ondus::not_found),
        help("Run: ondus {list_command} to see what is available")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Upstream ─────────────────────────────────────────────────────
    #[error("Ondus API error: {message}")]
    #[diagnostic(code(ondus::api_error))]
    ApiError { message: String },

    #[error("{action} did not complete")]
    #[diagnostic(
        code(ondus::operation_failed),
        help("Re-run with -v to see the upstream error.")
    )]
    OperationFailed { action: String },

    #[error("Appliance {appliance_id} did not confirm the change within {seconds}s")]
    #[diagnostic(
        code(ondus::not_converged),
        help("The command may still take effect; check again with the matching `status` subcommand.")
    )]
    NotConverged { appliance_id: String, seconds: u64 },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(ondus::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(ondus::config),
        help("Inspect the resolved configuration with: ondus config show")
    )]
    Config { message: String },

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Request timed out")]
    #[diagnostic(
        code(ondus::timeout),
        help("Increase timeout with --timeout or try again later.")
    )]
    Timeout,

    // ── IO / Internal ────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    #[diagnostic(code(ondus::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } | Self::Keyring { .. } => {
                exit_code::AUTH
            }
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout | Self::NotConverged { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    pub fn appliance_not_found(identifier: &str) -> Self {
        Self::NotFound {
            resource_type: "appliance".into(),
            identifier: identifier.into(),
            list_command: "appliances".into(),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },

            CoreError::AuthenticationFailed { message } => Self::AuthFailed { message },

            CoreError::Timeout => Self::Timeout,

            CoreError::NotFound {
                entity_type,
                identifier,
            } => Self::NotFound {
                list_command: match entity_type.as_str() {
                    "notification" => "notifications list".into(),
                    "location" => "locations".into(),
                    _ => "appliances".into(),
                },
                resource_type: entity_type,
                identifier,
            },

            CoreError::Upstream { message, status } => Self::ApiError {
                message: match status {
                    Some(status) => format!("{message} (HTTP {status})"),
                    None => message,
                },
            },

            CoreError::InvalidInput { message } => Self::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::ConvergenceTimeout {
                appliance_id,
                waited_secs,
            } => Self::NotConverged {
                appliance_id,
                seconds: waited_secs,
            },

            CoreError::Config { message } => Self::Config { message },

            CoreError::Internal(message) => Self::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::NoCredentials { what } => Self::NoCredentials { what: what.into() },
            ConfigError::Keyring(e) => Self::Keyring {
                message: e.to_string(),
            },
            ConfigError::Io(e) => Self::Io(e),
            other => Self::Config {
                message: other.to_string(),
            },
        }
    }
}
