//! Configuration for the Ondus gateway.
//!
//! TOML file + `ONDUS_*` environment, credential resolution (env +
//! keyring + plaintext), and translation to `ondus_core::GatewayConfig`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ondus_core::{Credentials, GatewayConfig};

/// Keyring service name; entries are keyed by account e-mail.
pub const KEYRING_SERVICE: &str = "ondus";
const ENV_PREFIX: &str = "ONDUS_";
const PASSWORD_ENV: &str = "ONDUS_PASSWORD";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no {what} configured")]
    NoCredentials { what: &'static str },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config ─────────────────────────────────────────────────────

/// Everything the gateway needs for one upstream account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Account e-mail.
    pub username: Option<String>,

    /// Password (plaintext -- prefer keyring or `password_env`).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout, seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Lifetime of cached locations and appliances, seconds.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl: u64,

    #[serde(default = "default_notification_cache_ttl")]
    pub notification_cache_ttl: u64,

    /// Give up waiting for a snooze change after this many seconds.
    #[serde(default = "default_snooze_timeout")]
    pub snooze_timeout: u64,

    /// Base step of the snooze confirmation backoff, seconds.
    #[serde(default = "default_snooze_poll_delay")]
    pub snooze_poll_delay: u64,

    #[serde(default = "default_notification_poll_interval")]
    pub notification_poll_interval: u64,

    /// Default output format for the CLI.
    #[serde(default = "default_output")]
    pub output: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            username: None,
            password: None,
            password_env: None,
            base_url: default_base_url(),
            timeout: default_timeout(),
            cache_ttl: default_cache_ttl(),
            notification_cache_ttl: default_notification_cache_ttl(),
            snooze_timeout: default_snooze_timeout(),
            snooze_poll_delay: default_snooze_poll_delay(),
            notification_poll_interval: default_notification_poll_interval(),
            output: default_output(),
        }
    }
}

fn default_base_url() -> String {
    ondus_core::DEFAULT_BASE_URL.into()
}
fn default_timeout() -> u64 {
    30
}
fn default_cache_ttl() -> u64 {
    ondus_core::config::DEFAULT_CACHE_TTL.as_secs()
}
fn default_notification_cache_ttl() -> u64 {
    ondus_core::config::DEFAULT_NOTIFICATION_TTL.as_secs()
}
fn default_snooze_timeout() -> u64 {
    ondus_core::config::DEFAULT_SNOOZE_TIMEOUT.as_secs()
}
fn default_snooze_poll_delay() -> u64 {
    ondus_core::config::DEFAULT_SNOOZE_POLL_DELAY.as_secs()
}
fn default_notification_poll_interval() -> u64 {
    ondus_core::config::DEFAULT_NOTIFICATION_POLL_INTERVAL.as_secs()
}
fn default_output() -> String {
    "table".into()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "ondus", "ondus").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("ondus");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load from the canonical path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` (missing files are fine) layered under `ONDUS_*`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

pub fn resolve_username(cfg: &Config) -> Result<String, ConfigError> {
    cfg.username
        .clone()
        .filter(|u| !u.is_empty())
        .ok_or(ConfigError::NoCredentials { what: "username" })
}

/// Resolve the account password.
///
/// Order: `password_env`, `ONDUS_PASSWORD`, system keyring, plaintext.
pub fn resolve_password(cfg: &Config, username: &str) -> Result<SecretString, ConfigError> {
    // 1. Configured env var
    if let Some(ref env_name) = cfg.password_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. Well-known env var
    if let Ok(val) = std::env::var(PASSWORD_ENV) {
        return Ok(SecretString::from(val));
    }

    // 3. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, username) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 4. Plaintext in config
    if let Some(ref pw) = cfg.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials { what: "password" })
}

/// Store a password in the system keyring for `username`.
pub fn store_password(username: &str, password: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, username)?;
    entry.set_password(password)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

fn positive_secs(field: &str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::Validation {
            field: field.into(),
            reason: "must be greater than zero".into(),
        });
    }
    Ok(Duration::from_secs(secs))
}

/// Build a `GatewayConfig`, resolving credentials.
pub fn to_gateway_config(cfg: &Config) -> Result<GatewayConfig, ConfigError> {
    let mut base_url: url::Url = cfg.base_url.parse().map_err(|_| ConfigError::Validation {
        field: "base_url".into(),
        reason: format!("invalid URL: {}", cfg.base_url),
    })?;
    if !base_url.path().ends_with('/') {
        let path = format!("{}/", base_url.path());
        base_url.set_path(&path);
    }

    let username = resolve_username(cfg)?;
    let password = resolve_password(cfg, &username)?;

    let mut config = GatewayConfig::new(Credentials { username, password }).map_err(|e| {
        ConfigError::Validation {
            field: "base_url".into(),
            reason: e.to_string(),
        }
    })?;
    config.base_url = base_url;
    config.timeout = positive_secs("timeout", cfg.timeout)?;
    config.cache_ttl = Duration::from_secs(cfg.cache_ttl);
    config.notification_ttl = Duration::from_secs(cfg.notification_cache_ttl);
    config.snooze_timeout = positive_secs("snooze_timeout", cfg.snooze_timeout)?;
    config.snooze_poll_delay = positive_secs("snooze_poll_delay", cfg.snooze_poll_delay)?;
    config.notification_poll_interval =
        positive_secs("notification_poll_interval", cfg.notification_poll_interval)?;
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.cache_ttl, 600);
        assert_eq!(cfg.notification_cache_ttl, 7200);
        assert_eq!(cfg.snooze_timeout, 180);
        assert_eq!(cfg.snooze_poll_delay, 5);
        assert_eq!(cfg.base_url, ondus_core::DEFAULT_BASE_URL);
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "username = \"me@example.com\"\nsnooze_timeout = 60\noutput = \"json\"\n",
        )
        .unwrap();

        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.username.as_deref(), Some("me@example.com"));
        assert_eq!(cfg.snooze_timeout, 60);
        assert_eq!(cfg.output, "json");
        assert_eq!(cfg.timeout, 30);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cfg = Config {
            username: Some("me@example.com".into()),
            cache_ttl: 120,
            ..Config::default()
        };

        save_config_to(&cfg, &path).unwrap();
        assert_eq!(load_config_from(&path).unwrap().cache_ttl, 120);
    }

    #[test]
    fn translation_uses_plaintext_as_last_resort() {
        let cfg = Config {
            username: Some("nobody-in-keyring@example.invalid".into()),
            password: Some("plain".into()),
            password_env: Some("ONDUS_TEST_UNSET_PASSWORD_VAR".into()),
            base_url: "http://localhost:8080/v3/iot".into(),
            snooze_poll_delay: 2,
            ..Config::default()
        };

        let gateway = to_gateway_config(&cfg).unwrap();
        if std::env::var(PASSWORD_ENV).is_err() {
            assert_eq!(gateway.credentials.password.expose_secret(), "plain");
        }
        assert_eq!(gateway.base_url.as_str(), "http://localhost:8080/v3/iot/");
        assert_eq!(gateway.snooze_poll_delay, Duration::from_secs(2));
        assert_eq!(gateway.cache_ttl, Duration::from_secs(600));
    }

    #[test]
    fn translation_rejects_bad_input() {
        let no_user = Config::default();
        assert!(matches!(
            to_gateway_config(&no_user),
            Err(ConfigError::NoCredentials { what: "username" })
        ));

        let bad_url = Config {
            username: Some("me@example.com".into()),
            password: Some("pw".into()),
            base_url: "not a url".into(),
            ..Config::default()
        };
        assert!(matches!(
            to_gateway_config(&bad_url),
            Err(ConfigError::Validation { ref field, .. }) if field == "base_url"
        ));

        let zero_delay = Config {
            username: Some("me@example.com".into()),
            password: Some("pw".into()),
            snooze_poll_delay: 0,
            ..Config::default()
        };
        assert!(matches!(
            to_gateway_config(&zero_delay),
            Err(ConfigError::Validation { ref field, .. }) if field == "snooze_poll_delay"
        ));
    }
}
