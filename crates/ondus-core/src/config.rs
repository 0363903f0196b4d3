// ── Runtime gateway configuration ──
//
// Describes *how* to reach the Ondus API and how long to trust cached
// data. Carries credentials but never touches disk; the CLI (via
// `ondus-config`) builds a `GatewayConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

/// Default lifetime of cached locations, appliances, and details.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(10 * 60);
/// Notifications change rarely and are invalidated by the watcher.
pub const DEFAULT_NOTIFICATION_TTL: Duration = Duration::from_secs(2 * 60 * 60);
/// Base step of the linear backoff while waiting for a valve to react.
pub const DEFAULT_SNOOZE_POLL_DELAY: Duration = Duration::from_secs(5);
/// Give up waiting for a valve after this long.
pub const DEFAULT_SNOOZE_TIMEOUT: Duration = Duration::from_secs(180);
/// How often the notification watcher checks for new notifications.
pub const DEFAULT_NOTIFICATION_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Account credentials for the interactive login.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

/// Configuration for a single upstream account.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// API root, normally `https://idp2-apigw.cloud.grohe.com/v3/iot/`.
    pub base_url: Url,
    pub credentials: Credentials,
    /// Per-request transport timeout.
    pub timeout: Duration,
    pub cache_ttl: Duration,
    pub notification_ttl: Duration,
    pub snooze_poll_delay: Duration,
    pub snooze_timeout: Duration,
    pub notification_poll_interval: Duration,
}

impl GatewayConfig {
    /// Production endpoint with default tuning.
    pub fn new(credentials: Credentials) -> Result<Self, url::ParseError> {
        Ok(Self {
            base_url: Url::parse(ondus_api::DEFAULT_BASE_URL)?,
            credentials,
            timeout: Duration::from_secs(30),
            cache_ttl: DEFAULT_CACHE_TTL,
            notification_ttl: DEFAULT_NOTIFICATION_TTL,
            snooze_poll_delay: DEFAULT_SNOOZE_POLL_DELAY,
            snooze_timeout: DEFAULT_SNOOZE_TIMEOUT,
            notification_poll_interval: DEFAULT_NOTIFICATION_POLL_INTERVAL,
        })
    }
}
