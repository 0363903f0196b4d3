// ── Core error types ──
//
// Gateway-level errors. Consumers never see raw JSON parse failures or
// reqwest errors; the `From<ondus_api::Error>` impl translates
// transport-layer errors into domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach the Ondus API at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Request timed out")]
    Timeout,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Entity not found: {entity_type} with id {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Upstream rejected the request: {message}")]
    Upstream {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Appliance {appliance_id} did not confirm the change within {waited_secs}s")]
    ConvergenceTimeout { appliance_id: String, waited_secs: u64 },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn appliance_not_found(appliance_id: &str) -> Self {
        Self::NotFound {
            entity_type: "appliance".into(),
            identifier: appliance_id.into(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<ondus_api::Error> for CoreError {
    fn from(err: ondus_api::Error) -> Self {
        match err {
            ondus_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            ondus_api::Error::LoginFormNotFound => CoreError::AuthenticationFailed {
                message: "login form not found -- the login page layout may have changed".into(),
            },
            ondus_api::Error::NotLoggedIn => CoreError::AuthenticationFailed {
                message: "no active session".into(),
            },
            ondus_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Upstream {
                        message: e.to_string(),
                        status: err.status(),
                    }
                }
            }
            ondus_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            ondus_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            ondus_api::Error::Http { status: 401, message } => {
                CoreError::AuthenticationFailed { message }
            }
            ondus_api::Error::Http { status, message } => CoreError::Upstream {
                message,
                status: Some(status),
            },
            ondus_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_errors_map_by_status() {
        let unauthorized = CoreError::from(ondus_api::Error::Http {
            status: 401,
            message: "expired".into(),
        });
        assert!(matches!(unauthorized, CoreError::AuthenticationFailed { .. }));

        let rejected = CoreError::from(ondus_api::Error::Http {
            status: 400,
            message: "bad".into(),
        });
        assert!(matches!(
            rejected,
            CoreError::Upstream {
                status: Some(400),
                ..
            }
        ));
    }

    #[test]
    fn missing_form_is_an_auth_failure() {
        let err = CoreError::from(ondus_api::Error::LoginFormNotFound);
        assert!(matches!(err, CoreError::AuthenticationFailed { .. }));
    }
}
