use thiserror::Error;

/// Top-level error type for the `ondus-api` crate.
///
/// Covers the login flow, transport, and upstream response failures.
/// `ondus-core` maps these into gateway-level diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login failed (rejected credentials, broken redirect, token exchange).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The login page did not contain a `<form action="...">` target.
    #[error("Login form not found in the login page")]
    LoginFormNotFound,

    /// An authenticated call was attempted before a bearer token was set.
    #[error("Not logged in -- no bearer token available")]
    NotLoggedIn,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS or client-construction error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Upstream ────────────────────────────────────────────────────
    /// Non-success status from the Ondus API.
    #[error("Upstream error (HTTP {status}): {message}")]
    Http { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if re-authenticating might resolve this error.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            Self::Authentication { .. }
                | Self::LoginFormNotFound
                | Self::NotLoggedIn
                | Self::Http { status: 401, .. }
        )
    }

    /// The HTTP status associated with this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
