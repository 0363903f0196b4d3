// Shared transport configuration for building reqwest::Client instances.
//
// The Ondus login flow needs two clients: one that refuses to follow
// redirects (the credential POST answers 302 to a custom app scheme) and
// one that carries the mobile-app identification headers. Both share a
// cookie jar so the login session started on one continues on the other.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect::Policy;

use crate::error::Error;

/// User agent the Android app's login web view sends.
const AUTH_USER_AGENT: &str = "Dalvik/2.1.0 (Linux; U; Android 12; SM-A426N Build/SP1A.210812.016)";

/// User agent the Android app's API client sends.
const API_USER_AGENT: &str = "okhttp/4.10.0";

/// Identification headers the upstream expects on every API call.
const API_HEADERS: &[(&str, &str)] = &[
    ("device-type", "smartphone"),
    ("device-os", "android"),
    ("app-version", "1.11.0"),
    ("client-id", "sense"),
    ("device-os-number", "12"),
];

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    pub cookie_jar: Option<Arc<Jar>>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            cookie_jar: None,
        }
    }
}

impl TransportConfig {
    /// Build the client used for the credential form POST.
    ///
    /// Never follows redirects: the success signal is the `302 Found`
    /// itself, and its `Location` uses a scheme reqwest cannot follow.
    pub fn build_auth_client(&self) -> Result<reqwest::Client, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(AUTH_USER_AGENT)
            .default_headers(headers)
            .redirect(Policy::none())
            .gzip(true);

        if let Some(ref jar) = self.cookie_jar {
            builder = builder.cookie_provider(Arc::clone(jar));
        }

        builder
            .build()
            .map_err(|e| Error::Tls(format!("failed to build auth HTTP client: {e}")))
    }

    /// Build the client used for every API call, with the app headers baked in.
    pub fn build_api_client(&self) -> Result<reqwest::Client, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en_US"));
        for (name, value) in API_HEADERS {
            headers.insert(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }

        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(API_USER_AGENT)
            .default_headers(headers)
            .gzip(true);

        if let Some(ref jar) = self.cookie_jar {
            builder = builder.cookie_provider(Arc::clone(jar));
        }

        builder
            .build()
            .map_err(|e| Error::Tls(format!("failed to build API HTTP client: {e}")))
    }

    /// Create a config with a fresh cookie jar (for the login session).
    pub fn with_cookie_jar(mut self) -> Self {
        self.cookie_jar = Some(Arc::new(Jar::default()));
        self
    }
}
