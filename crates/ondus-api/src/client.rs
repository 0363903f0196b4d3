// Ondus API HTTP client
//
// Wraps two `reqwest::Client`s (the non-redirecting login client and the
// header-carrying API client) with URL construction relative to the
// `/v3/iot/` root and bearer-token injection. Endpoint groups (locations,
// appliances, notifications, commands) live in separate files as inherent
// methods to keep this module focused on transport mechanics.

use std::sync::{PoisonError, RwLock};

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Production API root.
pub const DEFAULT_BASE_URL: &str = "https://idp2-apigw.cloud.grohe.com/v3/iot/";

/// Raw HTTP client for the Grohe Ondus cloud API.
///
/// Holds the bearer token set by [`set_access_token`](Self::set_access_token);
/// every endpoint method sends it. Token lifecycle (when to refresh) is the
/// caller's concern.
pub struct OndusClient {
    http: reqwest::Client,
    auth_http: reqwest::Client,
    base_url: Url,
    bearer: RwLock<Option<SecretString>>,
}

impl OndusClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// If the config doesn't already include a cookie jar, one is created
    /// so the login session survives the hop between the two clients.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let config = if transport.cookie_jar.is_some() {
            transport.clone()
        } else {
            transport.clone().with_cookie_jar()
        };
        let http = config.build_api_client()?;
        let auth_http = config.build_auth_client()?;
        Ok(Self::with_clients(http, auth_http, base_url))
    }

    /// Create a client from pre-built `reqwest::Client`s.
    ///
    /// `auth_http` must not follow redirects or [`login`](Self::login) will fail.
    pub fn with_clients(http: reqwest::Client, auth_http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            auth_http,
            base_url: ensure_trailing_slash(base_url),
            bearer: RwLock::new(None),
        }
    }

    /// The API root all relative paths resolve against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn auth_http(&self) -> &reqwest::Client {
        &self.auth_http
    }

    // ── Bearer token ─────────────────────────────────────────────────

    /// Install the access token sent as `Authorization: Bearer ...`.
    pub fn set_access_token(&self, token: SecretString) {
        debug!("storing bearer token");
        *self.bearer.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    /// Drop the stored access token.
    pub fn clear_access_token(&self) {
        *self.bearer.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn has_access_token(&self) -> bool {
        self.bearer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder, Error> {
        let guard = self.bearer.read().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(token) => Ok(builder.bearer_auth(token.expose_secret())),
            None => Err(Error::NotLoggedIn),
        }
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Resolve a path relative to the API root: `{base}/v3/iot/{path}`.
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Build `locations/{l}/rooms/{r}/appliances/{a}/{suffix}`.
    pub(crate) fn appliance_url(
        &self,
        location_id: i64,
        room_id: i64,
        appliance_id: &str,
        suffix: &str,
    ) -> Result<Url, Error> {
        self.api_url(&format!(
            "locations/{location_id}/rooms/{room_id}/appliances/{appliance_id}/{suffix}"
        ))
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send an authenticated GET and decode the JSON body.
    pub(crate) async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);

        let resp = self
            .authorize(self.http.get(url))?
            .send()
            .await
            .map_err(Error::Transport)?;

        parse_json(resp).await
    }

    /// Send an authenticated PUT with a JSON body, ignoring the response body.
    pub(crate) async fn put(&self, url: Url, body: &impl Serialize) -> Result<(), Error> {
        debug!("PUT {}", url);

        let resp = self
            .authorize(self.http.put(url).json(body))?
            .send()
            .await
            .map_err(Error::Transport)?;

        check_status(resp).await.map(drop)
    }

    /// Send an authenticated POST with a JSON body, ignoring the response body.
    pub(crate) async fn post(&self, url: Url, body: &impl Serialize) -> Result<(), Error> {
        debug!("POST {}", url);

        let resp = self
            .authorize(self.http.post(url).json(body))?
            .send()
            .await
            .map_err(Error::Transport)?;

        check_status(resp).await.map(drop)
    }

    /// Send an authenticated DELETE.
    pub(crate) async fn delete(&self, url: Url) -> Result<(), Error> {
        debug!("DELETE {}", url);

        let resp = self
            .authorize(self.http.delete(url))?
            .send()
            .await
            .map_err(Error::Transport)?;

        check_status(resp).await.map(drop)
    }
}

fn ensure_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Turn a non-2xx response into `Error::Http`, passing successes through.
pub(crate) async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = resp.text().await.unwrap_or_default();
    Err(Error::Http {
        status: status.as_u16(),
        message: if message.is_empty() {
            status.canonical_reason().unwrap_or("unknown").to_owned()
        } else {
            message
        },
    })
}

/// Check the status, then decode the body, keeping the raw text on failure.
pub(crate) async fn parse_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let resp = check_status(resp).await?;
    let body = resp.text().await.map_err(Error::Transport)?;
    serde_json::from_str(&body).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> OndusClient {
        OndusClient::with_clients(
            reqwest::Client::new(),
            reqwest::Client::new(),
            Url::parse(base).unwrap(),
        )
    }

    #[test]
    fn base_url_gains_trailing_slash() {
        let c = client("https://example.test/v3/iot");
        assert_eq!(c.base_url().as_str(), "https://example.test/v3/iot/");
        assert_eq!(
            c.api_url("locations").unwrap().as_str(),
            "https://example.test/v3/iot/locations"
        );
    }

    #[test]
    fn appliance_url_nests_ids() {
        let c = client(DEFAULT_BASE_URL);
        let url = c.appliance_url(1, 2, "abc", "status").unwrap();
        assert_eq!(
            url.as_str(),
            "https://idp2-apigw.cloud.grohe.com/v3/iot/locations/1/rooms/2/appliances/abc/status"
        );
    }

    #[test]
    fn requests_without_token_fail_fast() {
        let c = client(DEFAULT_BASE_URL);
        assert!(!c.has_access_token());
        let err = c.authorize(c.http.get(DEFAULT_BASE_URL)).unwrap_err();
        assert!(matches!(err, Error::NotLoggedIn));

        c.set_access_token(SecretString::from("tok".to_owned()));
        assert!(c.has_access_token());
        c.clear_access_token();
        assert!(!c.has_access_token());
    }
}
