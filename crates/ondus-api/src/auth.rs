// Ondus authentication
//
// Interactive login that mimics the mobile app: fetch the Keycloak login
// page, post the credentials form without following redirects, rewrite
// the `ondus://` redirect target to a fetchable URL, and exchange it for tokens.
// Refresh uses the standard `refresh_token` grant against `oidc/token`.

use std::sync::OnceLock;

use chrono::{DateTime, TimeDelta, Utc};
use regex::Regex;
use reqwest::StatusCode;
use reqwest::header::LOCATION;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};
use url::Url;

use crate::client::{OndusClient, parse_json};
use crate::error::Error;
use crate::models::TokenResponse;

/// OAuth client id the app registers as.
const CLIENT_ID: &str = "sense";

/// Bearer + refresh token pair with the instant it was issued.
///
/// Replaced wholesale on every login and refresh; never patched in place.
#[derive(Debug, Clone)]
pub struct AuthTokens {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
    pub issued_at: DateTime<Utc>,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub refresh_expires_in: Option<i64>,
}

impl AuthTokens {
    pub fn from_response(resp: TokenResponse, issued_at: DateTime<Utc>) -> Self {
        Self {
            access_token: SecretString::from(resp.access_token),
            refresh_token: SecretString::from(resp.refresh_token),
            issued_at,
            expires_in: resp.expires_in,
            refresh_expires_in: resp.refresh_expires_in,
        }
    }

    /// Half-life of the access token: refresh proactively from here on.
    pub fn refresh_at(&self) -> DateTime<Utc> {
        self.issued_at + TimeDelta::seconds(self.expires_in / 2)
    }

    /// Whether a refresh is due at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now >= self.refresh_at()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.issued_at + TimeDelta::seconds(self.expires_in)
    }
}

impl OndusClient {
    /// Log in with the account's e-mail and password.
    ///
    /// `GET oidc/login`, then POST the credentials to the page's form target.
    /// A `302 Found` means the credentials were accepted; anything else is
    /// treated as a rejection. On success the access token is installed on
    /// this client and the full token set is returned.
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<AuthTokens, Error> {
        let login_url = self.api_url("oidc/login")?;
        debug!("fetching login page at {}", login_url);

        let page = self
            .http()
            .get(login_url)
            .send()
            .await
            .map_err(Error::Transport)?;
        let page_url = page.url().clone();
        let html = page.text().await.map_err(Error::Transport)?;

        let action = extract_form_action(&html).ok_or(Error::LoginFormNotFound)?;
        let action_url = page_url.join(&action)?;
        debug!("submitting credentials to {}", action_url);

        let resp = self
            .auth_http()
            .post(action_url)
            .form(&[("username", username), ("password", password.expose_secret())])
            .send()
            .await
            .map_err(Error::Transport)?;

        if resp.status() != StatusCode::FOUND {
            return Err(Error::Authentication {
                message: format!(
                    "login rejected (HTTP {}) -- check username and password",
                    resp.status()
                ),
            });
        }

        let location = resp
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| Error::Authentication {
                message: "login redirect carried no Location header".into(),
            })?;
        let token_url = rewrite_app_scheme(location, self.base_url().scheme())?;
        debug!("exchanging login redirect for tokens");

        let resp = self
            .http()
            .get(token_url)
            .send()
            .await
            .map_err(Error::Transport)?;
        let tokens = parse_json::<TokenResponse>(resp)
            .await
            .map_err(|e| Error::Authentication {
                message: format!("token exchange failed: {e}"),
            })?;

        let tokens = AuthTokens::from_response(tokens, Utc::now());
        self.set_access_token(tokens.access_token.clone());
        info!(refresh_at = %tokens.refresh_at(), "login successful");
        Ok(tokens)
    }

    /// Exchange a refresh token for a new token set.
    ///
    /// `POST oidc/token` with the `refresh_token` grant. The new access
    /// token is installed on this client. Only a rejected grant (400/401)
    /// comes back as [`Error::Authentication`]; server failures, transport
    /// errors and undecodable bodies are returned as they are.
    pub async fn refresh(&self, refresh_token: &SecretString) -> Result<AuthTokens, Error> {
        let url = self.api_url("oidc/token")?;
        debug!("refreshing tokens at {}", url);

        let resp = self
            .auth_http()
            .post(url)
            .form(&[
                ("refresh_token", refresh_token.expose_secret()),
                ("grant_type", "refresh_token"),
                ("client_id", CLIENT_ID),
            ])
            .send()
            .await
            .map_err(Error::Transport)?;

        let tokens = parse_json::<TokenResponse>(resp)
            .await
            .map_err(classify_refresh_error)?;

        let tokens = AuthTokens::from_response(tokens, Utc::now());
        self.set_access_token(tokens.access_token.clone());
        info!(refresh_at = %tokens.refresh_at(), "refreshed token");
        Ok(tokens)
    }
}

/// `action="..."` of a `<form>` tag. The attribute must follow whitespace,
/// so names like `data-action` never match.
const FORM_ACTION: &str = r#"(?i)<form[^>]*?\saction\s*=\s*"([^"]*)""#;

/// Find the `action` attribute of the first `<form>` element that has one,
/// with HTML entities decoded.
pub fn extract_form_action(html: &str) -> Option<String> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| Regex::new(FORM_ACTION).ok()).as_ref()?;
    let action = pattern.captures(html)?.get(1)?.as_str();
    Some(html_escape::decode_html_entities(action).into_owned())
}

/// Keycloak answers an expired or revoked refresh token with
/// `400 invalid_grant` (or 401 for a bad client). Everything else is not a
/// verdict on the token.
fn classify_refresh_error(err: Error) -> Error {
    match err {
        Error::Http {
            status: 400 | 401,
            message,
        } => Error::Authentication {
            message: format!("refresh token rejected: {message}"),
        },
        other => other,
    }
}

/// Replace the custom app scheme of the login redirect with the API's own
/// scheme (`https` in production).
///
/// `Url::set_scheme` refuses to turn a non-special scheme into a special
/// one, so the swap happens on the string before parsing.
fn rewrite_app_scheme(location: &str, scheme: &str) -> Result<Url, Error> {
    let rest = location
        .split_once("://")
        .map(|(_, rest)| rest)
        .ok_or_else(|| Error::Authentication {
            message: format!("unexpected login redirect target: {location}"),
        })?;
    Ok(Url::parse(&format!("{scheme}://{rest}"))?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn tokens_at(issued_at: DateTime<Utc>, expires_in: i64) -> AuthTokens {
        AuthTokens::from_response(
            TokenResponse {
                access_token: "a".into(),
                expires_in,
                refresh_token: "r".into(),
                refresh_expires_in: None,
            },
            issued_at,
        )
    }

    #[test]
    fn refresh_at_is_half_life() {
        let t0 = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let tokens = tokens_at(t0, 3600);

        assert_eq!(tokens.refresh_at(), t0 + TimeDelta::seconds(1800));
        assert!(!tokens.is_due(t0 + TimeDelta::seconds(1799)));
        assert!(tokens.is_due(t0 + TimeDelta::seconds(1800)));
        assert!(tokens.is_due(t0 + TimeDelta::seconds(1801)));
        assert_eq!(tokens.expires_at(), t0 + TimeDelta::seconds(3600));
    }

    #[test]
    fn extracts_and_decodes_form_action() {
        let html = r#"<html><body>
            <FORM id="kc-form-login" method="post"
                  action="https://idp.example/auth?session_code=abc&amp;execution=x&#x2F;y&#47;z">
            <input name="username"></FORM></body></html>"#;
        assert_eq!(
            extract_form_action(html).unwrap(),
            "https://idp.example/auth?session_code=abc&execution=x/y/z"
        );
    }

    #[test]
    fn skips_forms_without_action() {
        let html = r#"<form id="search"></form><form action="/login-actions/authenticate">"#;
        assert_eq!(
            extract_form_action(html).unwrap(),
            "/login-actions/authenticate"
        );
    }

    #[test]
    fn missing_form_yields_none() {
        assert!(extract_form_action("<html><body>maintenance</body></html>").is_none());
    }

    #[test]
    fn data_action_attribute_is_not_the_form_target() {
        let html = r#"<form id="kc-form-login" data-action="/analytics" action="/login-actions/authenticate" method="post">"#;
        assert_eq!(
            extract_form_action(html).as_deref(),
            Some("/login-actions/authenticate")
        );
    }

    #[test]
    fn form_with_only_data_action_is_skipped() {
        let html = r#"<form data-action="/analytics"></form>
            <form method="post"
                  action='ignored' ACTION = "/login?a=1&amp;b=2">"#;
        assert_eq!(extract_form_action(html).as_deref(), Some("/login?a=1&b=2"));
    }

    #[test]
    fn rejected_grant_is_an_auth_error() {
        let err = classify_refresh_error(Error::Http {
            status: 400,
            message: r#"{"error":"invalid_grant"}"#.into(),
        });
        assert!(matches!(err, Error::Authentication { .. }));
    }

    #[test]
    fn server_failures_are_not_auth_errors() {
        let err = classify_refresh_error(Error::Http {
            status: 503,
            message: "Service Unavailable".into(),
        });
        assert!(matches!(err, Error::Http { status: 503, .. }));
        assert!(!err.is_auth_error());

        let err = classify_refresh_error(Error::Deserialization {
            message: "expected value".into(),
            body: "<html>".into(),
        });
        assert!(!err.is_auth_error());
    }

    #[test]
    fn app_scheme_becomes_https() {
        let url = rewrite_app_scheme(
            "ondus://idp2-apigw.cloud.grohe.com/v3/iot/oidc/token?code=x",
            "https",
        )
        .unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("idp2-apigw.cloud.grohe.com"));
        assert_eq!(url.query(), Some("code=x"));
        assert!(rewrite_app_scheme("not a url", "https").is_err());
    }
}
