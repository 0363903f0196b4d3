// ── Authenticated session ──
//
// Owns the token pair for the single upstream account. Tokens are
// replaced wholesale on login and refresh; every mutation takes a
// `&Ticket` so it can only happen while the serializer is held.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use ondus_api::{AuthTokens, OndusClient};
use tracing::{debug, info, warn};

use crate::config::Credentials;
use crate::error::CoreError;
use crate::serializer::Ticket;

pub struct AuthSession {
    credentials: Credentials,
    tokens: ArcSwapOption<AuthTokens>,
}

impl AuthSession {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            tokens: ArcSwapOption::empty(),
        }
    }

    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    /// Snapshot of the current token pair, if logged in.
    pub fn tokens(&self) -> Option<Arc<AuthTokens>> {
        self.tokens.load_full()
    }

    /// When the current token becomes due for refresh.
    pub fn refresh_at(&self) -> Option<DateTime<Utc>> {
        self.tokens.load().as_ref().map(|t| t.refresh_at())
    }

    /// Run the interactive login and install the resulting tokens.
    pub async fn login(&self, ticket: &Ticket, client: &OndusClient) -> Result<(), CoreError> {
        debug_assert!(ticket.is_held(), "login requires the serializer");
        let tokens = client
            .login(&self.credentials.username, &self.credentials.password)
            .await?;
        info!(
            username = %self.credentials.username,
            refresh_at = %tokens.refresh_at(),
            "session established"
        );
        self.tokens.store(Some(Arc::new(tokens)));
        Ok(())
    }

    /// Log in if there is no session yet; refresh the token if its
    /// half-life has passed.
    pub async fn ensure_fresh(&self, ticket: &Ticket, client: &OndusClient) -> Result<(), CoreError> {
        self.ensure_fresh_at(ticket, client, Utc::now()).await
    }

    pub async fn ensure_fresh_at(
        &self,
        ticket: &Ticket,
        client: &OndusClient,
        now: DateTime<Utc>,
    ) -> Result<(), CoreError> {
        debug_assert!(ticket.is_held(), "token refresh requires the serializer");
        let Some(current) = self.tokens.load_full() else {
            return self.login(ticket, client).await;
        };
        if !current.is_due(now) {
            return Ok(());
        }

        debug!(refresh_at = %current.refresh_at(), "access token due for refresh");
        match client.refresh(&current.refresh_token).await {
            Ok(tokens) => {
                info!(refresh_at = %tokens.refresh_at(), "access token refreshed");
                self.tokens.store(Some(Arc::new(tokens)));
                Ok(())
            }
            Err(e) if e.is_auth_error() => {
                warn!(error = %e, "refresh token rejected, logging in again");
                self.tokens.store(None);
                client.clear_access_token();
                self.login(ticket, client).await
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("username", &self.credentials.username)
            .field("logged_in", &self.tokens.load().is_some())
            .finish_non_exhaustive()
    }
}
