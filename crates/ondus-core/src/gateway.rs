// ── Gateway facade ──
//
// Ties the session, serializer, and cache together for one upstream
// account. All upstream work happens through a `Lease`: a held
// serializer ticket with a fresh token.

use std::sync::Arc;

use ondus_api::{OndusClient, TransportConfig};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::actuation::ActuationController;
use crate::cache::ReadThroughCache;
use crate::config::GatewayConfig;
use crate::directory::{ApplianceDirectory, NotificationDirectory};
use crate::error::CoreError;
use crate::serializer::{RequestSerializer, Ticket};
use crate::session::AuthSession;

/// Entry point for consumers.
///
/// Cheaply cloneable via `Arc<GatewayInner>`.
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    config: GatewayConfig,
    client: OndusClient,
    serializer: RequestSerializer,
    session: AuthSession,
    cache: ReadThroughCache,
    latest_notification: watch::Sender<Option<String>>,
}

impl Gateway {
    /// Build a gateway. Does NOT log in -- call [`connect()`](Self::connect)
    /// or let the first [`lease()`](Self::lease) do it.
    pub fn new(config: GatewayConfig) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            timeout: config.timeout,
            ..TransportConfig::default()
        }
        .with_cookie_jar();
        let client = OndusClient::new(config.base_url.clone(), &transport)?;
        Ok(Self::with_client(config, client))
    }

    /// Build a gateway around an existing client.
    pub fn with_client(config: GatewayConfig, client: OndusClient) -> Self {
        let session = AuthSession::new(config.credentials.clone());
        let (latest_notification, _) = watch::channel(None);
        Self {
            inner: Arc::new(GatewayInner {
                config,
                client,
                serializer: RequestSerializer::new(),
                session,
                cache: ReadThroughCache::new(),
                latest_notification,
            }),
        }
    }

    /// Log in eagerly so credential problems surface at startup.
    pub async fn connect(&self) -> Result<(), CoreError> {
        let ticket = self.inner.serializer.acquire().await;
        self.inner.session.login(&ticket, &self.inner.client).await?;
        info!(base_url = %self.inner.config.base_url, "connected to Ondus");
        Ok(())
    }

    /// Wait for exclusive use of the upstream session.
    pub async fn lease(&self) -> Result<Lease, CoreError> {
        let ticket = self.inner.serializer.acquire().await;
        debug!(ticket = ticket.id(), "lease acquired");
        self.inner
            .session
            .ensure_fresh(&ticket, &self.inner.client)
            .await?;
        Ok(Lease {
            gateway: self.clone(),
            ticket,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }

    pub fn session(&self) -> &AuthSession {
        &self.inner.session
    }

    pub fn serializer(&self) -> &RequestSerializer {
        &self.inner.serializer
    }

    pub fn cache(&self) -> &ReadThroughCache {
        &self.inner.cache
    }

    /// Id of the newest notification seen by the watcher.
    pub fn latest_notification(&self) -> watch::Receiver<Option<String>> {
        self.inner.latest_notification.subscribe()
    }

    pub(crate) fn publish_latest_notification(&self, id: Option<String>) {
        self.inner.latest_notification.send_replace(id);
    }
}

/// Exclusive, authenticated access to the upstream session.
///
/// Dropping the lease hands the session to the next waiter.
pub struct Lease {
    gateway: Gateway,
    ticket: Ticket,
}

impl Lease {
    pub fn ticket(&self) -> &Ticket {
        &self.ticket
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.gateway.inner.config
    }

    pub fn cache(&self) -> &ReadThroughCache {
        &self.gateway.inner.cache
    }

    /// The authenticated client, refreshing the token first if it is due.
    pub(crate) async fn upstream(&self) -> Result<&OndusClient, CoreError> {
        let inner = &self.gateway.inner;
        inner.session.ensure_fresh(&self.ticket, &inner.client).await?;
        Ok(&inner.client)
    }

    pub fn appliances(&self) -> ApplianceDirectory<'_> {
        ApplianceDirectory::new(self)
    }

    pub fn notifications(&self) -> NotificationDirectory<'_> {
        NotificationDirectory::new(self)
    }

    pub fn actuation(&self) -> ActuationController<'_> {
        ActuationController::new(self)
    }

    /// Drop every cached location, appliance, and notification.
    pub fn flush_all(&self) {
        self.appliances().flush();
        self.notifications().flush();
        debug!("cache flushed");
    }
}

impl std::fmt::Debug for Lease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lease").field("ticket", &self.ticket).finish()
    }
}
