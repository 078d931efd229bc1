//! Core HTTP client
//!
//! An [`HttpClient`] owns the state every call shares: the connection pool,
//! the route database, the dispatcher and the network collaborators.

use std::fmt;
use std::sync::Arc;

use url::Url;

use super::configuration::HttpClientBuilder;
use super::stats::ClientStats;
use crate::call::{CancelSignal, Call, Dispatcher};
use crate::config::HttpConfig;
use crate::connect::SocketFactory;
use crate::connection::ConnectionPool;
use crate::dns::Dns;
use crate::error::{self, Result};
use crate::event::{EventListener, EventListenerFactory};
use crate::exchange::{
    ConnectSettings, ExchangeCodec, ExchangeFinder, FastFallbackExchangeFinder, RoutePlanner,
    SequentialExchangeFinder,
};
use crate::http::HttpRequest;
use crate::protocol::Protocol;
use crate::proxy::{Proxy, ProxySelector};
use crate::route::{Address, RouteDatabase};
use crate::tls::TlsProvider;

/// HTTP client with connection pooling and route failover.
///
/// Cloning is cheap; clones share the pool, route database and dispatcher.
#[derive(Clone)]
pub struct HttpClient {
    shared: Arc<ClientShared>,
}

pub(crate) struct ClientShared {
    pub(crate) config: HttpConfig,
    pub(crate) pool: ConnectionPool,
    pub(crate) route_database: Arc<RouteDatabase>,
    pub(crate) dispatcher: Dispatcher,
    pub(crate) dns: Arc<dyn Dns>,
    pub(crate) socket_factory: Arc<dyn SocketFactory>,
    pub(crate) tls: Option<Arc<dyn TlsProvider>>,
    pub(crate) proxy: Option<Proxy>,
    pub(crate) proxy_selector: Arc<dyn ProxySelector>,
    pub(crate) codec: Arc<dyn ExchangeCodec>,
    pub(crate) event_listener_factory: Arc<dyn EventListenerFactory>,
    pub(crate) stats: Arc<ClientStats>,
}

impl HttpClient {
    #[must_use]
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::new()
    }

    pub(crate) fn from_shared(shared: ClientShared) -> Self {
        Self {
            shared: Arc::new(shared),
        }
    }

    #[must_use]
    pub fn config(&self) -> &HttpConfig {
        &self.shared.config
    }

    #[must_use]
    pub fn connection_pool(&self) -> &ConnectionPool {
        &self.shared.pool
    }

    #[must_use]
    pub fn route_database(&self) -> &Arc<RouteDatabase> {
        &self.shared.route_database
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.shared.dispatcher
    }

    #[must_use]
    pub fn stats(&self) -> &Arc<ClientStats> {
        &self.shared.stats
    }

    pub(crate) fn codec(&self) -> &Arc<dyn ExchangeCodec> {
        &self.shared.codec
    }

    pub(crate) fn event_listener_factory(&self) -> &Arc<dyn EventListenerFactory> {
        &self.shared.event_listener_factory
    }

    /// Prepares `request` for execution.
    #[must_use]
    pub fn new_call(&self, request: HttpRequest) -> Call {
        Call::new(self.clone(), request)
    }

    /// The address a request to `url` would use.
    ///
    /// # Errors
    ///
    /// Returns a builder error, before any I/O, for a non-HTTP scheme, a
    /// missing host, `https` without a TLS provider, or `https` with
    /// prior-knowledge HTTP/2.
    pub fn address_for(&self, url: &Url) -> Result<Address> {
        let shared = &self.shared;
        let https = match url.scheme() {
            "https" => true,
            "http" => false,
            other => return Err(error::builder(format!("unsupported scheme: {other}"))),
        };
        let Some(host) = url.host_str() else {
            return Err(error::builder(format!("{url} has no host")));
        };
        let port = url
            .port_or_known_default()
            .ok_or_else(|| error::builder(format!("{url} has no port")))?;

        let mut address = Address::new(host, port)
            .with_dns(Arc::clone(&shared.dns))
            .with_socket_factory(Arc::clone(&shared.socket_factory))
            .with_protocols(shared.config.protocols.clone())
            .with_proxy(shared.proxy.clone())
            .with_proxy_selector(Arc::clone(&shared.proxy_selector));

        if https {
            if shared.config.protocols.contains(&Protocol::H2PriorKnowledge) {
                return Err(error::builder("prior-knowledge HTTP/2 cannot be used with https"));
            }
            let Some(tls) = &shared.tls else {
                return Err(error::builder("https requires a TLS provider"));
            };
            address = address.with_tls(Arc::clone(tls));
        }
        Ok(address)
    }

    /// Creates the finder a call uses to obtain exchanges for `address`.
    #[must_use]
    pub fn new_exchange_finder(
        &self,
        address: Address,
        events: Arc<dyn EventListener>,
        cancel: CancelSignal,
    ) -> Box<dyn ExchangeFinder> {
        let config = &self.shared.config;
        let planner = RoutePlanner::new(
            address,
            self.shared.pool.clone(),
            Arc::clone(&self.shared.route_database),
            events,
            Arc::clone(&self.shared.stats),
            ConnectSettings::from_config(config),
            config.fast_fallback,
        );

        if config.fast_fallback {
            Box::new(FastFallbackExchangeFinder::new(
                planner,
                config.retry_on_connection_failure,
                cancel,
                config.fast_fallback_delay,
                Arc::clone(&self.shared.stats),
            ))
        } else {
            Box::new(SequentialExchangeFinder::new(
                planner,
                config.retry_on_connection_failure,
                cancel,
            ))
        }
    }

    /// Cancels every call and closes every pooled connection.
    pub fn shutdown(&self) {
        tracing::debug!(target: "hopwire::client", "shutting down");
        self.shared.dispatcher.cancel_all();
        self.shared.pool.evict_all();
    }
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.shared.config)
            .field("pool", &self.shared.pool)
            .field("dispatcher", &self.shared.dispatcher)
            .field("proxy", &self.shared.proxy)
            .field("tls", &self.shared.tls.is_some())
            .finish()
    }
}
