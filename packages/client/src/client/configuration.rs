//! HTTP client configuration and construction
//!
//! Collects the configuration and collaborators, validates them and builds
//! an [`HttpClient`].

use std::sync::Arc;
use std::time::Duration;

use super::core::{ClientShared, HttpClient};
use super::stats::ClientStats;
use crate::call::Dispatcher;
use crate::config::{HttpConfig, Validator};
use crate::connect::{SocketFactory, TcpSocketFactory};
use crate::connection::ConnectionPool;
use crate::dns::{Dns, SystemDns};
use crate::error::{self, Result};
use crate::event::{EventListener, EventListenerFactory, NoopEventListener};
use crate::exchange::{ExchangeCodec, UnconfiguredCodec};
use crate::protocol::Protocol;
use crate::proxy::{DirectProxySelector, Proxy, ProxyError, ProxySelector};
use crate::route::RouteDatabase;
use crate::tls::{Platform, TlsProvider};

/// HTTP client builder for configuration
#[must_use]
pub struct HttpClientBuilder {
    config: HttpConfig,
    dns: Option<Arc<dyn Dns>>,
    socket_factory: Option<Arc<dyn SocketFactory>>,
    tls: Option<Arc<dyn TlsProvider>>,
    platform: Option<Platform>,
    tls_disabled: bool,
    proxy: Option<Proxy>,
    proxy_selector: Option<Arc<dyn ProxySelector>>,
    codec: Option<Arc<dyn ExchangeCodec>>,
    event_listener_factory: Option<Arc<dyn EventListenerFactory>>,
    connection_pool: Option<ConnectionPool>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClientBuilder {
    pub fn new() -> Self {
        Self {
            config: HttpConfig::default(),
            dns: None,
            socket_factory: None,
            tls: None,
            platform: None,
            tls_disabled: false,
            proxy: None,
            proxy_selector: None,
            codec: None,
            event_listener_factory: None,
            connection_pool: None,
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: HttpConfig) -> Self {
        self.config = config;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.config.call_timeout = Some(timeout);
        self
    }

    pub fn tcp_nodelay(mut self, enable: bool) -> Self {
        self.config.tcp_nodelay = enable;
        self
    }

    pub fn tcp_keepalive(mut self, keepalive: Option<Duration>) -> Self {
        self.config.tcp_keepalive = keepalive;
        self
    }

    pub fn pool_max_idle(mut self, max: usize) -> Self {
        self.config.pool_max_idle = max;
        self
    }

    pub fn pool_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.config.pool_keep_alive = keep_alive;
        self
    }

    pub fn fast_fallback(mut self, enable: bool) -> Self {
        self.config.fast_fallback = enable;
        self
    }

    pub fn fast_fallback_delay(mut self, delay: Duration) -> Self {
        self.config.fast_fallback_delay = delay;
        self
    }

    pub fn retry_on_connection_failure(mut self, retry: bool) -> Self {
        self.config.retry_on_connection_failure = retry;
        self
    }

    pub fn protocols(mut self, protocols: impl IntoIterator<Item = Protocol>) -> Self {
        self.config = self.config.with_protocols(protocols);
        self
    }

    pub fn http2_max_concurrent_streams(mut self, streams: usize) -> Self {
        self.config.http2_max_concurrent_streams = streams;
        self
    }

    pub fn max_requests(mut self, max: usize) -> Self {
        self.config.max_requests = max;
        self
    }

    pub fn max_requests_per_host(mut self, max: usize) -> Self {
        self.config.max_requests_per_host = max;
        self
    }

    pub fn max_follow_ups(mut self, max: usize) -> Self {
        self.config.max_follow_ups = max;
        self
    }

    pub fn dns(mut self, dns: Arc<dyn Dns>) -> Self {
        self.dns = Some(dns);
        self
    }

    pub fn socket_factory(mut self, socket_factory: Arc<dyn SocketFactory>) -> Self {
        self.socket_factory = Some(socket_factory);
        self
    }

    /// Uses `tls` for every `https` address instead of the platform default.
    pub fn tls_provider(mut self, tls: Arc<dyn TlsProvider>) -> Self {
        self.tls = Some(tls);
        self.tls_disabled = false;
        self
    }

    /// Builds the default TLS provider from `platform` rather than the
    /// detected one.
    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Builds a cleartext-only client; `https` calls fail before any I/O.
    pub fn without_tls(mut self) -> Self {
        self.tls = None;
        self.tls_disabled = true;
        self
    }

    pub fn proxy(mut self, proxy: Proxy) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn proxy_selector(mut self, selector: Arc<dyn ProxySelector>) -> Self {
        self.proxy_selector = Some(selector);
        self
    }

    pub fn codec(mut self, codec: Arc<dyn ExchangeCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Every call reports to `listener`.
    pub fn event_listener(mut self, listener: Arc<dyn EventListener>) -> Self {
        self.event_listener_factory = Some(Arc::new(listener));
        self
    }

    pub fn event_listener_factory(mut self, factory: Arc<dyn EventListenerFactory>) -> Self {
        self.event_listener_factory = Some(factory);
        self
    }

    /// Shares an existing pool, typically another client's.
    pub fn connection_pool(mut self, pool: ConnectionPool) -> Self {
        self.connection_pool = Some(pool);
        self
    }

    /// Validates the configuration and builds the client.
    ///
    /// # Errors
    ///
    /// Returns a builder error for an invalid configuration, for an
    /// explicit proxy combined with a custom proxy selector, or when the
    /// default TLS provider cannot be created.
    pub fn build(self) -> Result<HttpClient> {
        self.config.validate().map_err(error::builder)?;

        if self.proxy.is_some() && self.proxy_selector.is_some() {
            return Err(error::builder(ProxyError::Conflict));
        }

        let tls = match (self.tls, self.tls_disabled) {
            (Some(tls), _) => Some(tls),
            (None, true) => None,
            (None, false) => {
                let platform = self.platform.unwrap_or_else(Platform::detect);
                let provider = platform.tls_provider().map_err(error::builder)?;
                tracing::debug!(target: "hopwire::client", platform = platform.name(), "using platform TLS provider");
                Some(Arc::new(provider) as Arc<dyn TlsProvider>)
            }
        };

        let config = self.config;
        let socket_factory = self
            .socket_factory
            .unwrap_or_else(|| Arc::new(TcpSocketFactory::from_config(&config)));
        let pool = self
            .connection_pool
            .unwrap_or_else(|| ConnectionPool::from_config(&config));
        let dispatcher = Dispatcher::new(config.max_requests, config.max_requests_per_host);
        let event_listener_factory = self.event_listener_factory.unwrap_or_else(|| {
            let listener: Arc<dyn EventListener> = Arc::new(NoopEventListener);
            Arc::new(listener)
        });

        Ok(HttpClient::from_shared(ClientShared {
            pool,
            route_database: Arc::new(RouteDatabase::new()),
            dispatcher,
            dns: self.dns.unwrap_or_else(|| Arc::new(SystemDns)),
            socket_factory,
            tls,
            proxy: self.proxy,
            proxy_selector: self
                .proxy_selector
                .unwrap_or_else(|| Arc::new(DirectProxySelector)),
            codec: self.codec.unwrap_or_else(|| Arc::new(UnconfiguredCodec)),
            event_listener_factory,
            stats: Arc::new(ClientStats::new()),
            config,
        }))
    }
}

impl std::fmt::Debug for HttpClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClientBuilder")
            .field("config", &self.config)
            .field("proxy", &self.proxy)
            .field("platform", &self.platform)
            .field("tls_disabled", &self.tls_disabled)
            .finish_non_exhaustive()
    }
}
