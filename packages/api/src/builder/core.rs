//! Core `ClientBuilder` and `Client` types
//!
//! The builder wraps the engine's [`HttpClientBuilder`] and adds facade
//! conveniences: tracing of call events and proxy rules from the
//! environment.

use std::sync::Arc;
use std::time::Duration;

use hopwire_client::{
    ClientStats, ConnectionPool, Dispatcher, HttpClient, HttpClientBuilder, HttpConfig, Protocol,
    ProxyRules, Result, RouteDatabase, TracingEventListenerFactory, error,
};

/// Builds a [`Client`].
#[must_use]
pub struct ClientBuilder {
    pub(crate) inner: HttpClientBuilder,
    pub(crate) log_events: bool,
    pub(crate) proxy_from_env: bool,
    pub(crate) custom_proxy: bool,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            inner: HttpClientBuilder::new(),
            log_events: false,
            proxy_from_env: false,
            custom_proxy: false,
        }
    }

    /// Starts from an existing configuration.
    pub fn config(mut self, config: HttpConfig) -> Self {
        self.inner = self.inner.config(config);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.inner = self.inner.connect_timeout(timeout);
        self
    }

    /// Bounds each call end to end, retries included.
    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.inner = self.inner.call_timeout(timeout);
        self
    }

    pub fn tcp_nodelay(mut self, enable: bool) -> Self {
        self.inner = self.inner.tcp_nodelay(enable);
        self
    }

    pub fn tcp_keepalive(mut self, keepalive: Option<Duration>) -> Self {
        self.inner = self.inner.tcp_keepalive(keepalive);
        self
    }

    pub fn pool_max_idle(mut self, max: usize) -> Self {
        self.inner = self.inner.pool_max_idle(max);
        self
    }

    pub fn pool_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.inner = self.inner.pool_keep_alive(keep_alive);
        self
    }

    /// Races routes instead of trying them one by one.
    pub fn fast_fallback(mut self, enable: bool) -> Self {
        self.inner = self.inner.fast_fallback(enable);
        self
    }

    pub fn fast_fallback_delay(mut self, delay: Duration) -> Self {
        self.inner = self.inner.fast_fallback_delay(delay);
        self
    }

    pub fn retry_on_connection_failure(mut self, retry: bool) -> Self {
        self.inner = self.inner.retry_on_connection_failure(retry);
        self
    }

    pub fn protocols(mut self, protocols: impl IntoIterator<Item = Protocol>) -> Self {
        self.inner = self.inner.protocols(protocols);
        self
    }

    pub fn http2_max_concurrent_streams(mut self, streams: usize) -> Self {
        self.inner = self.inner.http2_max_concurrent_streams(streams);
        self
    }

    pub fn max_requests(mut self, max: usize) -> Self {
        self.inner = self.inner.max_requests(max);
        self
    }

    pub fn max_requests_per_host(mut self, max: usize) -> Self {
        self.inner = self.inner.max_requests_per_host(max);
        self
    }

    pub fn max_follow_ups(mut self, max: usize) -> Self {
        self.inner = self.inner.max_follow_ups(max);
        self
    }

    /// Logs every call event through `tracing` at debug level.
    pub fn log_events(mut self, enable: bool) -> Self {
        self.log_events = enable;
        self
    }

    /// Reads `HTTP_PROXY`, `HTTPS_PROXY`, `ALL_PROXY` and `NO_PROXY` at
    /// build time.
    pub fn proxy_from_env(mut self, enable: bool) -> Self {
        self.proxy_from_env = enable;
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns a builder error for invalid settings, conflicting proxy
    /// configuration, malformed proxy environment variables, or when no
    /// TLS provider can be created.
    pub fn build(self) -> Result<Client> {
        let mut inner = self.inner;

        if self.log_events {
            inner = inner.event_listener_factory(Arc::new(TracingEventListenerFactory));
        }

        if self.proxy_from_env && !self.custom_proxy {
            let rules = ProxyRules::from_env().map_err(error::builder)?;
            if !rules.is_empty() {
                tracing::debug!(target: "hopwire::client", "using proxy rules from the environment");
                inner = inner.proxy_selector(Arc::new(rules));
            }
        }

        Ok(Client {
            inner: inner.build()?,
        })
    }
}

/// A configured HTTP client.
///
/// Cloning is cheap and clones share connections, route history and the
/// dispatcher.
#[derive(Clone, Debug)]
pub struct Client {
    pub(crate) inner: HttpClient,
}

impl Client {
    /// Builds a client with default settings.
    ///
    /// # Errors
    ///
    /// Fails if the platform TLS provider cannot be created.
    pub fn new() -> Result<Self> {
        ClientBuilder::new().build()
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// The engine client underneath.
    #[must_use]
    pub fn engine(&self) -> &HttpClient {
        &self.inner
    }

    #[must_use]
    pub fn config(&self) -> &HttpConfig {
        self.inner.config()
    }

    #[must_use]
    pub fn connection_pool(&self) -> &ConnectionPool {
        self.inner.connection_pool()
    }

    #[must_use]
    pub fn route_database(&self) -> &Arc<RouteDatabase> {
        self.inner.route_database()
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        self.inner.dispatcher()
    }

    #[must_use]
    pub fn stats(&self) -> &Arc<ClientStats> {
        self.inner.stats()
    }

    /// Cancels all calls and closes pooled connections.
    pub fn shutdown(&self) {
        self.inner.shutdown();
    }
}

impl From<HttpClient> for Client {
    fn from(inner: HttpClient) -> Self {
        Self { inner }
    }
}
