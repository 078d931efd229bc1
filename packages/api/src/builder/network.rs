//! Network collaborators: DNS, sockets, TLS, proxies, codec and events

use std::sync::Arc;

use hopwire_client::{
    ConnectionPool, Dns, EventListener, EventListenerFactory, ExchangeCodec, Platform, Proxy,
    ProxySelector, SocketFactory, TlsProvider,
};

use crate::builder::core::ClientBuilder;

impl ClientBuilder {
    /// Resolves host names with `dns` instead of the system resolver.
    pub fn dns(mut self, dns: Arc<dyn Dns>) -> Self {
        self.inner = self.inner.dns(dns);
        self
    }

    pub fn socket_factory(mut self, socket_factory: Arc<dyn SocketFactory>) -> Self {
        self.inner = self.inner.socket_factory(socket_factory);
        self
    }

    pub fn tls_provider(mut self, tls: Arc<dyn TlsProvider>) -> Self {
        self.inner = self.inner.tls_provider(tls);
        self
    }

    /// Chooses the trust roots for the default TLS provider.
    pub fn platform(mut self, platform: Platform) -> Self {
        self.inner = self.inner.platform(platform);
        self
    }

    /// Cleartext only.
    pub fn without_tls(mut self) -> Self {
        self.inner = self.inner.without_tls();
        self
    }

    /// Sends every call through `proxy`. Conflicts with
    /// [`proxy_selector`](Self::proxy_selector).
    pub fn proxy(mut self, proxy: Proxy) -> Self {
        self.inner = self.inner.proxy(proxy);
        self.custom_proxy = true;
        self
    }

    pub fn proxy_selector(mut self, selector: Arc<dyn ProxySelector>) -> Self {
        self.inner = self.inner.proxy_selector(selector);
        self.custom_proxy = true;
        self
    }

    /// The codec that carries requests over leased connections.
    pub fn codec(mut self, codec: Arc<dyn ExchangeCodec>) -> Self {
        self.inner = self.inner.codec(codec);
        self
    }

    pub fn event_listener(mut self, listener: Arc<dyn EventListener>) -> Self {
        self.inner = self.inner.event_listener(listener);
        self.log_events = false;
        self
    }

    pub fn event_listener_factory(mut self, factory: Arc<dyn EventListenerFactory>) -> Self {
        self.inner = self.inner.event_listener_factory(factory);
        self.log_events = false;
        self
    }

    /// Shares the connections of another client.
    pub fn connection_pool(mut self, pool: ConnectionPool) -> Self {
        self.inner = self.inner.connection_pool(pool);
        self
    }
}
