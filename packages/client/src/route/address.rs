use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use once_cell::sync::Lazy;
use url::Url;

use crate::connect::{SocketFactory, TcpSocketFactory};
use crate::dns::{Dns, SystemDns};
use crate::protocol::Protocol;
use crate::proxy::{DirectProxySelector, Proxy, ProxySelector};
use crate::tls::TlsProvider;

static DEFAULT_DNS: Lazy<Arc<dyn Dns>> = Lazy::new(|| Arc::new(SystemDns));
static DEFAULT_SOCKET_FACTORY: Lazy<Arc<dyn SocketFactory>> =
    Lazy::new(|| Arc::new(TcpSocketFactory::default()));
static DEFAULT_PROXY_SELECTOR: Lazy<Arc<dyn ProxySelector>> =
    Lazy::new(|| Arc::new(DirectProxySelector));

/// Everything needed to connect to an origin server.
///
/// Two addresses are equal when they name the same host and port and share
/// every collaborator. Collaborators compare by identity, so connections are
/// only pooled together when they were created by the same DNS, socket
/// factory, TLS provider and proxy selector instances.
#[derive(Clone)]
pub struct Address {
    host: String,
    port: u16,
    dns: Arc<dyn Dns>,
    socket_factory: Arc<dyn SocketFactory>,
    tls: Option<Arc<dyn TlsProvider>>,
    protocols: Vec<Protocol>,
    proxy: Option<Proxy>,
    proxy_selector: Arc<dyn ProxySelector>,
}

impl Address {
    /// A cleartext address using the process-wide default collaborators.
    ///
    /// Host names are lowercased; IPv6 literals may be given with or
    /// without brackets.
    #[must_use]
    pub fn new(host: impl AsRef<str>, port: u16) -> Self {
        let host = host
            .as_ref()
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_ascii_lowercase();

        Self {
            host,
            port,
            dns: Arc::clone(&DEFAULT_DNS),
            socket_factory: Arc::clone(&DEFAULT_SOCKET_FACTORY),
            tls: None,
            protocols: vec![Protocol::Http11],
            proxy: None,
            proxy_selector: Arc::clone(&DEFAULT_PROXY_SELECTOR),
        }
    }

    #[must_use]
    pub fn with_dns(mut self, dns: Arc<dyn Dns>) -> Self {
        self.dns = dns;
        self
    }

    #[must_use]
    pub fn with_socket_factory(mut self, socket_factory: Arc<dyn SocketFactory>) -> Self {
        self.socket_factory = socket_factory;
        self
    }

    /// Makes this a TLS address.
    #[must_use]
    pub fn with_tls(mut self, tls: Arc<dyn TlsProvider>) -> Self {
        self.tls = Some(tls);
        self
    }

    #[must_use]
    pub fn with_protocols(mut self, protocols: Vec<Protocol>) -> Self {
        self.protocols = protocols;
        self
    }

    /// Pins a single proxy, bypassing the proxy selector.
    #[must_use]
    pub fn with_proxy(mut self, proxy: Option<Proxy>) -> Self {
        self.proxy = proxy;
        self
    }

    #[must_use]
    pub fn with_proxy_selector(mut self, proxy_selector: Arc<dyn ProxySelector>) -> Self {
        self.proxy_selector = proxy_selector;
        self
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub fn dns(&self) -> &Arc<dyn Dns> {
        &self.dns
    }

    #[must_use]
    pub fn socket_factory(&self) -> &Arc<dyn SocketFactory> {
        &self.socket_factory
    }

    #[must_use]
    pub fn tls(&self) -> Option<&Arc<dyn TlsProvider>> {
        self.tls.as_ref()
    }

    #[must_use]
    pub fn is_tls(&self) -> bool {
        self.tls.is_some()
    }

    #[must_use]
    pub fn protocols(&self) -> &[Protocol] {
        &self.protocols
    }

    #[must_use]
    pub fn proxy(&self) -> Option<&Proxy> {
        self.proxy.as_ref()
    }

    #[must_use]
    pub fn proxy_selector(&self) -> &Arc<dyn ProxySelector> {
        &self.proxy_selector
    }

    #[must_use]
    pub fn scheme(&self) -> &'static str {
        if self.is_tls() { "https" } else { "http" }
    }

    /// `host:port`, with IPv6 literals bracketed.
    #[must_use]
    pub fn authority(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// The origin as a URL, as handed to the proxy selector.
    ///
    /// # Errors
    ///
    /// Returns the parse error if the host is not a valid URL host.
    pub fn url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&format!("{}://{}/", self.scheme(), self.authority()))
    }

    /// Equality on everything but the host name. Connections whose
    /// address matches this way are candidates for coalescing.
    #[must_use]
    pub fn equals_non_host(&self, other: &Address) -> bool {
        self.port == other.port
            && std::ptr::addr_eq(Arc::as_ptr(&self.dns), Arc::as_ptr(&other.dns))
            && std::ptr::addr_eq(
                Arc::as_ptr(&self.socket_factory),
                Arc::as_ptr(&other.socket_factory),
            )
            && match (&self.tls, &other.tls) {
                (None, None) => true,
                (Some(a), Some(b)) => std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)),
                _ => false,
            }
            && self.protocols == other.protocols
            && self.proxy == other.proxy
            && std::ptr::addr_eq(
                Arc::as_ptr(&self.proxy_selector),
                Arc::as_ptr(&other.proxy_selector),
            )
    }
}

fn identity<T: ?Sized>(arc: &Arc<T>) -> usize {
    Arc::as_ptr(arc).cast::<()>() as usize
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.host == other.host && self.equals_non_host(other)
    }
}

impl Eq for Address {}

impl Hash for Address {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.host.hash(state);
        self.port.hash(state);
        identity(&self.dns).hash(state);
        identity(&self.socket_factory).hash(state);
        self.tls.as_ref().map(identity).hash(state);
        self.protocols.hash(state);
        self.proxy.hash(state);
        identity(&self.proxy_selector).hash(state);
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Address")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("tls", &self.is_tls())
            .field("protocols", &self.protocols)
            .field("proxy", &self.proxy)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme(), self.authority())
    }
}
