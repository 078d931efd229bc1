use std::fmt;
use std::net::SocketAddr;

use super::address::Address;
use crate::proxy::Proxy;

/// Where a socket should be opened.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SocketTarget {
    Resolved(SocketAddr),
    /// A name resolved by someone else, such as a SOCKS proxy.
    Unresolved { host: String, port: u16 },
}

impl fmt::Display for SocketTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocketTarget::Resolved(addr) => write!(f, "{addr}"),
            SocketTarget::Unresolved { host, port } if host.contains(':') => {
                write!(f, "[{host}]:{port}")
            }
            SocketTarget::Unresolved { host, port } => write!(f, "{host}:{port}"),
        }
    }
}

/// One concrete way to reach an address.
///
/// For direct and HTTP proxy routes the target is the resolved socket
/// address of the origin or proxy. For SOCKS routes it is the unresolved
/// origin, and the socket is opened to the proxy itself.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Route {
    address: Address,
    proxy: Proxy,
    target: SocketTarget,
}

impl Route {
    #[must_use]
    pub fn new(address: Address, proxy: Proxy, target: SocketTarget) -> Self {
        Self {
            address,
            proxy,
            target,
        }
    }

    #[must_use]
    pub fn address(&self) -> &Address {
        &self.address
    }

    #[must_use]
    pub fn proxy(&self) -> &Proxy {
        &self.proxy
    }

    #[must_use]
    pub fn target(&self) -> &SocketTarget {
        &self.target
    }

    /// Whether TLS must be tunnelled through an HTTP proxy with `CONNECT`.
    #[must_use]
    pub fn requires_tunnel(&self) -> bool {
        self.address.is_tls() && matches!(self.proxy, Proxy::Http { .. })
    }

    /// The endpoint the socket factory should connect to.
    #[must_use]
    pub fn socket_target(&self) -> SocketTarget {
        match &self.proxy {
            Proxy::Socks { host, port } => match host.parse() {
                Ok(ip) => SocketTarget::Resolved(SocketAddr::new(ip, *port)),
                Err(_) => SocketTarget::Unresolved {
                    host: host.clone(),
                    port: *port,
                },
            },
            Proxy::Direct | Proxy::Http { .. } => self.target.clone(),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.proxy {
            Proxy::Direct => write!(f, "{} at {}", self.address.authority(), self.target),
            _ => write!(
                f,
                "{} via {} at {}",
                self.address.authority(),
                self.proxy,
                self.target
            ),
        }
    }
}
