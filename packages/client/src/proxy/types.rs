//! Proxy description and parsing

use std::fmt;

use url::Url;

/// How a route reaches the origin server.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Proxy {
    /// Connect straight to the origin.
    Direct,
    /// An HTTP proxy. Cleartext requests are forwarded; TLS requests go
    /// through a `CONNECT` tunnel.
    Http {
        host: String,
        port: u16,
        credentials: Option<Credentials>,
    },
    /// A SOCKS5 proxy; the origin host name is resolved by the proxy.
    Socks { host: String, port: u16 },
}

/// Basic credentials presented to an HTTP proxy.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Proxy parsing errors
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("invalid proxy url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unsupported proxy scheme: {0}")]
    UnsupportedScheme(String),

    #[error("an explicit proxy and a custom proxy selector cannot both be configured")]
    Conflict,
}

impl Proxy {
    /// Parses `http://[user:pass@]host[:port]` or `socks5://host[:port]`.
    ///
    /// A bare `host:port` is treated as an HTTP proxy.
    ///
    /// # Errors
    ///
    /// Returns `ProxyError` if the URL is malformed, has no host, or uses a
    /// scheme other than `http` or `socks5`.
    pub fn parse(spec: &str) -> Result<Proxy, ProxyError> {
        let with_scheme = if spec.contains("://") {
            spec.to_string()
        } else {
            format!("http://{spec}")
        };

        let url = Url::parse(&with_scheme).map_err(|e| ProxyError::InvalidUrl {
            url: spec.to_string(),
            reason: e.to_string(),
        })?;

        let host = match url.host() {
            Some(url::Host::Domain(domain)) => domain.to_ascii_lowercase(),
            Some(url::Host::Ipv4(ip)) => ip.to_string(),
            Some(url::Host::Ipv6(ip)) => ip.to_string(),
            None => {
                return Err(ProxyError::InvalidUrl {
                    url: spec.to_string(),
                    reason: "missing host".to_string(),
                });
            }
        };

        match url.scheme() {
            "http" => {
                let credentials = (!url.username().is_empty()).then(|| Credentials {
                    username: url.username().to_string(),
                    password: url.password().unwrap_or_default().to_string(),
                });
                Ok(Proxy::Http {
                    host,
                    port: url.port().unwrap_or(80),
                    credentials,
                })
            }
            "socks5" | "socks5h" => Ok(Proxy::Socks {
                host,
                port: url.port().unwrap_or(1080),
            }),
            other => Err(ProxyError::UnsupportedScheme(other.to_string())),
        }
    }

    #[must_use]
    pub fn http(host: impl Into<String>, port: u16) -> Proxy {
        Proxy::Http {
            host: host.into().to_ascii_lowercase(),
            port,
            credentials: None,
        }
    }

    #[must_use]
    pub fn socks(host: impl Into<String>, port: u16) -> Proxy {
        Proxy::Socks {
            host: host.into().to_ascii_lowercase(),
            port,
        }
    }

    /// Adds basic credentials to an HTTP proxy; other proxies are returned unchanged.
    #[must_use]
    pub fn with_credentials(self, username: impl Into<String>, password: impl Into<String>) -> Proxy {
        match self {
            Proxy::Http { host, port, .. } => Proxy::Http {
                host,
                port,
                credentials: Some(Credentials {
                    username: username.into(),
                    password: password.into(),
                }),
            },
            other => other,
        }
    }

    #[must_use]
    pub fn is_direct(&self) -> bool {
        matches!(self, Proxy::Direct)
    }

    /// The proxy's own host and port, `None` for [`Proxy::Direct`].
    #[must_use]
    pub fn endpoint(&self) -> Option<(&str, u16)> {
        match self {
            Proxy::Direct => None,
            Proxy::Http { host, port, .. } | Proxy::Socks { host, port } => Some((host, *port)),
        }
    }
}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Proxy::Direct => f.write_str("DIRECT"),
            Proxy::Http { host, port, .. } => write!(f, "HTTP @ {host}:{port}"),
            Proxy::Socks { host, port } => write!(f, "SOCKS @ {host}:{port}"),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
