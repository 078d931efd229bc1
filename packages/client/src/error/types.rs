use std::error::Error as StdError;
use std::fmt;

use crate::route::Route;

/// A Result alias where the Err case is `hopwire_client::Error`.
pub type Result<T> = std::result::Result<T, Error>;

pub(crate) type BoxError = Box<dyn StdError + Send + Sync>;

/// Represents errors that can occur while finding a connection or running a call.
pub struct Error {
    pub(crate) inner: Box<Inner>,
}

pub(crate) struct Inner {
    pub(crate) kind: Kind,
    pub(crate) source: Option<BoxError>,
    pub(crate) route: Option<Route>,
    pub(crate) failures: Vec<Error>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Invalid configuration or request, detected before any I/O
    Builder,
    /// Host name resolution failed or returned nothing
    Dns,
    /// TCP connect, SOCKS handshake or CONNECT tunnel failure
    Connect,
    /// TLS handshake or certificate failure
    Tls,
    /// Protocol violation or unacceptable negotiated protocol
    Protocol,
    /// Every route for an address was attempted and failed
    RouteExhausted,
    /// Failure on a stream of an established connection
    Stream,
    /// The call was canceled
    Canceled,
    /// A connect or call deadline elapsed
    Timeout,
}

impl Error {
    pub(crate) fn new(kind: Kind) -> Error {
        Error {
            inner: Box::new(Inner {
                kind,
                source: None,
                route: None,
                failures: Vec::new(),
            }),
        }
    }

    #[must_use = "Error builder methods return a new Error and should be used"]
    pub(crate) fn with<E: Into<BoxError>>(mut self, source: E) -> Error {
        self.inner.source = Some(source.into());
        self
    }

    /// Attach the route that was being attempted when this error happened.
    #[must_use]
    pub fn with_route(mut self, route: Route) -> Error {
        self.inner.route = Some(route);
        self
    }

    #[must_use]
    pub(crate) fn with_failures(mut self, failures: Vec<Error>) -> Error {
        self.inner.failures = failures;
        self
    }

    #[must_use]
    pub fn kind(&self) -> Kind {
        self.inner.kind
    }

    /// The route this error is attributed to, if any.
    #[must_use]
    pub fn route(&self) -> Option<&Route> {
        self.inner.route.as_ref()
    }

    /// Every per-route failure folded into a [`Kind::RouteExhausted`] error,
    /// in the order the routes were attempted. Empty for other kinds.
    #[must_use]
    pub fn route_failures(&self) -> &[Error] {
        &self.inner.failures
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut f = f.debug_struct("hopwire::Error");

        f.field("kind", &self.inner.kind);

        if let Some(ref source) = self.inner.source {
            f.field("source", source);
        }

        if let Some(ref route) = self.inner.route {
            f.field("route", route);
        }

        if !self.inner.failures.is_empty() {
            f.field("failures", &self.inner.failures);
        }

        f.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.kind {
            Kind::Builder => f.write_str("builder error")?,
            Kind::Dns => f.write_str("dns error")?,
            Kind::Connect => f.write_str("error connecting")?,
            Kind::Tls => f.write_str("tls error")?,
            Kind::Protocol => f.write_str("protocol error")?,
            Kind::RouteExhausted => {
                write!(f, "all routes failed ({} attempted)", self.inner.failures.len())?;
            }
            Kind::Stream => f.write_str("stream error")?,
            Kind::Canceled => f.write_str("canceled")?,
            Kind::Timeout => f.write_str("timed out")?,
        }

        if let Some(ref route) = self.inner.route {
            write!(f, " on {route}")?;
        }

        if let Some(ref source) = self.inner.source {
            write!(f, ": {source}")?;
        }

        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        if let Some(ref source) = self.inner.source {
            return Some(&**source as &(dyn StdError + 'static));
        }
        self.inner
            .failures
            .first()
            .map(|err| err as &(dyn StdError + 'static))
    }
}
