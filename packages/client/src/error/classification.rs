use std::error::Error as StdError;
use std::io;

use super::types::{Error, Kind};
use crate::exchange::StreamError;
use crate::tls::TlsError;

impl Error {
    /// Returns true if the error is from a type Builder.
    #[must_use]
    pub fn is_builder(&self) -> bool {
        matches!(self.inner.kind, Kind::Builder)
    }

    #[must_use]
    pub fn is_dns(&self) -> bool {
        matches!(self.inner.kind, Kind::Dns)
    }

    /// Returns true if the error is related to connect
    #[must_use]
    pub fn is_connect(&self) -> bool {
        matches!(self.inner.kind, Kind::Connect)
    }

    #[must_use]
    pub fn is_tls(&self) -> bool {
        matches!(self.inner.kind, Kind::Tls)
    }

    #[must_use]
    pub fn is_protocol(&self) -> bool {
        matches!(self.inner.kind, Kind::Protocol)
    }

    #[must_use]
    pub fn is_route_exhausted(&self) -> bool {
        matches!(self.inner.kind, Kind::RouteExhausted)
    }

    #[must_use]
    pub fn is_stream(&self) -> bool {
        matches!(self.inner.kind, Kind::Stream)
    }

    #[must_use]
    pub fn is_canceled(&self) -> bool {
        matches!(self.inner.kind, Kind::Canceled)
    }

    /// Returns true if the error is related to a timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        if matches!(self.inner.kind, Kind::Timeout) {
            return true;
        }

        let mut source = self.source();

        while let Some(err) = source {
            if let Some(io) = err.downcast_ref::<io::Error>()
                && io.kind() == io::ErrorKind::TimedOut
            {
                return true;
            }
            source = err.source();
        }

        false
    }

    /// The stream-level cause, when this is a [`Kind::Stream`] error.
    #[must_use]
    pub fn stream_error(&self) -> Option<&StreamError> {
        self.find_source::<StreamError>()
    }

    /// Whether trying another route or connection could succeed where this
    /// attempt failed. Configuration errors, cancellation, certificate
    /// rejections and protocol violations are final.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self.inner.kind {
            Kind::Builder | Kind::Canceled | Kind::Protocol => false,
            Kind::Dns | Kind::Connect | Kind::Timeout | Kind::RouteExhausted => true,
            Kind::Tls => !matches!(
                self.find_source::<TlsError>(),
                Some(TlsError::Certificate(_) | TlsError::InvalidHostname(_))
            ),
            Kind::Stream => self
                .stream_error()
                .is_none_or(StreamError::is_recoverable),
        }
    }

    fn find_source<T: StdError + 'static>(&self) -> Option<&T> {
        let mut source = self
            .inner
            .source
            .as_deref()
            .map(|err| err as &(dyn StdError + 'static));

        while let Some(err) = source {
            if let Some(found) = err.downcast_ref::<T>() {
                return Some(found);
            }
            source = err.source();
        }

        None
    }
}
