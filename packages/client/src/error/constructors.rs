use super::types::{BoxError, Error, Kind};

/// Creates an `Error` for a builder error.
pub fn builder<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Builder).with(e.into())
}

/// Creates an `Error` for a failed host name lookup.
pub fn dns<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Dns).with(e.into())
}

/// Creates an `Error` for a failed socket connect, proxy handshake or tunnel.
pub fn connect<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Connect).with(e.into())
}

/// Creates an `Error` for a failed TLS handshake.
pub fn tls<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Tls).with(e.into())
}

pub fn protocol<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Protocol).with(e.into())
}

pub fn stream<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Stream).with(e.into())
}

pub fn timeout<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Timeout).with(e.into())
}

pub fn canceled() -> Error {
    Error::new(Kind::Canceled)
}

/// Folds every per-route failure into a single error.
pub fn route_exhausted(failures: Vec<Error>) -> Error {
    Error::new(Kind::RouteExhausted).with_failures(failures)
}
