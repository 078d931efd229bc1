//! Boundary to the protocol codec that moves bytes for one exchange

use std::io;

use futures::future::BoxFuture;

use super::lease::Exchange;
use crate::http::{HttpRequest, HttpResponse};

/// Failure on a single stream of an established connection.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The peer refused the stream before processing it (HTTP/2
    /// `REFUSED_STREAM`).
    #[error("stream refused by peer")]
    RefusedStream,
    /// The peer is shutting the connection down (HTTP/2 `GOAWAY`) or the
    /// connection is already closed.
    #[error("connection shutdown")]
    ConnectionShutdown,
    #[error("stream I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("stream canceled")]
    Canceled,
}

impl StreamError {
    /// Whether the request may be sent again, on this connection or
    /// another.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StreamError::RefusedStream | StreamError::ConnectionShutdown | StreamError::Io(_)
        )
    }
}

/// Writes a request and reads its response over a leased stream.
///
/// Implementations own the wire format. They reach the socket through
/// [`Exchange::lock_io`] and report server stream limits through
/// [`RealConnection::set_allocation_limit`](crate::connection::RealConnection::set_allocation_limit).
pub trait ExchangeCodec: Send + Sync + 'static {
    fn exchange<'a>(
        &'a self,
        exchange: &'a Exchange,
        request: &'a HttpRequest,
    ) -> BoxFuture<'a, Result<HttpResponse, StreamError>>;
}

/// Codec used when none is configured. Every exchange fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredCodec;

impl ExchangeCodec for UnconfiguredCodec {
    fn exchange<'a>(
        &'a self,
        _exchange: &'a Exchange,
        _request: &'a HttpRequest,
    ) -> BoxFuture<'a, Result<HttpResponse, StreamError>> {
        Box::pin(async { Err(StreamError::Protocol("no exchange codec configured".into())) })
    }
}
