//! A live connection and its stream accounting

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::MappedMutexGuard;
use tokio::time::Instant;

use crate::connect::BoxedIo;
use crate::exchange::StreamError;
use crate::protocol::Protocol;
use crate::route::{Address, Route};
use crate::tls::Handshake;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Lifecycle of a connection.
///
/// The first three phases belong to a connect attempt; a [`RealConnection`]
/// exists from [`ConnectionPhase::Active`] on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Connecting,
    TlsHandshaking,
    ProtocolNegotiating,
    /// Established with no open streams.
    Active,
    /// At least one stream is open.
    InUse,
    /// No further streams may be started; open streams run to completion.
    NoNewStreams,
    Closed,
}

#[derive(Debug)]
struct StreamState {
    allocation_limit: usize,
    active_streams: usize,
    no_new_streams: bool,
    closed: bool,
    refused_streams: u32,
    route_failures: u32,
    successful_exchanges: u64,
    idle_at: Instant,
}

/// An established socket (and TLS session) to one route.
///
/// Streams are reserved with [`try_acquire`](Self::try_acquire) and returned
/// with [`release`](Self::release); the count never exceeds the allocation
/// limit, which is 1 for HTTP/1.x and the peer's concurrent stream setting
/// for HTTP/2.
pub struct RealConnection {
    id: u64,
    route: Route,
    protocol: Protocol,
    handshake: Option<Handshake>,
    io: tokio::sync::Mutex<Option<BoxedIo>>,
    state: Mutex<StreamState>,
}

impl RealConnection {
    /// Wraps an established stream. `max_concurrent_streams` only applies
    /// to multiplexed protocols.
    #[must_use]
    pub fn new(
        route: Route,
        io: BoxedIo,
        protocol: Protocol,
        handshake: Option<Handshake>,
        max_concurrent_streams: usize,
    ) -> Self {
        let allocation_limit = if protocol.is_multiplexed() {
            max_concurrent_streams.max(1)
        } else {
            1
        };

        Self {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            route,
            protocol,
            handshake,
            io: tokio::sync::Mutex::new(Some(io)),
            state: Mutex::new(StreamState {
                allocation_limit,
                active_streams: 0,
                no_new_streams: false,
                closed: false,
                refused_streams: 0,
                route_failures: 0,
                successful_exchanges: 0,
                idle_at: Instant::now(),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn route(&self) -> &Route {
        &self.route
    }

    #[must_use]
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    #[must_use]
    pub fn handshake(&self) -> Option<&Handshake> {
        self.handshake.as_ref()
    }

    #[must_use]
    pub fn is_multiplexed(&self) -> bool {
        self.protocol.is_multiplexed()
    }

    #[must_use]
    pub fn phase(&self) -> ConnectionPhase {
        let state = self.lock();
        if state.closed {
            ConnectionPhase::Closed
        } else if state.no_new_streams {
            ConnectionPhase::NoNewStreams
        } else if state.active_streams > 0 {
            ConnectionPhase::InUse
        } else {
            ConnectionPhase::Active
        }
    }

    #[must_use]
    pub fn active_streams(&self) -> usize {
        self.lock().active_streams
    }

    #[must_use]
    pub fn allocation_limit(&self) -> usize {
        self.lock().allocation_limit
    }

    /// Applies a new concurrent stream limit advertised by the peer.
    /// Ignored for HTTP/1.x. Streams already open are not affected.
    pub fn set_allocation_limit(&self, limit: usize) {
        if !self.is_multiplexed() {
            return;
        }
        let mut state = self.lock();
        state.allocation_limit = limit.max(1);
        tracing::debug!(target: "hopwire::connection", id = self.id, limit = state.allocation_limit, "allocation limit updated");
    }

    /// When the last stream was released, or when the connection was created.
    #[must_use]
    pub fn idle_at(&self) -> Instant {
        self.lock().idle_at
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    #[must_use]
    pub fn is_no_new_streams(&self) -> bool {
        let state = self.lock();
        state.no_new_streams || state.closed
    }

    #[must_use]
    pub fn successful_exchanges(&self) -> u64 {
        self.lock().successful_exchanges
    }

    /// Whether the connection could carry another stream right now.
    #[must_use]
    pub fn has_capacity(&self) -> bool {
        let state = self.lock();
        !state.closed && !state.no_new_streams && state.active_streams < state.allocation_limit
    }

    /// Whether this connection may carry a request for `address`.
    ///
    /// Capacity is not checked here; [`try_acquire`](Self::try_acquire) does
    /// that atomically. A different host is only accepted on a multiplexed
    /// direct connection whose resolved IP appears in `routes` and whose
    /// certificate covers the host.
    #[must_use]
    pub fn is_eligible(&self, address: &Address, routes: Option<&[Route]>) -> bool {
        if self.is_no_new_streams() {
            return false;
        }

        let own = self.route.address();
        if !own.equals_non_host(address) {
            return false;
        }
        if own.host() == address.host() {
            return true;
        }

        // Coalescing: reuse this connection for another host name.
        if !self.is_multiplexed() || !self.route.proxy().is_direct() {
            return false;
        }
        let Some(routes) = routes else {
            return false;
        };
        let same_ip = routes
            .iter()
            .any(|route| route.proxy().is_direct() && route.target() == self.route.target());
        if !same_ip {
            return false;
        }

        self.handshake
            .as_ref()
            .is_some_and(|handshake| handshake.verifies_host(address.host()))
    }

    /// Reserves a stream if capacity allows.
    pub fn try_acquire(&self) -> bool {
        let mut state = self.lock();
        if state.closed || state.no_new_streams || state.active_streams >= state.allocation_limit {
            return false;
        }
        state.active_streams += 1;
        true
    }

    /// Returns a stream. Reports whether the connection is now idle.
    pub fn release(&self) -> bool {
        let mut state = self.lock();
        state.active_streams = state.active_streams.saturating_sub(1);
        if state.active_streams == 0 {
            state.idle_at = Instant::now();
            true
        } else {
            false
        }
    }

    /// Stops any new stream from starting on this connection.
    pub fn no_new_streams(&self) {
        let mut state = self.lock();
        if !state.no_new_streams {
            state.no_new_streams = true;
            tracing::debug!(target: "hopwire::connection", id = self.id, route = %self.route, "no new streams");
        }
    }

    /// Applies a stream failure to the connection.
    ///
    /// A refused stream is tolerated once on multiplexed connections; the
    /// second refusal, any shutdown, and any transport error end new stream
    /// allocation. A canceled HTTP/1.x exchange leaves the socket mid-message,
    /// so it ends new streams too; a canceled HTTP/2 stream does not. The failure counts against the route when it is the
    /// second refusal, or when the connection never completed an exchange.
    pub fn track_failure(&self, error: &StreamError) {
        let mut state = self.lock();
        let (poison, blames_route) = match error {
            StreamError::RefusedStream if self.is_multiplexed() => {
                state.refused_streams += 1;
                let second = state.refused_streams > 1;
                (second, second)
            }
            StreamError::Canceled => (!self.is_multiplexed(), false),
            _ => (true, state.successful_exchanges == 0),
        };
        if blames_route {
            state.route_failures += 1;
        }
        if poison && !state.no_new_streams {
            state.no_new_streams = true;
            tracing::debug!(target: "hopwire::connection", id = self.id, %error, "no new streams after stream failure");
        }
    }

    /// Stream failures that were attributed to this connection's route.
    #[must_use]
    pub fn route_failures(&self) -> u32 {
        self.lock().route_failures
    }

    pub(crate) fn track_success(&self) {
        self.lock().successful_exchanges += 1;
    }

    /// Marks the connection closed if it has no open streams. Used by
    /// eviction so a connection is never closed under an active stream.
    pub(crate) fn retire_if_idle(&self) -> bool {
        let mut state = self.lock();
        if state.active_streams > 0 {
            return false;
        }
        state.closed = true;
        true
    }

    /// Closes the connection and drops its socket.
    ///
    /// If a stream currently holds the socket it is released when that
    /// stream lets go.
    pub fn close(&self) {
        self.lock().closed = true;
        if let Ok(mut io) = self.io.try_lock() {
            io.take();
        }
        tracing::trace!(target: "hopwire::connection", id = self.id, route = %self.route, "connection closed");
    }

    /// Exclusive access to the socket for codec I/O.
    ///
    /// # Errors
    ///
    /// Returns `StreamError::ConnectionShutdown` if the connection has
    /// been closed.
    pub async fn lock_io(&self) -> Result<MappedMutexGuard<'_, BoxedIo>, StreamError> {
        if self.is_closed() {
            return Err(StreamError::ConnectionShutdown);
        }
        let guard = self.io.lock().await;
        tokio::sync::MutexGuard::try_map(guard, Option::as_mut)
            .map_err(|_| StreamError::ConnectionShutdown)
    }

    fn lock(&self) -> MutexGuard<'_, StreamState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for RealConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealConnection")
            .field("id", &self.id)
            .field("route", &self.route)
            .field("protocol", &self.protocol)
            .field("phase", &self.phase())
            .field("active_streams", &self.active_streams())
            .finish()
    }
}
