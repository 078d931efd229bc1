//! A stream leased from a pooled connection

use std::fmt;
use std::sync::Arc;

use tokio::sync::MappedMutexGuard;

use crate::connect::BoxedIo;
use crate::connection::{ConnectionPool, RealConnection};
use crate::event::EventListener;
use crate::protocol::Protocol;
use crate::route::Route;

use super::codec::StreamError;

/// One reserved stream on a [`RealConnection`].
///
/// The stream is returned when the exchange is dropped (or
/// [`released`](Exchange::release) explicitly). A connection left with no
/// streams is handed back to the pool, which closes it if it was poisoned.
///
/// An HTTP/1.x exchange released before [`complete`](Exchange::complete)
/// poisons its connection: the request or response was cut off mid-message.
pub struct Exchange {
    connection: Arc<RealConnection>,
    pool: ConnectionPool,
    events: Arc<dyn EventListener>,
    completed: bool,
    released: bool,
}

impl Exchange {
    /// Wraps a stream already reserved on `connection`.
    pub(crate) fn new(
        connection: Arc<RealConnection>,
        pool: ConnectionPool,
        events: Arc<dyn EventListener>,
    ) -> Self {
        events.connection_acquired(&connection);
        Self {
            connection,
            pool,
            events,
            completed: false,
            released: false,
        }
    }

    #[must_use]
    pub fn connection(&self) -> &Arc<RealConnection> {
        &self.connection
    }

    #[must_use]
    pub fn route(&self) -> &Route {
        self.connection.route()
    }

    #[must_use]
    pub fn protocol(&self) -> Protocol {
        self.connection.protocol()
    }

    /// Exclusive access to the connection's socket.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::ConnectionShutdown`] once the connection is
    /// closed.
    pub async fn lock_io(&self) -> Result<MappedMutexGuard<'_, BoxedIo>, StreamError> {
        self.connection.lock_io().await
    }

    /// Records that the response was read in full, leaving the socket at a
    /// message boundary.
    pub fn complete(&mut self) {
        self.completed = true;
    }

    /// Returns the stream now rather than at drop.
    pub fn release(mut self) {
        self.release_stream();
    }

    fn release_stream(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if !self.completed && !self.connection.is_multiplexed() {
            self.connection.no_new_streams();
        }
        if self.connection.release() {
            self.pool.connection_became_idle(&self.connection);
        }
        self.events.connection_released(&self.connection);
    }
}

impl Drop for Exchange {
    fn drop(&mut self) {
        self.release_stream();
    }
}

impl fmt::Debug for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exchange")
            .field("connection", &self.connection.id())
            .field("route", self.connection.route())
            .field("completed", &self.completed)
            .field("released", &self.released)
            .finish()
    }
}
