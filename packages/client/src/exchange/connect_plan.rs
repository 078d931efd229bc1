//! Connecting a single route

use std::io;
use std::sync::Arc;
use std::time::Duration;

use crate::config::HttpConfig;
use crate::connect::{BoxedIo, socks, tunnel};
use crate::connection::{ConnectionPhase, RealConnection};
use crate::error::{self, Result};
use crate::event::EventListener;
use crate::protocol::Protocol;
use crate::proxy::Proxy;
use crate::route::Route;
use crate::tls::Handshake;

/// Connection parameters copied out of the client configuration.
#[derive(Debug, Clone, Copy)]
pub struct ConnectSettings {
    pub connect_timeout: Duration,
    pub http2_max_concurrent_streams: usize,
}

impl ConnectSettings {
    #[must_use]
    pub fn from_config(config: &HttpConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout,
            http2_max_concurrent_streams: config.http2_max_concurrent_streams,
        }
    }
}

impl Default for ConnectSettings {
    fn default() -> Self {
        Self::from_config(&HttpConfig::default())
    }
}

/// A planned attempt at one route: TCP, then the proxy handshake, then TLS,
/// then protocol selection.
///
/// The plan is consumed by [`connect`](ConnectPlan::connect), which owns
/// every socket it opens. Dropping the future mid-flight closes them, so a
/// canceled attempt never leaks a half-open connection, and reports the
/// attempt as failed with a canceled error.
pub struct ConnectPlan {
    route: Route,
    settings: ConnectSettings,
    events: Arc<dyn EventListener>,
}

impl ConnectPlan {
    #[must_use]
    pub fn new(route: Route, settings: ConnectSettings, events: Arc<dyn EventListener>) -> Self {
        Self {
            route,
            settings,
            events,
        }
    }

    #[must_use]
    pub fn route(&self) -> &Route {
        &self.route
    }

    /// Runs the attempt to completion.
    ///
    /// # Errors
    ///
    /// Every error carries this plan's route. Socket and proxy failures are
    /// [`Kind::Connect`](crate::error::Kind::Connect), handshake failures
    /// [`Kind::Tls`](crate::error::Kind::Tls), deadlines
    /// [`Kind::Timeout`](crate::error::Kind::Timeout), and a negotiated
    /// protocol the address does not accept is
    /// [`Kind::Protocol`](crate::error::Kind::Protocol).
    pub async fn connect(self) -> Result<RealConnection> {
        self.events.connect_start(&self.route);
        tracing::trace!(target: "hopwire::connect", route = %self.route, "connecting");
        let mut pending = PendingAttempt {
            route: self.route.clone(),
            events: Arc::clone(&self.events),
            armed: true,
        };

        let established = self.establish().await;
        pending.armed = false;
        match established {
            Ok((io, protocol, handshake)) => {
                self.events.connect_end(&self.route, protocol);
                tracing::debug!(
                    target: "hopwire::connect",
                    route = %self.route,
                    %protocol,
                    "connected"
                );
                Ok(RealConnection::new(
                    self.route,
                    io,
                    protocol,
                    handshake,
                    self.settings.http2_max_concurrent_streams,
                ))
            }
            Err(err) => {
                let err = err.with_route(self.route.clone());
                self.events.connect_failed(&self.route, &err);
                tracing::debug!(target: "hopwire::connect", route = %self.route, error = %err, "connect failed");
                Err(err)
            }
        }
    }

    async fn establish(&self) -> Result<(BoxedIo, Protocol, Option<Handshake>)> {
        let address = self.route.address();
        let timeout = self.settings.connect_timeout;

        self.trace_phase(ConnectionPhase::Connecting);
        let target = self.route.socket_target();
        let mut io = tokio::time::timeout(timeout, address.socket_factory().connect(&target))
            .await
            .map_err(|_| error::timeout(timed_out("connect")))?
            .map_err(error::connect)?;

        if let Proxy::Socks { .. } = self.route.proxy() {
            io = tokio::time::timeout(timeout, socks::connect(io, address.host(), address.port()))
                .await
                .map_err(|_| error::timeout(timed_out("SOCKS handshake")))?
                .map_err(error::connect)?;
        }

        if self.route.requires_tunnel() {
            let credentials = match self.route.proxy() {
                Proxy::Http { credentials, .. } => credentials.as_ref(),
                _ => None,
            };
            io = tokio::time::timeout(
                timeout,
                tunnel::establish(io, address.host(), address.port(), credentials),
            )
            .await
            .map_err(|_| error::timeout(timed_out("proxy tunnel")))?
            .map_err(error::connect)?;
        }

        let Some(tls) = address.tls() else {
            self.trace_phase(ConnectionPhase::ProtocolNegotiating);
            let protocol = if address.protocols().contains(&Protocol::H2PriorKnowledge) {
                Protocol::H2PriorKnowledge
            } else {
                Protocol::Http11
            };
            return Ok((io, protocol, None));
        };

        self.trace_phase(ConnectionPhase::TlsHandshaking);
        self.events.secure_connect_start(&self.route);
        let (io, handshake) =
            tokio::time::timeout(timeout, tls.handshake(io, address.host(), address.protocols()))
                .await
                .map_err(|_| error::timeout(timed_out("TLS handshake")))?
                .map_err(error::tls)?;
        self.events.secure_connect_end(&self.route, &handshake);
        self.trace_phase(ConnectionPhase::ProtocolNegotiating);

        let protocol = handshake.protocol().unwrap_or(Protocol::Http11);
        if !address.protocols().contains(&protocol) {
            return Err(error::protocol(format!(
                "negotiated {protocol} which {} does not accept",
                address.authority()
            )));
        }
        Ok((io, protocol, Some(handshake)))
    }

    fn trace_phase(&self, phase: ConnectionPhase) {
        tracing::trace!(target: "hopwire::connect", route = %self.route, ?phase);
    }
}

/// Pairs `connect_start` with `connect_failed` when the attempt is dropped
/// before it finishes.
struct PendingAttempt {
    route: Route,
    events: Arc<dyn EventListener>,
    armed: bool,
}

impl Drop for PendingAttempt {
    fn drop(&mut self) {
        if self.armed {
            let err = error::canceled().with_route(self.route.clone());
            self.events.connect_failed(&self.route, &err);
            tracing::trace!(target: "hopwire::connect", route = %self.route, "connect attempt abandoned");
        }
    }
}

fn timed_out(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::TimedOut, format!("{what} timed out"))
}
