use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use url::Url;

use super::{EventListener, EventListenerFactory};
use crate::connection::RealConnection;
use crate::error::Error;
use crate::http::{HttpRequest, HttpResponse};
use crate::protocol::Protocol;
use crate::proxy::Proxy;
use crate::route::Route;
use crate::tls::Handshake;

static NEXT_CALL_ID: AtomicU64 = AtomicU64::new(1);

/// Logs every event at debug level under the `hopwire::events` target.
#[derive(Debug)]
pub struct TracingEventListener {
    call_id: u64,
}

impl Default for TracingEventListener {
    fn default() -> Self {
        Self::new()
    }
}

impl TracingEventListener {
    #[must_use]
    pub fn new() -> Self {
        Self {
            call_id: NEXT_CALL_ID.fetch_add(1, Ordering::Relaxed),
        }
    }
}

/// Gives each call its own [`TracingEventListener`].
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventListenerFactory;

impl EventListenerFactory for TracingEventListenerFactory {
    fn create(&self, _request: &HttpRequest) -> Arc<dyn EventListener> {
        Arc::new(TracingEventListener::new())
    }
}

impl EventListener for TracingEventListener {
    fn call_start(&self, request: &HttpRequest) {
        tracing::debug!(target: "hopwire::events", call = self.call_id, method = %request.method(), url = %request.url(), "callStart");
    }

    fn proxy_select_start(&self, url: &Url) {
        tracing::debug!(target: "hopwire::events", call = self.call_id, %url, "proxySelectStart");
    }

    fn proxy_select_end(&self, url: &Url, proxies: &[Proxy]) {
        tracing::debug!(target: "hopwire::events", call = self.call_id, %url, ?proxies, "proxySelectEnd");
    }

    fn dns_start(&self, host: &str) {
        tracing::debug!(target: "hopwire::events", call = self.call_id, host, "dnsStart");
    }

    fn dns_end(&self, host: &str, addresses: &[IpAddr]) {
        tracing::debug!(target: "hopwire::events", call = self.call_id, host, ?addresses, "dnsEnd");
    }

    fn connect_start(&self, route: &Route) {
        tracing::debug!(target: "hopwire::events", call = self.call_id, %route, "connectStart");
    }

    fn secure_connect_start(&self, route: &Route) {
        tracing::debug!(target: "hopwire::events", call = self.call_id, %route, "secureConnectStart");
    }

    fn secure_connect_end(&self, route: &Route, handshake: &Handshake) {
        tracing::debug!(
            target: "hopwire::events",
            call = self.call_id,
            %route,
            version = handshake.tls_version(),
            cipher = handshake.cipher_suite(),
            "secureConnectEnd"
        );
    }

    fn connect_end(&self, route: &Route, protocol: Protocol) {
        tracing::debug!(target: "hopwire::events", call = self.call_id, %route, %protocol, "connectEnd");
    }

    fn connect_failed(&self, route: &Route, error: &Error) {
        tracing::debug!(target: "hopwire::events", call = self.call_id, %route, %error, "connectFailed");
    }

    fn connection_acquired(&self, connection: &RealConnection) {
        tracing::debug!(target: "hopwire::events", call = self.call_id, connection = connection.id(), route = %connection.route(), "connectionAcquired");
    }

    fn connection_released(&self, connection: &RealConnection) {
        tracing::debug!(target: "hopwire::events", call = self.call_id, connection = connection.id(), "connectionReleased");
    }

    fn call_end(&self, response: &HttpResponse) {
        tracing::debug!(target: "hopwire::events", call = self.call_id, status = %response.status(), "callEnd");
    }

    fn call_failed(&self, error: &Error) {
        tracing::debug!(target: "hopwire::events", call = self.call_id, %error, "callFailed");
    }

    fn canceled(&self) {
        tracing::debug!(target: "hopwire::events", call = self.call_id, "canceled");
    }
}
