//! Call lifecycle events
//!
//! Listeners observe a call as it selects proxies, resolves names, connects
//! and acquires connections. They are purely observational: nothing a
//! listener does changes how the call proceeds.

use std::net::IpAddr;
use std::sync::Arc;

use url::Url;

use crate::connection::RealConnection;
use crate::error::Error;
use crate::http::{HttpRequest, HttpResponse};
use crate::protocol::Protocol;
use crate::proxy::Proxy;
use crate::route::Route;
use crate::tls::Handshake;

mod tracing_listener;

pub use tracing_listener::{TracingEventListener, TracingEventListenerFactory};

/// Receives lifecycle callbacks for a single call. Every method defaults to
/// doing nothing.
pub trait EventListener: Send + Sync + 'static {
    fn call_start(&self, _request: &HttpRequest) {}

    fn proxy_select_start(&self, _url: &Url) {}

    fn proxy_select_end(&self, _url: &Url, _proxies: &[Proxy]) {}

    fn dns_start(&self, _host: &str) {}

    fn dns_end(&self, _host: &str, _addresses: &[IpAddr]) {}

    fn connect_start(&self, _route: &Route) {}

    fn secure_connect_start(&self, _route: &Route) {}

    fn secure_connect_end(&self, _route: &Route, _handshake: &Handshake) {}

    fn connect_end(&self, _route: &Route, _protocol: Protocol) {}

    fn connect_failed(&self, _route: &Route, _error: &Error) {}

    fn connection_acquired(&self, _connection: &RealConnection) {}

    fn connection_released(&self, _connection: &RealConnection) {}

    fn call_end(&self, _response: &HttpResponse) {}

    fn call_failed(&self, _error: &Error) {}

    fn canceled(&self) {}
}

/// Ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventListener;

impl EventListener for NoopEventListener {}

/// Creates the listener for each new call.
pub trait EventListenerFactory: Send + Sync + 'static {
    fn create(&self, request: &HttpRequest) -> Arc<dyn EventListener>;
}

/// Every call shares one listener.
impl EventListenerFactory for Arc<dyn EventListener> {
    fn create(&self, _request: &HttpRequest) -> Arc<dyn EventListener> {
        Arc::clone(self)
    }
}
