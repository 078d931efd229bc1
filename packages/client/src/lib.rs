//! # hopwire client engine
//!
//! Connection and route management for an HTTP client: the part that
//! decides which physical connection carries a request.
//!
//! ## Features
//!
//! - **Route selection** across proxies and resolved addresses, with
//!   recently failed routes tried last
//! - **Connection pooling** with keep-alive eviction and HTTP/2 stream
//!   accounting
//! - **Connection coalescing** for HTTP/2 when the certificate and IP allow
//! - **Fast fallback** racing routes with a staggered start
//! - **Rustls TLS** with native or webpki roots, ALPN negotiation
//! - **Call dispatching** with global and per-host concurrency limits
//!
//! Wire framing is delegated to an [`ExchangeCodec`].
//!
//! ## Usage
//!
//! ```no_run
//! use hopwire_client::{HttpClient, HttpRequest};
//!
//! # async fn run() -> hopwire_client::Result<()> {
//! let client = HttpClient::builder().fast_fallback(true).build()?;
//! let call = client.new_call(HttpRequest::get("https://example.com/")?);
//! let response = call.execute().await?;
//! println!("{} over {}", response.status(), response.protocol());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(clippy::all)]

pub mod call;
pub mod client;
pub mod config;
pub mod connect;
pub mod connection;
pub mod dns;
pub mod error;
pub mod event;
pub mod exchange;
pub mod http;
pub mod protocol;
pub mod proxy;
pub mod route;
pub mod tls;

pub use call::{Call, CancelSignal, Dispatcher, PendingResponse};
pub use client::{ClientStats, ClientStatsSnapshot, HttpClient, HttpClientBuilder};
pub use config::{ConfigurationError, HttpConfig};
pub use connect::{BoxedIo, SocketFactory, TcpSocketFactory};
pub use connection::{ConnectionPhase, ConnectionPool, RealConnection};
pub use dns::{Dns, DnsError, HickoryDns, SystemDns};
pub use error::{Error, Kind, Result};
pub use event::{
    EventListener, EventListenerFactory, NoopEventListener, TracingEventListener,
    TracingEventListenerFactory,
};
pub use exchange::{
    Exchange, ExchangeCodec, ExchangeFinder, FastFallbackExchangeFinder,
    SequentialExchangeFinder, StreamError,
};
pub use http::{HttpRequest, HttpResponse, IntoUrl};
pub use protocol::Protocol;
pub use proxy::{Credentials, NoProxy, Proxy, ProxyError, ProxyRules, ProxySelector};
pub use route::{Address, Route, RouteDatabase, RouteSelector, Selection, SocketTarget};
pub use tls::{Handshake, Platform, RustlsProvider, TlsError, TlsProvider};

pub use ::http::{Method, StatusCode};
pub use url::Url;
