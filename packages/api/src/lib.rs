//! hopwire public API
//!
//! A fluent facade over the `hopwire_client` engine: pooled connections,
//! route failover and fast fallback, configured through [`ClientBuilder`].
//!
//! ```no_run
//! # async fn run() -> hopwire::Result<()> {
//! let client = hopwire::Client::builder()
//!     .fast_fallback(true)
//!     .log_events(true)
//!     .build()?;
//! let response = client.get("https://example.com/").send().await?;
//! println!("{}", response.status());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(clippy::all)]

pub mod builder;

pub use builder::{Client, ClientBuilder, ContentType, RequestBuilder};

// Re-export the engine types callers work with
pub use hopwire_client::{
    Address, Call, CancelSignal, ClientStats, ClientStatsSnapshot, ConnectionPool, Credentials,
    Dispatcher, Dns, Error, EventListener, EventListenerFactory, Exchange, ExchangeCodec,
    HickoryDns, HttpConfig, HttpRequest, HttpResponse, IntoUrl, Kind, Method, NoProxy,
    PendingResponse, Platform, Protocol, Proxy, ProxyRules, ProxySelector, RealConnection, Result,
    Route, RouteDatabase, SocketFactory, StatusCode, StreamError, SystemDns, TlsProvider,
    TracingEventListenerFactory, Url,
};

/// Main entry point
pub struct Hopwire;

impl Hopwire {
    /// Shorthand for [`Client::builder`]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// A client with default settings.
    ///
    /// # Errors
    ///
    /// Fails if the platform TLS provider cannot be created.
    pub fn client() -> Result<Client> {
        Client::new()
    }
}
