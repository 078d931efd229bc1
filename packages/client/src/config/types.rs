//! Core client configuration structure and defaults

use std::time::Duration;

use crate::protocol::Protocol;

/// HTTP client configuration
///
/// Connection pooling, route failover, fast fallback and dispatcher limits.
/// Values are checked by [`Validator::validate`](super::Validator::validate)
/// when a client is built.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Bound on each TCP connect, and separately on each TLS handshake
    pub connect_timeout: Duration,

    /// Bound on a whole call including retries
    pub call_timeout: Option<Duration>,

    /// Enable TCP_NODELAY
    pub tcp_nodelay: bool,

    /// TCP keep-alive duration
    pub tcp_keepalive: Option<Duration>,

    /// Maximum idle connections kept across the whole pool
    pub pool_max_idle: usize,

    /// How long an idle connection may stay pooled
    pub pool_keep_alive: Duration,

    /// Race connection attempts instead of trying routes one at a time
    pub fast_fallback: bool,

    /// Delay between launching successive racing attempts
    pub fast_fallback_delay: Duration,

    /// Retry other routes and connections after recoverable failures
    pub retry_on_connection_failure: bool,

    /// Protocols offered to servers, in preference order
    pub protocols: Vec<Protocol>,

    /// Streams allowed on a multiplexed connection until the peer says otherwise
    pub http2_max_concurrent_streams: usize,

    /// Concurrent asynchronous calls
    pub max_requests: usize,

    /// Concurrent asynchronous calls to a single host
    pub max_requests_per_host: usize,

    /// Attempts a single call may make after its first
    pub max_follow_ups: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            call_timeout: None,
            tcp_nodelay: true,
            tcp_keepalive: Some(Duration::from_secs(60)),

            pool_max_idle: 5,
            pool_keep_alive: Duration::from_secs(5 * 60),

            fast_fallback: true,
            fast_fallback_delay: Duration::from_millis(250),
            retry_on_connection_failure: true,

            protocols: vec![Protocol::Http2, Protocol::Http11],
            http2_max_concurrent_streams: 100,

            max_requests: 64,
            max_requests_per_host: 5,
            max_follow_ups: 20,
        }
    }
}

impl HttpConfig {
    /// Configuration for multiplexed-only cleartext deployments.
    #[must_use]
    pub fn prior_knowledge() -> Self {
        Self {
            protocols: vec![Protocol::H2PriorKnowledge],
            ..Self::default()
        }
    }
}
