//! Builder methods for [`HttpConfig`]

use std::time::Duration;

use super::types::HttpConfig;
use crate::protocol::Protocol;

impl HttpConfig {
    /// Set the connect timeout
    ///
    /// Applies to the TCP connect and, separately, to the proxy and TLS
    /// handshakes that follow it.
    ///
    /// # Examples
    /// ```
    /// use std::time::Duration;
    /// use hopwire_client::HttpConfig;
    ///
    /// let config = HttpConfig::default()
    ///     .with_connect_timeout(Duration::from_secs(3));
    /// assert_eq!(config.connect_timeout, Duration::from_secs(3));
    /// ```
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_tcp_nodelay(mut self, nodelay: bool) -> Self {
        self.tcp_nodelay = nodelay;
        self
    }

    #[must_use]
    pub fn with_tcp_keepalive(mut self, keepalive: Option<Duration>) -> Self {
        self.tcp_keepalive = keepalive;
        self
    }

    /// Set the maximum number of idle pooled connections
    ///
    /// Zero disables pooling: connections are closed as soon as their last
    /// stream is released.
    #[must_use]
    pub fn with_pool_max_idle(mut self, max_idle: usize) -> Self {
        self.pool_max_idle = max_idle;
        self
    }

    /// Set how long an idle connection may stay in the pool
    #[must_use]
    pub fn with_pool_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.pool_keep_alive = keep_alive;
        self
    }

    /// Enable or disable racing connection attempts
    ///
    /// # Examples
    /// ```
    /// use hopwire_client::HttpConfig;
    ///
    /// let config = HttpConfig::default().with_fast_fallback(false);
    /// assert!(!config.fast_fallback);
    /// ```
    #[must_use]
    pub fn with_fast_fallback(mut self, enabled: bool) -> Self {
        self.fast_fallback = enabled;
        self
    }

    #[must_use]
    pub fn with_fast_fallback_delay(mut self, delay: Duration) -> Self {
        self.fast_fallback_delay = delay;
        self
    }

    #[must_use]
    pub fn with_retry_on_connection_failure(mut self, retry: bool) -> Self {
        self.retry_on_connection_failure = retry;
        self
    }

    /// Set the protocols offered to servers
    ///
    /// The list must contain [`Protocol::Http11`] or be exactly
    /// `[Protocol::H2PriorKnowledge]`. Duplicates are removed.
    #[must_use]
    pub fn with_protocols(mut self, protocols: impl IntoIterator<Item = Protocol>) -> Self {
        let mut deduped = Vec::new();
        for protocol in protocols {
            if !deduped.contains(&protocol) {
                deduped.push(protocol);
            }
        }
        self.protocols = deduped;
        self
    }

    #[must_use]
    pub fn with_http2_max_concurrent_streams(mut self, streams: usize) -> Self {
        self.http2_max_concurrent_streams = streams;
        self
    }

    #[must_use]
    pub fn with_max_requests(mut self, max: usize) -> Self {
        self.max_requests = max;
        self
    }

    #[must_use]
    pub fn with_max_requests_per_host(mut self, max: usize) -> Self {
        self.max_requests_per_host = max;
        self
    }

    #[must_use]
    pub fn with_max_follow_ups(mut self, max: usize) -> Self {
        self.max_follow_ups = max;
        self
    }
}
