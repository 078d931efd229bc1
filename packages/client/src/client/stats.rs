//! Client statistics

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Counters shared by every call of one client.
#[derive(Debug)]
pub struct ClientStats {
    /// Calls started
    pub requests_total: AtomicU64,
    /// Calls that produced a response
    pub requests_successful: AtomicU64,
    /// Calls that ended in an error
    pub requests_failed: AtomicU64,
    /// Connections established and pooled
    pub connections_established: AtomicU64,
    /// Route attempts that failed to connect
    pub connect_failures: AtomicU64,
    /// Exchanges served by an already pooled connection
    pub pool_hits: AtomicU64,
    /// Lookups that found no reusable connection
    pub pool_misses: AtomicU64,
    /// Finds that raced more than one route
    pub fast_fallback_races: AtomicU64,
    pub created_at: Instant,
}

impl Default for ClientStats {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientStats {
    #[must_use]
    pub fn new() -> Self {
        Self {
            requests_total: AtomicU64::new(0),
            requests_successful: AtomicU64::new(0),
            requests_failed: AtomicU64::new(0),
            connections_established: AtomicU64::new(0),
            connect_failures: AtomicU64::new(0),
            pool_hits: AtomicU64::new(0),
            pool_misses: AtomicU64::new(0),
            fast_fallback_races: AtomicU64::new(0),
            created_at: Instant::now(),
        }
    }

    pub fn record_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self) {
        self.requests_successful.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connection(&self) {
        self.connections_established.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connect_failure(&self) {
        self.connect_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pool_hit(&self) {
        self.pool_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pool_miss(&self) {
        self.pool_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fast_fallback_race(&self) {
        self.fast_fallback_races.fetch_add(1, Ordering::Relaxed);
    }

    /// Share of started calls that succeeded
    pub fn success_ratio(&self) -> f64 {
        let total = self.requests_total.load(Ordering::Relaxed);
        if total == 0 {
            0.0
        } else {
            let successful = self.requests_successful.load(Ordering::Relaxed);
            // Precision loss acceptable for success rate statistics
            #[allow(clippy::cast_precision_loss)]
            {
                successful as f64 / total as f64
            }
        }
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Create a snapshot of current statistics
    pub fn snapshot(&self) -> ClientStatsSnapshot {
        ClientStatsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            requests_successful: self.requests_successful.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            connections_established: self.connections_established.load(Ordering::Relaxed),
            connect_failures: self.connect_failures.load(Ordering::Relaxed),
            pool_hits: self.pool_hits.load(Ordering::Relaxed),
            pool_misses: self.pool_misses.load(Ordering::Relaxed),
            fast_fallback_races: self.fast_fallback_races.load(Ordering::Relaxed),
            success_ratio: self.success_ratio(),
            age: self.age(),
        }
    }
}

/// Snapshot of client statistics at a point in time
#[derive(Debug, Clone)]
pub struct ClientStatsSnapshot {
    pub requests_total: u64,
    pub requests_successful: u64,
    pub requests_failed: u64,
    pub connections_established: u64,
    pub connect_failures: u64,
    pub pool_hits: u64,
    pub pool_misses: u64,
    pub fast_fallback_races: u64,
    pub success_ratio: f64,
    pub age: Duration,
}
