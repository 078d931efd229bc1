//! Connection pool with keep-alive eviction
//!
//! Connections are grouped by [`Address`]. Every stream reservation made
//! through the pool happens under the pool lock, so eviction can safely
//! retire any connection it sees with zero active streams.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use hashbrown::HashMap;
use tokio::sync::Notify;
use tokio::time::Instant;

use super::real_connection::RealConnection;
use crate::config::HttpConfig;
use crate::route::{Address, Route};

/// Shared pool of established connections.
///
/// Cloning is cheap; clones share the same connections. Idle connections
/// are closed after `keep_alive`, and at most `max_idle` idle connections
/// are kept, evicting the longest idle first.
#[derive(Clone)]
pub struct ConnectionPool {
    shared: Arc<PoolShared>,
}

struct PoolShared {
    max_idle: usize,
    keep_alive: Duration,
    state: Mutex<PoolState>,
    wakeup: Arc<Notify>,
}

#[derive(Default)]
struct PoolState {
    connections: HashMap<Address, Vec<Arc<RealConnection>>>,
    cleanup_running: bool,
}

impl ConnectionPool {
    #[must_use]
    pub fn new(max_idle: usize, keep_alive: Duration) -> Self {
        Self {
            shared: Arc::new(PoolShared {
                max_idle,
                keep_alive,
                state: Mutex::new(PoolState::default()),
                wakeup: Arc::new(Notify::new()),
            }),
        }
    }

    #[must_use]
    pub fn from_config(config: &HttpConfig) -> Self {
        Self::new(config.pool_max_idle, config.pool_keep_alive)
    }

    #[must_use]
    pub fn max_idle(&self) -> usize {
        self.shared.max_idle
    }

    #[must_use]
    pub fn keep_alive(&self) -> Duration {
        self.shared.keep_alive
    }

    /// Finds a pooled connection for `address` and reserves a stream on it.
    ///
    /// Connections to the same address are preferred. When `routes` is
    /// given, multiplexed connections to other hosts are also considered
    /// for coalescing. With `require_multiplexed`, only HTTP/2 connections
    /// qualify.
    pub fn get(
        &self,
        address: &Address,
        routes: Option<&[Route]>,
        require_multiplexed: bool,
    ) -> Option<Arc<RealConnection>> {
        let state = self.shared.lock();
        let found = find_and_acquire(&state, address, routes, require_multiplexed);
        drop(state);

        if let Some(conn) = &found {
            tracing::trace!(
                target: "hopwire::pool",
                id = conn.id(),
                %address,
                coalesced = conn.route().address().host() != address.host(),
                "reusing pooled connection"
            );
        }
        found
    }

    /// Adds a freshly connected connection and reserves a stream for the
    /// caller.
    ///
    /// If the connection is multiplexed and an equivalent one appeared in the
    /// pool while it was connecting, the existing connection is used and the
    /// new one closed. The returned connection is always in the pool.
    pub fn register(
        &self,
        conn: RealConnection,
        routes: Option<&[Route]>,
    ) -> Arc<RealConnection> {
        let conn = Arc::new(conn);
        let mut state = self.shared.lock();

        if conn.is_multiplexed()
            && let Some(existing) =
                find_and_acquire(&state, conn.route().address(), routes, true)
        {
            drop(state);
            tracing::debug!(
                target: "hopwire::pool",
                id = existing.id(),
                discarded = conn.id(),
                "found multiplexed connection while connecting, closing the new one"
            );
            conn.close();
            return existing;
        }

        // A fresh connection always has room for its first stream.
        conn.try_acquire();
        state
            .connections
            .entry(conn.route().address().clone())
            .or_default()
            .push(Arc::clone(&conn));
        self.ensure_cleanup(&mut state);
        drop(state);

        tracing::debug!(
            target: "hopwire::pool",
            id = conn.id(),
            route = %conn.route(),
            protocol = %conn.protocol(),
            "connection pooled"
        );
        conn
    }

    /// Called when `conn` has no open streams left. Closes and removes it if
    /// it can take no new streams or pooling is disabled; otherwise it stays
    /// for reuse and the eviction task is told to recheck.
    ///
    /// Returns true if the connection was removed.
    pub fn connection_became_idle(&self, conn: &Arc<RealConnection>) -> bool {
        if conn.is_no_new_streams() || self.shared.max_idle == 0 {
            let removed = self.remove(conn);
            conn.close();
            tracing::debug!(target: "hopwire::pool", id = conn.id(), "closed idle connection");
            return removed;
        }
        self.shared.wakeup.notify_one();
        false
    }

    /// Performs one eviction pass at `now`.
    ///
    /// Closes the longest idle connection if it exceeded the keep-alive or
    /// the idle limit is exceeded. Returns how long to wait before the next
    /// pass: zero right after an eviction, `None` when the pool is empty.
    pub fn cleanup(&self, now: Instant) -> Option<Duration> {
        self.cleanup_inner(now, false)
    }

    fn cleanup_inner(&self, now: Instant, from_task: bool) -> Option<Duration> {
        let mut state = self.shared.lock();

        let mut in_use = 0usize;
        let mut idle = 0usize;
        let mut longest_idle = Duration::ZERO;
        let mut candidate: Option<Arc<RealConnection>> = None;

        for conn in state.connections.values().flatten() {
            if conn.active_streams() > 0 {
                in_use += 1;
                continue;
            }
            idle += 1;
            let idle_for = now.saturating_duration_since(conn.idle_at());
            if candidate.is_none() || idle_for > longest_idle {
                longest_idle = idle_for;
                candidate = Some(Arc::clone(conn));
            }
        }

        if let Some(conn) = candidate
            && (longest_idle >= self.shared.keep_alive || idle > self.shared.max_idle)
            && conn.retire_if_idle()
        {
            remove_locked(&mut state, &conn);
            drop(state);
            tracing::debug!(
                target: "hopwire::pool",
                id = conn.id(),
                idle_ms = u64::try_from(longest_idle.as_millis()).unwrap_or(u64::MAX),
                "evicting idle connection"
            );
            conn.close();
            return Some(Duration::ZERO);
        }

        let next = if idle > 0 {
            Some(self.shared.keep_alive.saturating_sub(longest_idle))
        } else if in_use > 0 {
            Some(self.shared.keep_alive)
        } else {
            None
        };

        if next.is_none() && from_task {
            state.cleanup_running = false;
        }
        next
    }

    /// Closes every idle connection and stops new streams on the rest,
    /// which are removed as their streams finish.
    pub fn evict_all(&self) {
        let mut closed = Vec::new();
        {
            let mut state = self.shared.lock();
            for conns in state.connections.values_mut() {
                conns.retain(|conn| {
                    if conn.retire_if_idle() {
                        closed.push(Arc::clone(conn));
                        false
                    } else {
                        conn.no_new_streams();
                        true
                    }
                });
            }
            state.connections.retain(|_, conns| !conns.is_empty());
        }

        for conn in &closed {
            conn.close();
        }
        tracing::debug!(target: "hopwire::pool", closed = closed.len(), "evicted all idle connections");
    }

    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.shared.lock().connections.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn idle_connection_count(&self) -> usize {
        self.shared
            .lock()
            .connections
            .values()
            .flatten()
            .filter(|conn| conn.active_streams() == 0)
            .count()
    }

    /// Snapshot of every pooled connection.
    #[must_use]
    pub fn connections(&self) -> Vec<Arc<RealConnection>> {
        self.shared
            .lock()
            .connections
            .values()
            .flatten()
            .cloned()
            .collect()
    }

    fn remove(&self, conn: &Arc<RealConnection>) -> bool {
        let mut state = self.shared.lock();
        let removed = remove_locked(&mut state, conn);
        if state.connections.is_empty() {
            self.shared.wakeup.notify_one();
        }
        removed
    }

    fn ensure_cleanup(&self, state: &mut PoolState) {
        if state.cleanup_running {
            self.shared.wakeup.notify_one();
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(target: "hopwire::pool", "no tokio runtime, idle connections are only evicted by explicit cleanup");
            return;
        };
        state.cleanup_running = true;
        handle.spawn(run_cleanup(
            Arc::downgrade(&self.shared),
            Arc::clone(&self.shared.wakeup),
        ));
    }
}

impl PoolShared {
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn find_and_acquire(
    state: &PoolState,
    address: &Address,
    routes: Option<&[Route]>,
    require_multiplexed: bool,
) -> Option<Arc<RealConnection>> {
    let usable = |conn: &&Arc<RealConnection>| {
        (!require_multiplexed || conn.is_multiplexed()) && conn.is_eligible(address, routes)
    };

    if let Some(conns) = state.connections.get(address)
        && let Some(conn) = conns.iter().filter(usable).find(|conn| conn.try_acquire())
    {
        return Some(Arc::clone(conn));
    }

    if routes.is_none() {
        return None;
    }
    state
        .connections
        .iter()
        .filter(|(key, _)| *key != address)
        .flat_map(|(_, conns)| conns.iter())
        .filter(|conn| conn.is_multiplexed())
        .filter(usable)
        .find(|conn| conn.try_acquire())
        .cloned()
}

fn remove_locked(state: &mut PoolState, conn: &Arc<RealConnection>) -> bool {
    let key = conn.route().address();
    let Some(conns) = state.connections.get_mut(key) else {
        return false;
    };
    let before = conns.len();
    conns.retain(|pooled| !Arc::ptr_eq(pooled, conn));
    let removed = conns.len() != before;
    if conns.is_empty() {
        state.connections.remove(key);
    }
    removed
}

/// Background eviction loop. Holds only a weak reference between passes so
/// dropping the last pool handle ends the task.
async fn run_cleanup(shared: Weak<PoolShared>, wakeup: Arc<Notify>) {
    tracing::trace!(target: "hopwire::pool", "cleanup task started");
    loop {
        let Some(strong) = shared.upgrade() else {
            return;
        };
        let pool = ConnectionPool { shared: strong };
        let next = pool.cleanup_inner(Instant::now(), true);
        drop(pool);

        match next {
            None => {
                tracing::trace!(target: "hopwire::pool", "pool empty, cleanup task exiting");
                return;
            }
            Some(delay) if delay.is_zero() => continue,
            Some(delay) => {
                tokio::select! {
                    () = tokio::time::sleep(delay) => {}
                    () = wakeup.notified() => {}
                }
            }
        }
    }
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("max_idle", &self.shared.max_idle)
            .field("keep_alive", &self.shared.keep_alive)
            .field("connections", &self.connection_count())
            .finish()
    }
}
