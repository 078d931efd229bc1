//! Deciding what to try next for one address

use std::io;
use std::sync::Arc;

use super::connect_plan::{ConnectPlan, ConnectSettings};
use super::lease::Exchange;
use crate::client::ClientStats;
use crate::connection::{ConnectionPool, RealConnection};
use crate::error::{self, Error, Result};
use crate::event::EventListener;
use crate::route::{Address, Route, RouteDatabase, RouteSelector, Selection};

/// The next step toward an exchange.
pub enum Plan {
    /// A pooled connection had room; the stream is already reserved.
    Reuse(Exchange),
    /// A route to connect.
    Connect(ConnectPlan),
}

/// Produces plans for one address: pooled connections first, then each
/// route the [`RouteSelector`] yields.
///
/// The planner is the only place route outcomes are written back to the
/// [`RouteDatabase`] and new connections enter the pool.
pub struct RoutePlanner {
    address: Address,
    pool: ConnectionPool,
    database: Arc<RouteDatabase>,
    events: Arc<dyn EventListener>,
    stats: Arc<ClientStats>,
    settings: ConnectSettings,
    interleave_families: bool,
    selector: Option<RouteSelector>,
    selection: Option<Selection>,
    retry_route: Option<Route>,
}

impl RoutePlanner {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        address: Address,
        pool: ConnectionPool,
        database: Arc<RouteDatabase>,
        events: Arc<dyn EventListener>,
        stats: Arc<ClientStats>,
        settings: ConnectSettings,
        interleave_families: bool,
    ) -> Self {
        Self {
            address,
            pool,
            database,
            events,
            stats,
            settings,
            interleave_families,
            selector: None,
            selection: None,
            retry_route: None,
        }
    }

    #[must_use]
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Whether a route remains that no plan has been made for yet.
    #[must_use]
    pub fn has_next_route(&self) -> bool {
        self.retry_route.is_some()
            || self.selection.as_ref().is_some_and(Selection::has_next)
            || self.selector.as_ref().is_none_or(RouteSelector::has_next)
    }

    /// Reserves a stream on a pooled connection for this address, or for a
    /// coalescable one when `routes` is known.
    pub fn pooled_exchange(&self, routes: Option<&[Route]>) -> Option<Exchange> {
        match self.pool.get(&self.address, routes, false) {
            Some(conn) => {
                self.stats.record_pool_hit();
                Some(Exchange::new(conn, self.pool.clone(), Arc::clone(&self.events)))
            }
            None => None,
        }
    }

    /// Returns the next plan.
    ///
    /// # Errors
    ///
    /// Returns the resolution error when a proxy's host cannot be resolved,
    /// or an empty [`Kind::RouteExhausted`](crate::error::Kind::RouteExhausted)
    /// error if no route remains.
    pub async fn next_plan(&mut self) -> Result<Plan> {
        if let Some(exchange) = self.pooled_exchange(None) {
            return Ok(Plan::Reuse(exchange));
        }

        if let Some(route) = self
            .retry_route
            .take()
            .or_else(|| self.selection.as_mut().and_then(Selection::next))
        {
            self.stats.record_pool_miss();
            return Ok(Plan::Connect(self.plan_for(route)));
        }

        let selector = self.selector.get_or_insert_with(|| {
            RouteSelector::new(
                self.address.clone(),
                Arc::clone(&self.database),
                Arc::clone(&self.events),
                self.interleave_families,
            )
        });
        let mut selection = selector.next().await?;

        // Knowing the IPs may make a connection to another host usable.
        if let Some(exchange) = self.pooled_exchange(Some(selection.routes())) {
            self.selection = Some(selection);
            return Ok(Plan::Reuse(exchange));
        }

        let Some(route) = selection.next() else {
            return Err(error::route_exhausted(Vec::new()));
        };
        self.selection = Some(selection);
        self.stats.record_pool_miss();
        Ok(Plan::Connect(self.plan_for(route)))
    }

    /// Pools a freshly connected connection and leases its first stream.
    ///
    /// If an equivalent multiplexed connection was pooled meanwhile, that
    /// one is used instead and `conn` is closed.
    pub fn register(&self, conn: RealConnection) -> Exchange {
        self.database.connected(conn.route());
        self.stats.record_connection();
        let routes = self.selection.as_ref().map(Selection::routes);
        let conn = self.pool.register(conn, routes);
        Exchange::new(conn, self.pool.clone(), Arc::clone(&self.events))
    }

    /// Whether another attempt can follow a stream failure on `failed`.
    ///
    /// A connection that still takes streams is offered again through the
    /// pool. A connection that stopped taking streams without its route
    /// being blamed, such as after a `GOAWAY` on a proven connection, has
    /// its route queued for a fresh connect.
    pub fn retry_after(&mut self, failed: &RealConnection) -> bool {
        if !failed.is_no_new_streams() {
            return true;
        }
        if failed.route_failures() == 0 && failed.route().address() == &self.address {
            self.retry_route = Some(failed.route().clone());
            return true;
        }
        self.has_next_route()
    }

    /// Records a failed connect attempt.
    ///
    /// The route is remembered as failed and, for proxied routes, the
    /// proxy selector is told.
    pub fn record_failure(&self, err: &Error) {
        self.stats.record_connect_failure();
        let Some(route) = err.route() else {
            return;
        };
        self.database.failed(route);

        if !route.proxy().is_direct()
            && let Ok(url) = self.address.url()
        {
            let cause = io::Error::other(err.to_string());
            self.address
                .proxy_selector()
                .connect_failed(&url, route.proxy(), &cause);
        }
    }

    fn plan_for(&self, route: Route) -> ConnectPlan {
        ConnectPlan::new(route, self.settings, Arc::clone(&self.events))
    }
}
