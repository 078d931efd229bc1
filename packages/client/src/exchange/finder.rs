//! Finding a connection for a call: sequentially or by racing routes

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::task::JoinSet;
use tokio::time::Instant;

use super::lease::Exchange;
use super::planner::{Plan, RoutePlanner};
use crate::call::CancelSignal;
use crate::client::ClientStats;
use crate::connection::RealConnection;
use crate::error::{self, Error, Result};

/// Produces an [`Exchange`] for a call.
pub trait ExchangeFinder: Send {
    /// Finds a pooled connection or connects a new one.
    ///
    /// Failed routes are recorded and skipped while others remain. When all
    /// fail the error is [`Kind::RouteExhausted`](crate::error::Kind::RouteExhausted)
    /// carrying each failure. With retries disabled, or on a failure that
    /// cannot be retried, that failure is returned at once.
    fn find(&mut self) -> BoxFuture<'_, Result<Exchange>>;

    /// Whether routes remain that have not been attempted.
    fn has_more_routes(&self) -> bool;

    /// Whether the request may be retried after a stream failure on
    /// `failed`, preparing the retry if so.
    fn retry_after(&mut self, failed: &RealConnection) -> bool;
}

/// Tries one route at a time.
pub struct SequentialExchangeFinder {
    planner: RoutePlanner,
    retry_on_connection_failure: bool,
    cancel: CancelSignal,
}

impl SequentialExchangeFinder {
    #[must_use]
    pub fn new(planner: RoutePlanner, retry_on_connection_failure: bool, cancel: CancelSignal) -> Self {
        Self {
            planner,
            retry_on_connection_failure,
            cancel,
        }
    }

    async fn find_inner(&mut self) -> Result<Exchange> {
        let mut failures = Vec::new();
        loop {
            let plan = tokio::select! {
                biased;
                () = self.cancel.canceled() => return Err(error::canceled()),
                plan = self.planner.next_plan() => plan,
            };

            let plan = match plan {
                Ok(plan) => plan,
                Err(err) if err.is_route_exhausted() => {
                    return Err(error::route_exhausted(failures));
                }
                Err(err) => {
                    if stops_search(&err, self.retry_on_connection_failure) {
                        return Err(err);
                    }
                    failures.push(err);
                    continue;
                }
            };

            let plan = match plan {
                Plan::Reuse(exchange) => return Ok(exchange),
                Plan::Connect(plan) => plan,
            };

            let connected = tokio::select! {
                biased;
                () = self.cancel.canceled() => return Err(error::canceled()),
                connected = plan.connect() => connected,
            };

            match connected {
                Ok(conn) => return Ok(self.planner.register(conn)),
                Err(err) => {
                    self.planner.record_failure(&err);
                    if stops_search(&err, self.retry_on_connection_failure) {
                        return Err(err);
                    }
                    failures.push(err);
                }
            }
        }
    }
}

impl ExchangeFinder for SequentialExchangeFinder {
    fn find(&mut self) -> BoxFuture<'_, Result<Exchange>> {
        Box::pin(self.find_inner())
    }

    fn has_more_routes(&self) -> bool {
        self.planner.has_next_route()
    }

    fn retry_after(&mut self, failed: &RealConnection) -> bool {
        self.planner.retry_after(failed)
    }
}

/// Races routes, starting a new attempt every `delay` until one connects.
///
/// A failed attempt starts the next route immediately. The first attempt
/// to connect is registered; every other attempt is aborted and any
/// connection it produced is closed without being pooled.
pub struct FastFallbackExchangeFinder {
    planner: RoutePlanner,
    retry_on_connection_failure: bool,
    cancel: CancelSignal,
    delay: Duration,
    stats: Arc<ClientStats>,
}

impl FastFallbackExchangeFinder {
    #[must_use]
    pub fn new(
        planner: RoutePlanner,
        retry_on_connection_failure: bool,
        cancel: CancelSignal,
        delay: Duration,
        stats: Arc<ClientStats>,
    ) -> Self {
        Self {
            planner,
            retry_on_connection_failure,
            cancel,
            delay,
            stats,
        }
    }

    async fn find_inner(&mut self) -> Result<Exchange> {
        let mut attempts: JoinSet<Result<RealConnection>> = JoinSet::new();
        let result = self.race(&mut attempts).await;

        attempts.abort_all();
        while let Some(joined) = attempts.join_next().await {
            if let Ok(Ok(conn)) = joined {
                tracing::debug!(
                    target: "hopwire::exchange",
                    id = conn.id(),
                    route = %conn.route(),
                    "closing connection that lost the race"
                );
                conn.close();
            }
        }
        result
    }

    async fn race(&mut self, attempts: &mut JoinSet<Result<RealConnection>>) -> Result<Exchange> {
        let mut failures = Vec::new();
        let mut next_launch_at = Instant::now();
        let mut exhausted = false;
        let mut raced = false;

        loop {
            if !exhausted && Instant::now() >= next_launch_at {
                let plan = tokio::select! {
                    biased;
                    () = self.cancel.canceled() => return Err(error::canceled()),
                    plan = self.planner.next_plan() => plan,
                };

                match plan {
                    Ok(Plan::Reuse(exchange)) => return Ok(exchange),
                    Ok(Plan::Connect(plan)) => {
                        tracing::trace!(
                            target: "hopwire::exchange",
                            route = %plan.route(),
                            in_flight = attempts.len(),
                            "launching connect attempt"
                        );
                        attempts.spawn(plan.connect());
                        if attempts.len() > 1 && !raced {
                            raced = true;
                            self.stats.record_fast_fallback_race();
                        }
                        next_launch_at = Instant::now() + self.delay;
                    }
                    Err(err) if err.is_route_exhausted() => exhausted = true,
                    Err(err) => {
                        if stops_search(&err, self.retry_on_connection_failure) {
                            return Err(err);
                        }
                        failures.push(err);
                    }
                }
                exhausted = exhausted || !self.planner.has_next_route();
            }

            if attempts.is_empty() {
                if exhausted {
                    return Err(error::route_exhausted(failures));
                }
                next_launch_at = Instant::now();
                continue;
            }

            tokio::select! {
                biased;
                () = self.cancel.canceled() => return Err(error::canceled()),
                Some(joined) = attempts.join_next() => {
                    let err = match joined {
                        Ok(Ok(conn)) => return Ok(self.planner.register(conn)),
                        Ok(Err(err)) => err,
                        Err(join_err) => error::connect(join_err),
                    };
                    self.planner.record_failure(&err);
                    if stops_search(&err, self.retry_on_connection_failure) {
                        return Err(err);
                    }
                    failures.push(err);
                    next_launch_at = Instant::now();
                }
                () = tokio::time::sleep_until(next_launch_at), if !exhausted => {}
            }
        }
    }
}

impl ExchangeFinder for FastFallbackExchangeFinder {
    fn find(&mut self) -> BoxFuture<'_, Result<Exchange>> {
        Box::pin(self.find_inner())
    }

    fn has_more_routes(&self) -> bool {
        self.planner.has_next_route()
    }

    fn retry_after(&mut self, failed: &RealConnection) -> bool {
        self.planner.retry_after(failed)
    }
}

fn stops_search(err: &Error, retry_on_connection_failure: bool) -> bool {
    !retry_on_connection_failure || !err.is_recoverable()
}
