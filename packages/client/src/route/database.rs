//! Blacklist of routes that recently failed

use std::sync::{Mutex, MutexGuard, PoisonError};

use hashbrown::HashSet;

use super::route::Route;

/// Routes whose last connection attempt failed.
///
/// Failed routes are postponed rather than skipped: the selector still
/// returns them once every other route has been offered. A successful
/// connection clears the route.
#[derive(Debug, Default)]
pub struct RouteDatabase {
    failed: Mutex<HashSet<Route>>,
}

impl RouteDatabase {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failure to connect to `route`.
    pub fn failed(&self, route: &Route) {
        if self.lock().insert(route.clone()) {
            tracing::debug!(target: "hopwire::route", %route, "route marked failed");
        }
    }

    /// Records a successful connection to `route`.
    pub fn connected(&self, route: &Route) {
        if self.lock().remove(route) {
            tracing::debug!(target: "hopwire::route", %route, "route recovered");
        }
    }

    /// Whether `route` has failed recently and should be tried last.
    #[must_use]
    pub fn should_postpone(&self, route: &Route) -> bool {
        self.lock().contains(route)
    }

    #[must_use]
    pub fn failed_routes(&self) -> Vec<Route> {
        self.lock().iter().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<Route>> {
        self.failed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
