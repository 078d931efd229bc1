//! Expands an address into the routes worth trying

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use super::address::Address;
use super::database::RouteDatabase;
use super::route::{Route, SocketTarget};
use crate::dns::{DnsError, interleave_families};
use crate::error::{self, Result};
use crate::event::EventListener;
use crate::proxy::Proxy;

/// Walks the proxies for an address, resolving each into routes.
///
/// Every route is eventually returned exactly once. Routes the
/// [`RouteDatabase`] holds as failed are held back and returned in a final
/// selection after every proxy has been visited.
pub struct RouteSelector {
    address: Address,
    database: Arc<RouteDatabase>,
    events: Arc<dyn EventListener>,
    interleave_families: bool,
    proxies: Vec<Proxy>,
    next_proxy_index: usize,
    postponed: Vec<Route>,
}

impl RouteSelector {
    /// Prepares selection for `address`. Proxies are chosen immediately: the
    /// address's explicit proxy if it has one, otherwise the proxy
    /// selector's answer followed by [`Proxy::Direct`].
    ///
    /// With `interleave_families`, resolved addresses alternate between IPv6
    /// and IPv4 so racing attempts cover both.
    #[must_use]
    pub fn new(
        address: Address,
        database: Arc<RouteDatabase>,
        events: Arc<dyn EventListener>,
        interleave_families: bool,
    ) -> Self {
        let proxies = select_proxies(&address, events.as_ref());
        Self {
            address,
            database,
            events,
            interleave_families,
            proxies,
            next_proxy_index: 0,
            postponed: Vec::new(),
        }
    }

    #[must_use]
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Whether another selection is available.
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.has_next_proxy() || !self.postponed.is_empty()
    }

    fn has_next_proxy(&self) -> bool {
        self.next_proxy_index < self.proxies.len()
    }

    /// Returns the routes of the next proxy that has any worth trying,
    /// or the postponed routes once proxies run out.
    ///
    /// # Errors
    ///
    /// Returns a [`Kind::RouteExhausted`](crate::error::Kind::RouteExhausted)
    /// error when nothing remains, or the resolution error for a proxy's
    /// host. A failed lookup consumes that proxy.
    pub async fn next(&mut self) -> Result<Selection> {
        if !self.has_next() {
            return Err(error::route_exhausted(Vec::new()));
        }

        let mut routes = Vec::new();
        while self.has_next_proxy() {
            let proxy = self.proxies[self.next_proxy_index].clone();
            self.next_proxy_index += 1;

            for target in self.resolve_targets(&proxy).await? {
                let route = Route::new(self.address.clone(), proxy.clone(), target);
                if self.database.should_postpone(&route) {
                    self.postponed.push(route);
                } else {
                    routes.push(route);
                }
            }

            if !routes.is_empty() {
                break;
            }
        }

        if routes.is_empty() {
            routes = std::mem::take(&mut self.postponed);
        }

        tracing::trace!(
            target: "hopwire::route",
            address = %self.address,
            routes = routes.len(),
            postponed = self.postponed.len(),
            "route selection"
        );
        Ok(Selection::new(routes))
    }

    async fn resolve_targets(&self, proxy: &Proxy) -> Result<Vec<SocketTarget>> {
        let (host, port) = match proxy {
            Proxy::Direct | Proxy::Socks { .. } => (self.address.host(), self.address.port()),
            Proxy::Http { host, port, .. } => (host.as_str(), *port),
        };

        if port == 0 {
            return Err(error::builder(format!("no route to {host}; port is out of range")));
        }

        if matches!(proxy, Proxy::Socks { .. }) {
            return Ok(vec![SocketTarget::Unresolved {
                host: host.to_string(),
                port,
            }]);
        }

        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(vec![SocketTarget::Resolved(SocketAddr::new(ip, port))]);
        }

        self.events.dns_start(host);
        let mut addresses = self
            .address
            .dns()
            .lookup(host)
            .await
            .map_err(error::dns)?;
        if addresses.is_empty() {
            return Err(error::dns(DnsError::NoAddresses {
                host: host.to_string(),
            }));
        }
        self.events.dns_end(host, &addresses);

        if self.interleave_families {
            addresses = interleave_families(addresses);
        }

        Ok(addresses
            .into_iter()
            .map(|ip| SocketTarget::Resolved(SocketAddr::new(ip, port)))
            .collect())
    }
}

fn select_proxies(address: &Address, events: &dyn EventListener) -> Vec<Proxy> {
    if let Some(proxy) = address.proxy() {
        return vec![proxy.clone()];
    }

    let url = match address.url() {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(target: "hopwire::route", %address, error = %e, "cannot build proxy selector url");
            return vec![Proxy::Direct];
        }
    };

    events.proxy_select_start(&url);
    let mut proxies = address.proxy_selector().select(&url);
    if proxies.last() != Some(&Proxy::Direct) {
        proxies.retain(|proxy| !proxy.is_direct());
        proxies.push(Proxy::Direct);
    }
    events.proxy_select_end(&url, &proxies);
    proxies
}

/// The routes produced for one proxy, consumed in order.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    routes: Vec<Route>,
    next_index: usize,
}

impl Selection {
    #[must_use]
    pub fn new(routes: Vec<Route>) -> Self {
        Self {
            routes,
            next_index: 0,
        }
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        self.next_index < self.routes.len()
    }

    /// The next route, or `None` when the selection is used up.
    pub fn next(&mut self) -> Option<Route> {
        let route = self.routes.get(self.next_index).cloned()?;
        self.next_index += 1;
        Some(route)
    }

    /// Every route in the selection, including those already taken.
    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}
