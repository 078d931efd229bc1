//! Host name resolution
//!
//! The [`Dns`] trait is the seam between route selection and whatever
//! resolver the client is configured with. [`SystemDns`] uses the platform
//! resolver; [`HickoryDns`] talks to name servers directly.

use std::net::IpAddr;

use futures::future::BoxFuture;

mod hickory;
mod system;

pub use hickory::HickoryDns;
pub use system::SystemDns;

/// Resolves a host name to its IP addresses.
///
/// Implementations return addresses in the order connections should be
/// attempted. An empty answer is reported as [`DnsError::NoAddresses`] by the
/// caller, so implementations may return either.
pub trait Dns: Send + Sync + 'static {
    fn lookup<'a>(&'a self, host: &'a str) -> BoxFuture<'a, Result<Vec<IpAddr>, DnsError>>;
}

/// DNS resolution errors
#[derive(Debug, thiserror::Error)]
pub enum DnsError {
    #[error("unable to resolve host {host}: {reason}")]
    UnknownHost { host: String, reason: String },

    #[error("{host}: no addresses returned")]
    NoAddresses { host: String },
}

/// Reorders addresses to alternate between families, starting with the family
/// of the first answer. Order within each family is kept.
#[must_use]
pub fn interleave_families(addresses: Vec<IpAddr>) -> Vec<IpAddr> {
    let Some(first) = addresses.first() else {
        return addresses;
    };
    let first_is_v6 = first.is_ipv6();

    let (preferred, other): (Vec<IpAddr>, Vec<IpAddr>) = addresses
        .into_iter()
        .partition(|ip| ip.is_ipv6() == first_is_v6);

    if other.is_empty() {
        return preferred;
    }

    let mut interleaved = Vec::with_capacity(preferred.len() + other.len());
    let mut preferred = preferred.into_iter();
    let mut other = other.into_iter();
    loop {
        match (preferred.next(), other.next()) {
            (None, None) => break,
            (a, b) => interleaved.extend(a.into_iter().chain(b)),
        }
    }
    interleaved
}

pub(crate) fn dedup_preserving_order(addresses: impl IntoIterator<Item = IpAddr>) -> Vec<IpAddr> {
    let mut seen = hashbrown::HashSet::new();
    addresses.into_iter().filter(|ip| seen.insert(*ip)).collect()
}
