//! DNS resolution via the [hickory-resolver](https://github.com/hickory-dns/hickory-dns) crate

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use futures::future::BoxFuture;
use hickory_resolver::TokioResolver;
use hickory_resolver::config::LookupIpStrategy;
use once_cell::sync::OnceCell;

use super::{Dns, DnsError, dedup_preserving_order};

/// Asynchronous resolver reading `/etc/resolv.conf` on first use.
///
/// Queries both A and AAAA records so fast fallback has both families to
/// race.
#[derive(Default, Clone)]
pub struct HickoryDns {
    state: Arc<OnceCell<TokioResolver>>,
}

impl HickoryDns {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl fmt::Debug for HickoryDns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HickoryDns")
            .field("initialized", &self.state.get().is_some())
            .finish()
    }
}

impl Dns for HickoryDns {
    fn lookup<'a>(&'a self, host: &'a str) -> BoxFuture<'a, Result<Vec<IpAddr>, DnsError>> {
        Box::pin(async move {
            let resolver = self
                .state
                .get_or_try_init(new_resolver)
                .map_err(|reason| DnsError::UnknownHost {
                    host: host.to_string(),
                    reason,
                })?;

            let lookup = resolver
                .lookup_ip(host)
                .await
                .map_err(|e| DnsError::UnknownHost {
                    host: host.to_string(),
                    reason: e.to_string(),
                })?;

            Ok(dedup_preserving_order(lookup.iter()))
        })
    }
}

/// Builds a resolver from the system configuration, overriding the lookup
/// strategy to return both IPv4 and IPv6 answers.
fn new_resolver() -> Result<TokioResolver, String> {
    let mut builder = TokioResolver::builder_tokio()
        .map_err(|e| format!("error reading DNS system conf for hickory-dns: {e}"))?;
    builder.options_mut().ip_strategy = LookupIpStrategy::Ipv4AndIpv6;
    Ok(builder.build())
}
