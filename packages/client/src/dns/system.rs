use std::net::IpAddr;

use futures::future::BoxFuture;

use super::{Dns, DnsError, dedup_preserving_order};

/// Resolver backed by the operating system (`getaddrinfo`), run on tokio's
/// blocking pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemDns;

impl Dns for SystemDns {
    fn lookup<'a>(&'a self, host: &'a str) -> BoxFuture<'a, Result<Vec<IpAddr>, DnsError>> {
        Box::pin(async move {
            let addrs = tokio::net::lookup_host((host, 0))
                .await
                .map_err(|e| DnsError::UnknownHost {
                    host: host.to_string(),
                    reason: e.to_string(),
                })?;

            let ips = dedup_preserving_order(addrs.map(|addr| addr.ip()));
            tracing::trace!(target: "hopwire::dns", host, count = ips.len(), "system lookup complete");
            Ok(ips)
        })
    }
}
