//! Proxy exclusion rules in `NO_PROXY` format

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Hosts that must be reached directly even when a proxy is configured.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NoProxy {
    entries: Vec<Entry>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Entry {
    Wildcard,
    Domain(String),
    Ip(IpAddr),
    Subnet(IpAddr, u8),
}

impl NoProxy {
    /// Reads `NO_PROXY`, falling back to `no_proxy`. `None` when neither is set
    /// or the value is blank.
    #[must_use]
    pub fn from_env() -> Option<NoProxy> {
        let raw = std::env::var("NO_PROXY")
            .or_else(|_| std::env::var("no_proxy"))
            .unwrap_or_default();

        Self::from_string(&raw)
    }

    /// Parses a comma separated exclusion list.
    ///
    /// * `*` matches every host
    /// * IP addresses match exactly, `10.0.0.0/8` style entries match a subnet
    /// * anything else is a domain matching itself and its subdomains, with or
    ///   without a leading dot
    ///
    /// `"example.com, 192.168.1.0/24"` excludes `example.com`, `api.example.com`
    /// and `192.168.1.42`, but not `notexample.com`.
    #[must_use]
    pub fn from_string(no_proxy_list: &str) -> Option<Self> {
        let entries: Vec<Entry> = no_proxy_list
            .split(',')
            .map(str::trim)
            .filter(|pattern| !pattern.is_empty())
            .map(parse_entry)
            .collect();

        if entries.is_empty() {
            return None;
        }

        Some(NoProxy { entries })
    }

    /// Whether `host` bypasses the proxy. IPv6 hosts may be bracketed.
    #[must_use]
    pub fn matches(&self, host: &str) -> bool {
        let host = host.trim_start_matches('[').trim_end_matches(']');
        let host_ip = host.parse::<IpAddr>().ok();
        let host = host.to_ascii_lowercase();

        self.entries.iter().any(|entry| match entry {
            Entry::Wildcard => true,
            Entry::Domain(domain) => {
                host == *domain
                    || (host.len() > domain.len()
                        && host.ends_with(domain.as_str())
                        && host.as_bytes()[host.len() - domain.len() - 1] == b'.')
            }
            Entry::Ip(ip) => host_ip == Some(*ip),
            Entry::Subnet(network, prefix_len) => {
                host_ip.is_some_and(|ip| ip_in_subnet(ip, *network, *prefix_len))
            }
        })
    }
}

fn parse_entry(pattern: &str) -> Entry {
    if pattern == "*" {
        return Entry::Wildcard;
    }
    if let Some((network, prefix_len)) = parse_cidr_pattern(pattern) {
        return Entry::Subnet(network, prefix_len);
    }
    if let Ok(ip) = pattern.trim_start_matches('[').trim_end_matches(']').parse::<IpAddr>() {
        return Entry::Ip(ip);
    }
    Entry::Domain(pattern.trim_start_matches('.').to_ascii_lowercase())
}

/// Parse a CIDR pattern (e.g., "192.168.1.0/24" or "2001:db8::/32")
fn parse_cidr_pattern(pattern: &str) -> Option<(IpAddr, u8)> {
    let (network_str, prefix_str) = pattern.split_once('/')?;
    let network_addr = network_str.parse::<IpAddr>().ok()?;
    let prefix_len = prefix_str.parse::<u8>().ok()?;

    let max_prefix = match network_addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    };

    (prefix_len <= max_prefix).then_some((network_addr, prefix_len))
}

fn ip_in_subnet(ip: IpAddr, network: IpAddr, prefix_len: u8) -> bool {
    match (ip, network) {
        (IpAddr::V4(ip_v4), IpAddr::V4(net_v4)) => ipv4_in_subnet(ip_v4, net_v4, prefix_len),
        (IpAddr::V6(ip_v6), IpAddr::V6(net_v6)) => ipv6_in_subnet(ip_v6, net_v6, prefix_len),
        _ => false,
    }
}

fn ipv4_in_subnet(ip: Ipv4Addr, network: Ipv4Addr, prefix_len: u8) -> bool {
    if prefix_len == 0 {
        return true;
    }
    let mask = u32::MAX << (32 - u32::from(prefix_len));
    (u32::from(ip) & mask) == (u32::from(network) & mask)
}

fn ipv6_in_subnet(ip: Ipv6Addr, network: Ipv6Addr, prefix_len: u8) -> bool {
    if prefix_len == 0 {
        return true;
    }
    let mask = u128::MAX << (128 - u32::from(prefix_len));
    (u128::from(ip) & mask) == (u128::from(network) & mask)
}
