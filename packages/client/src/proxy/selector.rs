//! Proxy selection for a destination URL

use std::io;

use url::Url;

use super::no_proxy::NoProxy;
use super::types::{Proxy, ProxyError};

/// Chooses the proxies to try for a destination, in preference order.
///
/// The route selector appends [`Proxy::Direct`] when a selector's answer
/// does not already end with it.
pub trait ProxySelector: Send + Sync + 'static {
    fn select(&self, url: &Url) -> Vec<Proxy>;

    /// Told when connecting through `proxy` failed, so it can be deprioritised.
    fn connect_failed(&self, _url: &Url, _proxy: &Proxy, _error: &io::Error) {}
}

/// Sends everything directly.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectProxySelector;

impl ProxySelector for DirectProxySelector {
    fn select(&self, _url: &Url) -> Vec<Proxy> {
        vec![Proxy::Direct]
    }
}

/// Which destinations a proxy rule applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intercept {
    All,
    Http,
    Https,
}

impl Intercept {
    fn applies_to(self, scheme: &str) -> bool {
        match self {
            Intercept::All => true,
            Intercept::Http => scheme == "http",
            Intercept::Https => scheme == "https",
        }
    }
}

/// Ordered proxy rules with an exclusion list.
#[derive(Clone, Debug, Default)]
pub struct ProxyRules {
    rules: Vec<(Intercept, Proxy)>,
    no_proxy: Option<NoProxy>,
}

impl ProxyRules {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_rule(mut self, intercept: Intercept, proxy: Proxy) -> Self {
        self.rules.push((intercept, proxy));
        self
    }

    #[must_use]
    pub fn with_no_proxy(mut self, no_proxy: Option<NoProxy>) -> Self {
        self.no_proxy = no_proxy;
        self
    }

    /// Builds rules from `HTTP_PROXY`, `HTTPS_PROXY`, `ALL_PROXY` and `NO_PROXY`
    /// (upper or lower case).
    ///
    /// # Errors
    ///
    /// Returns `ProxyError` if any of the variables holds an unparsable proxy.
    pub fn from_env() -> Result<Self, ProxyError> {
        let mut rules = ProxyRules::new().with_no_proxy(NoProxy::from_env());

        for (intercept, names) in [
            (Intercept::Http, ["HTTP_PROXY", "http_proxy"]),
            (Intercept::Https, ["HTTPS_PROXY", "https_proxy"]),
            (Intercept::All, ["ALL_PROXY", "all_proxy"]),
        ] {
            let value = names
                .iter()
                .find_map(|name| std::env::var(name).ok())
                .filter(|value| !value.trim().is_empty());
            if let Some(value) = value {
                rules = rules.with_rule(intercept, Proxy::parse(value.trim())?);
            }
        }

        Ok(rules)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl ProxySelector for ProxyRules {
    fn select(&self, url: &Url) -> Vec<Proxy> {
        let host = url.host_str().unwrap_or_default();
        if self.no_proxy.as_ref().is_some_and(|no_proxy| no_proxy.matches(host)) {
            return vec![Proxy::Direct];
        }

        let mut proxies: Vec<Proxy> = Vec::new();
        for (intercept, proxy) in &self.rules {
            if intercept.applies_to(url.scheme()) && !proxies.contains(proxy) {
                proxies.push(proxy.clone());
            }
        }
        proxies
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn rules_apply_by_scheme_in_order() {
        let rules = ProxyRules::new()
            .with_rule(Intercept::Https, Proxy::http("secure-proxy", 3128))
            .with_rule(Intercept::All, Proxy::socks("socks", 1080));

        assert_eq!(
            rules.select(&url("https://example.com/")),
            vec![Proxy::http("secure-proxy", 3128), Proxy::socks("socks", 1080)]
        );
        assert_eq!(
            rules.select(&url("http://example.com/")),
            vec![Proxy::socks("socks", 1080)]
        );
    }

    #[test]
    fn excluded_hosts_go_direct() {
        let rules = ProxyRules::new()
            .with_rule(Intercept::All, Proxy::http("proxy", 8080))
            .with_no_proxy(NoProxy::from_string("localhost,10.0.0.0/8"));

        assert_eq!(rules.select(&url("http://localhost:8000/")), vec![Proxy::Direct]);
        assert_eq!(rules.select(&url("http://10.1.2.3/")), vec![Proxy::Direct]);
        assert_eq!(
            rules.select(&url("http://example.com/")),
            vec![Proxy::http("proxy", 8080)]
        );
    }
}
