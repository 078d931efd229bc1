//! Proxy configuration and selection

pub mod no_proxy;
pub mod selector;
pub mod types;

pub use no_proxy::NoProxy;
pub use selector::{DirectProxySelector, Intercept, ProxyRules, ProxySelector};
pub use types::{Credentials, Proxy, ProxyError};
