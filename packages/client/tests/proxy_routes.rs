mod common;

use std::sync::Arc;

use common::{
    Behavior, FakeDns, FakeSocketFactory, FakeTls, Harness, SOCKS5_GRANTED, TUNNEL_AUTH_REQUIRED,
    TUNNEL_ESTABLISHED, ip, socket,
};
use hopwire_client::proxy::Intercept;
use hopwire_client::{Protocol, Proxy, ProxyRules, SocketTarget};

fn dns() -> FakeDns {
    let dns = FakeDns::new();
    dns.set("example.com", &["10.0.0.1"]);
    dns.set("proxy.internal", &["10.9.9.9"]);
    dns
}

fn through(proxy: Proxy, sockets: FakeSocketFactory) -> Harness {
    let rules = ProxyRules::new().with_rule(Intercept::All, proxy);
    Harness::build(dns(), sockets, FakeTls::new(), |builder| {
        builder
            .fast_fallback(false)
            .proxy_selector(Arc::new(rules))
    })
}

fn connect_events(harness: &Harness) -> Vec<String> {
    harness
        .events
        .events()
        .into_iter()
        .filter(|event| {
            let name = event.split(' ').next().unwrap_or_default();
            matches!(
                name,
                "connect_start"
                    | "secure_connect_start"
                    | "secure_connect_end"
                    | "connect_end"
                    | "connect_failed"
            )
        })
        .collect()
}

#[tokio::test]
async fn test_https_is_tunnelled_through_http_proxy() {
    let sockets = FakeSocketFactory::new();
    sockets.set("10.9.9.9", Behavior::Answer(TUNNEL_ESTABLISHED));
    let proxy = Proxy::http("proxy.internal", 3128).with_credentials("user", "secret");
    let harness = through(proxy.clone(), sockets);

    let response = harness.get("https://example.com/").await.unwrap();

    assert_eq!(response.status(), 200);
    let route = response.route().unwrap();
    assert_eq!(route.proxy(), &proxy);
    assert!(route.requires_tunnel());
    assert_eq!(route.target(), &SocketTarget::Resolved(socket("10.9.9.9", 3128)));
    assert_eq!(harness.dns.lookups(), vec!["proxy.internal".to_string()]);

    let sent = String::from_utf8(harness.sockets.received(0)).unwrap();
    assert!(sent.starts_with("CONNECT example.com:443 HTTP/1.1\r\n"));
    assert!(sent.contains("Host: example.com:443\r\n"));
    assert!(sent.contains("Proxy-Authorization: Basic dXNlcjpzZWNyZXQ=\r\n"));
    assert!(sent.ends_with("\r\n\r\n"));

    assert_eq!(
        connect_events(&harness),
        vec![
            "connect_start 10.9.9.9:3128",
            "secure_connect_start 10.9.9.9:3128",
            "secure_connect_end 10.9.9.9:3128",
            "connect_end 10.9.9.9:3128 http/1.1",
        ]
    );
    assert!(harness.client.route_database().is_empty());
}

#[tokio::test]
async fn test_cleartext_through_http_proxy_skips_the_tunnel() {
    let harness = through(Proxy::http("proxy.internal", 3128), FakeSocketFactory::new());

    let response = harness.get("http://example.com/").await.unwrap();

    let route = response.route().unwrap();
    assert!(!route.requires_tunnel());
    assert_eq!(route.target(), &SocketTarget::Resolved(socket("10.9.9.9", 3128)));
    assert!(harness.sockets.received(0).is_empty());
    assert_eq!(harness.events.count("secure_connect_start"), 0);
}

#[tokio::test]
async fn test_tunnel_rejected_with_407_falls_back_to_direct() {
    let sockets = FakeSocketFactory::new();
    sockets.set("10.9.9.9", Behavior::Answer(TUNNEL_AUTH_REQUIRED));
    let harness = through(Proxy::http("proxy.internal", 3128), sockets);

    let response = harness.get("https://example.com/").await.unwrap();

    assert!(response.route().unwrap().proxy().is_direct());
    assert_eq!(harness.sockets.attempted_ips(), vec![ip("10.9.9.9"), ip("10.0.0.1")]);
    assert_eq!(
        connect_events(&harness),
        vec![
            "connect_start 10.9.9.9:3128",
            "connect_failed 10.9.9.9:3128",
            "connect_start 10.0.0.1:443",
            "secure_connect_start 10.0.0.1:443",
            "secure_connect_end 10.0.0.1:443",
            "connect_end 10.0.0.1:443 http/1.1",
        ]
    );

    let failed = harness.client.route_database().failed_routes();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].proxy(), &Proxy::http("proxy.internal", 3128));
    assert_eq!(harness.client.stats().snapshot().connect_failures, 1);
}

#[tokio::test]
async fn test_socks_proxy_resolves_the_origin_itself() {
    let sockets = FakeSocketFactory::new();
    sockets.set_host("socks.internal", Behavior::Answer(SOCKS5_GRANTED));
    let harness = through(Proxy::socks("socks.internal", 1080), sockets);

    let response = harness.get("https://example.com/").await.unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.protocol(), Protocol::Http11);
    let route = response.route().unwrap();
    assert_eq!(route.proxy(), &Proxy::socks("socks.internal", 1080));
    assert!(!route.requires_tunnel());
    assert_eq!(
        route.target(),
        &SocketTarget::Unresolved {
            host: "example.com".into(),
            port: 443,
        }
    );
    assert_eq!(
        harness.sockets.attempts(),
        vec![SocketTarget::Unresolved {
            host: "socks.internal".into(),
            port: 1080,
        }]
    );
    assert!(harness.dns.lookups().is_empty());

    // Greeting, then CONNECT with the host name left for the proxy to resolve.
    let mut expected = vec![5, 1, 0, 5, 1, 0, 3, 11];
    expected.extend_from_slice(b"example.com");
    expected.extend_from_slice(&443u16.to_be_bytes());
    assert_eq!(harness.sockets.received(0), expected);

    assert_eq!(
        connect_events(&harness),
        vec![
            "connect_start example.com:443",
            "secure_connect_start example.com:443",
            "secure_connect_end example.com:443",
            "connect_end example.com:443 http/1.1",
        ]
    );
    assert!(harness.client.route_database().is_empty());
}

#[tokio::test]
async fn test_socks_proxy_rejecting_connect_falls_back_to_direct() {
    let sockets = FakeSocketFactory::new();
    // General failure reply to CONNECT.
    sockets.set_host("socks.internal", Behavior::Answer(&[5, 0, 5, 1, 0, 1, 0, 0, 0, 0, 0, 0]));
    let harness = through(Proxy::socks("socks.internal", 1080), sockets);

    let response = harness.get("https://example.com/").await.unwrap();

    assert!(response.route().unwrap().proxy().is_direct());
    assert_eq!(harness.dns.lookups(), vec!["example.com".to_string()]);
    let failed = harness.client.route_database().failed_routes();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].proxy(), &Proxy::socks("socks.internal", 1080));
    assert_eq!(harness.events.count("connect_failed"), 1);
}
