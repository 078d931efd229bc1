mod common;

use std::time::Duration;

use common::{Behavior, FakeDns, FakeSocketFactory, FakeTls, Harness, ip};
use hopwire_client::HttpRequest;
use tokio::time::Instant;

fn three_addresses() -> FakeDns {
    let dns = FakeDns::new();
    dns.set("example.com", &["10.0.0.1", "10.0.0.2", "10.0.0.3"]);
    dns
}

fn offsets(times: &[Instant]) -> Vec<Duration> {
    times.iter().map(|at| at.duration_since(times[0])).collect()
}

#[tokio::test(start_paused = true)]
async fn test_attempts_are_staggered_until_one_connects() {
    let sockets = FakeSocketFactory::new();
    sockets.set("10.0.0.1", Behavior::Hang);
    sockets.set("10.0.0.2", Behavior::Hang);
    let harness = Harness::build(three_addresses(), sockets, FakeTls::new(), |b| b);

    let start = Instant::now();
    let response = harness.get("https://example.com/").await.unwrap();

    assert_eq!(start.elapsed(), Duration::from_millis(500));
    assert_eq!(response.route().unwrap().target().to_string(), "10.0.0.3:443");
    assert_eq!(
        offsets(&harness.sockets.attempt_times()),
        vec![
            Duration::ZERO,
            Duration::from_millis(250),
            Duration::from_millis(500)
        ]
    );
    assert_eq!(harness.client.stats().snapshot().fast_fallback_races, 1);
}

#[tokio::test(start_paused = true)]
async fn test_custom_delay_is_honored() {
    let sockets = FakeSocketFactory::new();
    sockets.set("10.0.0.1", Behavior::Hang);
    let harness = Harness::build(three_addresses(), sockets, FakeTls::new(), |b| {
        b.fast_fallback_delay(Duration::from_millis(100))
    });

    harness.get("https://example.com/").await.unwrap();

    assert_eq!(
        offsets(&harness.sockets.attempt_times()),
        vec![Duration::ZERO, Duration::from_millis(100)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_losing_connection_is_closed_not_pooled() {
    let sockets = FakeSocketFactory::new();
    sockets.set("10.0.0.1", Behavior::Delay(Duration::from_millis(300)));
    sockets.set("10.0.0.2", Behavior::Delay(Duration::from_millis(50)));
    let harness = Harness::build(three_addresses(), sockets, FakeTls::new(), |b| b);

    harness.get("https://example.com/").await.unwrap();

    assert_eq!(harness.sockets.attempts().len(), 2);
    assert_eq!(harness.client.connection_pool().connection_count(), 1);
    assert_eq!(harness.sockets.open_sockets(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_refused_attempt_starts_the_next_route_immediately() {
    let sockets = FakeSocketFactory::new();
    sockets.set("10.0.0.1", Behavior::Refuse);
    let harness = Harness::build(three_addresses(), sockets, FakeTls::new(), |b| b);

    let start = Instant::now();
    let response = harness.get("https://example.com/").await.unwrap();

    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_eq!(response.route().unwrap().target().to_string(), "10.0.0.2:443");
    assert_eq!(harness.sockets.attempted_ips(), vec![ip("10.0.0.1"), ip("10.0.0.2")]);
    assert_eq!(harness.client.route_database().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_stops_the_race() {
    let sockets = FakeSocketFactory::new();
    sockets.set("10.0.0.1", Behavior::Hang);
    sockets.set("10.0.0.2", Behavior::Hang);
    sockets.set("10.0.0.3", Behavior::Delay(Duration::from_secs(5)));
    let harness = Harness::build(three_addresses(), sockets, FakeTls::new(), |b| b);

    let call = harness
        .client
        .new_call(HttpRequest::get("https://example.com/").unwrap());
    let running = call.clone();
    let task = tokio::spawn(async move { running.execute().await });

    tokio::time::sleep(Duration::from_millis(600)).await;
    call.cancel();
    let err = task.await.unwrap().unwrap_err();

    assert!(err.is_canceled());
    assert_eq!(harness.sockets.attempts().len(), 3);
    assert_eq!(harness.sockets.open_sockets(), 0);
    assert_eq!(harness.client.connection_pool().connection_count(), 0);
    assert_eq!(harness.events.count("canceled"), 1);
    assert_eq!(harness.events.count("connect_start"), 3);
    assert_eq!(harness.events.count("connect_failed"), 3);
    assert!(harness.client.route_database().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_address_families_are_interleaved() {
    let dns = FakeDns::new();
    dns.set("dual.example.com", &["2001:db8::1", "2001:db8::2", "10.0.0.1"]);
    let sockets = FakeSocketFactory::new();
    sockets.set("2001:db8::1", Behavior::Hang);
    sockets.set("10.0.0.1", Behavior::Hang);
    let harness = Harness::build(dns, sockets, FakeTls::new(), |b| b);

    harness.get("https://dual.example.com/").await.unwrap();

    assert_eq!(
        harness.sockets.attempted_ips(),
        vec![ip("2001:db8::1"), ip("10.0.0.1"), ip("2001:db8::2")]
    );
}

#[tokio::test(start_paused = true)]
async fn test_all_attempts_failing_reports_each_route() {
    let dns = FakeDns::new();
    dns.set("example.com", &["10.0.0.1", "10.0.0.2"]);
    let sockets = FakeSocketFactory::new();
    sockets.set("10.0.0.1", Behavior::Hang);
    sockets.set("10.0.0.2", Behavior::Refuse);
    let harness = Harness::build(dns, sockets, FakeTls::new(), |b| {
        b.connect_timeout(Duration::from_secs(1))
    });

    let start = Instant::now();
    let err = harness.get("https://example.com/").await.unwrap_err();

    assert!(err.is_route_exhausted());
    assert_eq!(start.elapsed(), Duration::from_secs(1));
    let failed: Vec<String> = err
        .route_failures()
        .iter()
        .map(|failure| failure.route().unwrap().target().to_string())
        .collect();
    assert_eq!(failed, vec!["10.0.0.2:443", "10.0.0.1:443"]);
    assert!(err.route_failures()[1].is_timeout());
    assert_eq!(harness.client.route_database().len(), 2);

    let stats = harness.client.stats().snapshot();
    assert_eq!(stats.fast_fallback_races, 1);
    assert_eq!(stats.connect_failures, 2);
    assert_eq!(stats.requests_failed, 1);
}

#[tokio::test(start_paused = true)]
async fn test_pooled_connection_skips_the_race() {
    let harness = Harness::build(three_addresses(), FakeSocketFactory::new(), FakeTls::new(), |b| b);

    harness.get("https://example.com/").await.unwrap();
    harness.get("https://example.com/").await.unwrap();

    assert_eq!(harness.sockets.attempts().len(), 1);
    assert_eq!(harness.client.stats().snapshot().fast_fallback_races, 0);
}

#[tokio::test(start_paused = true)]
async fn test_aborted_racers_report_connect_failed() {
    let sockets = FakeSocketFactory::new();
    sockets.set("10.0.0.1", Behavior::Hang);
    sockets.set("10.0.0.2", Behavior::Hang);
    let harness = Harness::build(three_addresses(), sockets, FakeTls::new(), |b| b);

    harness.get("https://example.com/").await.unwrap();

    let events = harness.events.events();
    let mut connect_events: Vec<&str> = events
        .iter()
        .map(String::as_str)
        .filter(|event| event.starts_with("connect_"))
        .collect();
    assert_eq!(connect_events.len(), 6);
    // Aborted racers finish in no particular order.
    connect_events[4..].sort_unstable();
    assert_eq!(
        connect_events,
        vec![
            "connect_start 10.0.0.1:443",
            "connect_start 10.0.0.2:443",
            "connect_start 10.0.0.3:443",
            "connect_end 10.0.0.3:443 http/1.1",
            "connect_failed 10.0.0.1:443",
            "connect_failed 10.0.0.2:443",
        ]
    );
    // Aborted attempts say nothing about their routes.
    assert!(harness.client.route_database().is_empty());
    assert_eq!(harness.client.stats().snapshot().connect_failures, 0);
}
