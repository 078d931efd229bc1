mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use common::{FakeDns, FakeSocketFactory, FakeTls, Harness, Step};
use hopwire_client::{HttpClientBuilder, HttpRequest, PendingResponse};
use tokio::sync::Notify;

fn harness(configure: impl FnOnce(HttpClientBuilder) -> HttpClientBuilder) -> Harness {
    let dns = FakeDns::new();
    dns.set("a.example.com", &["10.0.0.1"]);
    dns.set("b.example.com", &["10.0.0.2"]);
    Harness::build(dns, FakeSocketFactory::new(), FakeTls::new(), configure)
}

fn hold(harness: &Harness) -> (Arc<Notify>, Arc<Notify>) {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    harness.codec.push(Step::Hold {
        entered: Arc::clone(&entered),
        release: Arc::clone(&release),
        status: 200,
    });
    (entered, release)
}

fn enqueue(harness: &Harness, url: &str) -> PendingResponse {
    harness
        .client
        .new_call(HttpRequest::get(url).unwrap())
        .enqueue()
        .unwrap()
}

#[tokio::test]
async fn test_per_host_limit_queues_extra_calls() {
    let harness = harness(|b| b.max_requests_per_host(1));
    let (entered, release) = hold(&harness);
    let dispatcher = harness.client.dispatcher();

    let first = enqueue(&harness, "https://a.example.com/1");
    entered.notified().await;
    let second = enqueue(&harness, "https://a.example.com/2");

    assert_eq!(dispatcher.running_calls_count(), 1);
    assert_eq!(dispatcher.queued_calls_count(), 1);
    assert_eq!(
        dispatcher.queued_calls()[0].request().url().as_str(),
        "https://a.example.com/2"
    );

    // Another host is not held back by the busy one.
    let other_host = enqueue(&harness, "https://b.example.com/");
    assert_eq!(other_host.await.unwrap().unwrap().status(), 200);
    assert_eq!(dispatcher.queued_calls_count(), 1);

    release.notify_one();
    assert_eq!(first.await.unwrap().unwrap().status(), 200);
    assert_eq!(second.await.unwrap().unwrap().status(), 200);
    assert_eq!(dispatcher.queued_calls_count(), 0);
}

#[tokio::test]
async fn test_global_limit_applies_across_hosts() {
    let harness = harness(|b| b.max_requests(1));
    let (entered, release) = hold(&harness);
    let dispatcher = harness.client.dispatcher();

    let first = enqueue(&harness, "https://a.example.com/");
    entered.notified().await;
    let second = enqueue(&harness, "https://b.example.com/");

    assert_eq!(dispatcher.running_calls_count(), 1);
    assert_eq!(dispatcher.queued_calls_count(), 1);

    release.notify_one();
    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_raising_a_limit_promotes_waiting_calls() {
    let harness = harness(|b| b.max_requests_per_host(1));
    let (entered, release) = hold(&harness);
    let dispatcher = harness.client.dispatcher();

    let first = enqueue(&harness, "https://a.example.com/1");
    entered.notified().await;
    let second = enqueue(&harness, "https://a.example.com/2");
    assert_eq!(dispatcher.queued_calls_count(), 1);

    dispatcher.set_max_requests_per_host(2).unwrap();
    assert_eq!(second.await.unwrap().unwrap().status(), 200);

    release.notify_one();
    first.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_limits_below_one_are_rejected() {
    let harness = harness(|b| b);
    let dispatcher = harness.client.dispatcher();

    assert!(dispatcher.set_max_requests(0).unwrap_err().is_builder());
    assert!(dispatcher.set_max_requests_per_host(0).unwrap_err().is_builder());
    assert_eq!(dispatcher.max_requests(), 64);
    assert_eq!(dispatcher.max_requests_per_host(), 5);
}

#[tokio::test]
async fn test_call_runs_only_once() {
    let harness = harness(|b| b);
    let call = harness
        .client
        .new_call(HttpRequest::get("https://a.example.com/").unwrap());

    call.execute().await.unwrap();
    assert!(call.is_executed());

    let err = call.execute().await.unwrap_err();
    assert!(err.is_builder());
    assert!(err.to_string().contains("Already Executed"));
    assert!(call.enqueue().unwrap_err().is_builder());
    assert_eq!(harness.codec.connections().len(), 1);
}

#[tokio::test]
async fn test_cancel_all_reaches_running_and_queued_calls() {
    let harness = harness(|b| b.max_requests(1));
    let (entered, _release) = hold(&harness);
    let dispatcher = harness.client.dispatcher();

    let running = enqueue(&harness, "https://a.example.com/");
    entered.notified().await;
    let queued = enqueue(&harness, "https://b.example.com/");

    for call in dispatcher.queued_calls() {
        assert!(!call.is_canceled());
    }
    dispatcher.cancel_all();

    assert!(running.await.unwrap().unwrap_err().is_canceled());
    assert!(queued.await.unwrap().unwrap_err().is_canceled());
    assert_eq!(harness.events.count("canceled"), 2);
}

#[tokio::test]
async fn test_idle_callback_runs_when_last_call_finishes() {
    let harness = harness(|b| b);
    let idle = Arc::new(AtomicUsize::new(0));
    let idle_notify = Arc::new(Notify::new());
    {
        let idle = Arc::clone(&idle);
        let idle_notify = Arc::clone(&idle_notify);
        harness.client.dispatcher().set_idle_callback(move || {
            idle.fetch_add(1, Ordering::SeqCst);
            idle_notify.notify_one();
        });
    }

    harness.get("https://a.example.com/").await.unwrap();
    assert_eq!(idle.load(Ordering::SeqCst), 1);
    idle_notify.notified().await;

    let pending = enqueue(&harness, "https://b.example.com/");
    pending.await.unwrap().unwrap();
    tokio::time::timeout(Duration::from_secs(5), idle_notify.notified())
        .await
        .unwrap();
    assert_eq!(idle.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_executed_calls_are_tracked_but_not_limited() {
    let harness = harness(|b| b.max_requests(1));
    let (entered, release) = hold(&harness);
    let dispatcher = harness.client.dispatcher();

    let queued_first = enqueue(&harness, "https://a.example.com/");
    entered.notified().await;

    harness.get("https://b.example.com/").await.unwrap();
    assert_eq!(dispatcher.running_calls_count(), 1);

    release.notify_one();
    queued_first.await.unwrap().unwrap();
}
