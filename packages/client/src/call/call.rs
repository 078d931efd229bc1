//! A single request, executed once

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::oneshot;

use super::cancel::CancelSignal;
use super::dispatcher::AsyncCall;
use crate::client::HttpClient;
use crate::error::{self, Result};
use crate::event::EventListener;
use crate::exchange::StreamError;
use crate::http::{HttpRequest, HttpResponse};

/// Receives the outcome of an enqueued call.
pub type PendingResponse = oneshot::Receiver<Result<HttpResponse>>;

static NEXT_CALL_ID: AtomicU64 = AtomicU64::new(1);

/// A request prepared for execution.
///
/// A call runs at most once, either inline with [`execute`](Call::execute)
/// or on the client's [`Dispatcher`](super::Dispatcher) with
/// [`enqueue`](Call::enqueue). Clones refer to the same call.
#[derive(Clone)]
pub struct Call {
    inner: Arc<RealCall>,
}

struct RealCall {
    id: u64,
    client: HttpClient,
    request: HttpRequest,
    events: Arc<dyn EventListener>,
    executed: AtomicBool,
    cancel: CancelSignal,
}

impl Call {
    pub(crate) fn new(client: HttpClient, request: HttpRequest) -> Self {
        let events = client.event_listener_factory().create(&request);
        Self {
            inner: Arc::new(RealCall {
                id: NEXT_CALL_ID.fetch_add(1, Ordering::Relaxed),
                client,
                request,
                events,
                executed: AtomicBool::new(false),
                cancel: CancelSignal::new(),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    #[must_use]
    pub fn request(&self) -> &HttpRequest {
        &self.inner.request
    }

    /// Runs the call on the current task.
    ///
    /// # Errors
    ///
    /// Fails with a builder error if the call was already executed or
    /// enqueued, otherwise with whatever ended the call.
    pub async fn execute(&self) -> Result<HttpResponse> {
        self.mark_executed()?;

        let dispatcher = self.inner.client.dispatcher();
        dispatcher.executed(self);
        let _finished = FinishOnDrop { call: self };

        self.run().await
    }

    /// Queues the call on the dispatcher. The response, or the error that
    /// ended the call, arrives on the returned channel.
    ///
    /// # Errors
    ///
    /// Fails with a builder error if the call was already executed or
    /// enqueued.
    pub fn enqueue(&self) -> Result<PendingResponse> {
        self.mark_executed()?;
        let (tx, rx) = oneshot::channel();
        self.inner
            .client
            .dispatcher()
            .enqueue(AsyncCall::new(self.clone(), tx));
        Ok(rx)
    }

    /// Cancels the call. In-flight connects and exchanges stop promptly;
    /// a queued call fails as soon as it is promoted.
    pub fn cancel(&self) {
        if self.inner.cancel.cancel() {
            tracing::debug!(target: "hopwire::call", id = self.inner.id, "call canceled");
            self.inner.events.canceled();
        }
    }

    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.inner.cancel.is_canceled()
    }

    #[must_use]
    pub fn is_executed(&self) -> bool {
        self.inner.executed.load(Ordering::Acquire)
    }

    pub(crate) fn host(&self) -> &str {
        self.inner.request.host()
    }

    pub(crate) fn same_call(&self, other: &Call) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn mark_executed(&self) -> Result<()> {
        if self.inner.executed.swap(true, Ordering::AcqRel) {
            return Err(error::builder("Already Executed"));
        }
        Ok(())
    }

    /// Drives the call to a response, applying the call timeout.
    pub(crate) async fn run(&self) -> Result<HttpResponse> {
        let inner = &self.inner;
        inner.events.call_start(&inner.request);
        inner.client.stats().record_request();
        tracing::debug!(
            target: "hopwire::call",
            id = inner.id,
            method = %inner.request.method(),
            url = %inner.request.url(),
            "call started"
        );

        let outcome = match inner.client.config().call_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.run_exchanges()).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    self.cancel();
                    Err(error::timeout(io::Error::new(
                        io::ErrorKind::TimedOut,
                        "call timed out",
                    )))
                }
            },
            None => self.run_exchanges().await,
        };

        match &outcome {
            Ok(response) => {
                inner.client.stats().record_success();
                inner.events.call_end(response);
                tracing::debug!(
                    target: "hopwire::call",
                    id = inner.id,
                    status = response.status().as_u16(),
                    protocol = %response.protocol(),
                    "call finished"
                );
            }
            Err(err) => {
                inner.client.stats().record_failure();
                inner.events.call_failed(err);
                tracing::debug!(target: "hopwire::call", id = inner.id, error = %err, "call failed");
            }
        }
        outcome
    }

    /// Finds exchanges and sends the request, retrying stream failures
    /// while another connection or route can take the request.
    async fn run_exchanges(&self) -> Result<HttpResponse> {
        let inner = &self.inner;
        if inner.cancel.is_canceled() {
            return Err(error::canceled());
        }

        let client = &inner.client;
        let config = client.config();
        let address = client.address_for(inner.request.url())?;
        let mut finder =
            client.new_exchange_finder(address, Arc::clone(&inner.events), inner.cancel.clone());
        let codec = client.codec();
        let mut follow_ups = 0;

        loop {
            let mut exchange = finder.find().await?;

            let outcome = tokio::select! {
                biased;
                () = inner.cancel.canceled() => Err(StreamError::Canceled),
                outcome = codec.exchange(&exchange, &inner.request) => outcome,
            };

            let failure = match outcome {
                Ok(response) => {
                    exchange.complete();
                    exchange.connection().track_success();
                    return Ok(response
                        .with_protocol(exchange.protocol())
                        .with_route(exchange.route().clone()));
                }
                Err(failure) => failure,
            };

            let connection = Arc::clone(exchange.connection());
            connection.track_failure(&failure);
            drop(exchange);

            if matches!(failure, StreamError::Canceled) || inner.cancel.is_canceled() {
                return Err(error::canceled());
            }

            let retry = config.retry_on_connection_failure
                && failure.is_recoverable()
                && follow_ups < config.max_follow_ups
                && finder.retry_after(&connection);
            if !retry {
                return Err(error::stream(failure).with_route(connection.route().clone()));
            }

            follow_ups += 1;
            tracing::debug!(
                target: "hopwire::call",
                id = inner.id,
                connection = connection.id(),
                error = %failure,
                follow_ups,
                "retrying after stream failure"
            );
        }
    }
}

impl std::fmt::Debug for Call {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Call")
            .field("id", &self.inner.id)
            .field("url", &self.inner.request.url().as_str())
            .field("executed", &self.is_executed())
            .field("canceled", &self.is_canceled())
            .finish()
    }
}

struct FinishOnDrop<'a> {
    call: &'a Call,
}

impl Drop for FinishOnDrop<'_> {
    fn drop(&mut self) {
        self.call.inner.client.dispatcher().finished_sync(self.call);
    }
}
