//! Queueing and concurrency limits for calls

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::oneshot;

use super::call::Call;
use crate::error::{self, Result};
use crate::http::HttpResponse;

type IdleCallback = Arc<dyn Fn() + Send + Sync>;

/// Decides when enqueued calls run.
///
/// At most `max_requests` enqueued calls run at once, and at most
/// `max_requests_per_host` against any one host. Calls run inline with
/// [`Call::execute`] are tracked but never held back. Clones share state.
#[derive(Clone)]
pub struct Dispatcher {
    state: Arc<Mutex<DispatcherState>>,
}

struct DispatcherState {
    max_requests: usize,
    max_requests_per_host: usize,
    ready: VecDeque<AsyncCall>,
    running_async: Vec<Call>,
    running_sync: Vec<Call>,
    idle_callback: Option<IdleCallback>,
}

/// An enqueued call and where its outcome goes.
pub(crate) struct AsyncCall {
    call: Call,
    responder: oneshot::Sender<Result<HttpResponse>>,
}

impl AsyncCall {
    pub(crate) fn new(call: Call, responder: oneshot::Sender<Result<HttpResponse>>) -> Self {
        Self { call, responder }
    }

    async fn run(self, dispatcher: Dispatcher) {
        let outcome = self.call.run().await;
        // The caller may have dropped the receiver.
        let _ = self.responder.send(outcome);
        dispatcher.finished_async(&self.call);
    }
}

impl Dispatcher {
    #[must_use]
    pub fn new(max_requests: usize, max_requests_per_host: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(DispatcherState {
                max_requests: max_requests.max(1),
                max_requests_per_host: max_requests_per_host.max(1),
                ready: VecDeque::new(),
                running_async: Vec::new(),
                running_sync: Vec::new(),
                idle_callback: None,
            })),
        }
    }

    #[must_use]
    pub fn max_requests(&self) -> usize {
        self.lock().max_requests
    }

    /// Changes the overall limit. Raising it promotes waiting calls.
    ///
    /// # Errors
    ///
    /// Returns a builder error if `max` is zero.
    pub fn set_max_requests(&self, max: usize) -> Result<()> {
        if max < 1 {
            return Err(error::builder(format!("max < 1: {max}")));
        }
        self.lock().max_requests = max;
        self.promote_and_execute();
        Ok(())
    }

    #[must_use]
    pub fn max_requests_per_host(&self) -> usize {
        self.lock().max_requests_per_host
    }

    /// Changes the per-host limit. Raising it promotes waiting calls.
    ///
    /// # Errors
    ///
    /// Returns a builder error if `max` is zero.
    pub fn set_max_requests_per_host(&self, max: usize) -> Result<()> {
        if max < 1 {
            return Err(error::builder(format!("max < 1: {max}")));
        }
        self.lock().max_requests_per_host = max;
        self.promote_and_execute();
        Ok(())
    }

    /// Runs `callback` each time the dispatcher becomes idle.
    pub fn set_idle_callback(&self, callback: impl Fn() + Send + Sync + 'static) {
        self.lock().idle_callback = Some(Arc::new(callback));
    }

    pub(crate) fn enqueue(&self, call: AsyncCall) {
        self.lock().ready.push_back(call);
        self.promote_and_execute();
    }

    /// Starts every waiting call the limits allow. Returns whether any call
    /// is running afterwards.
    pub fn promote_and_execute(&self) -> bool {
        let mut executable = Vec::new();
        let running = {
            let mut state = self.lock();
            let mut index = 0;
            while index < state.ready.len() {
                if state.running_async.len() >= state.max_requests {
                    break;
                }
                let host = state.ready[index].call.host();
                if state.running_for_host(host) >= state.max_requests_per_host {
                    index += 1;
                    continue;
                }
                if let Some(call) = state.ready.remove(index) {
                    state.running_async.push(call.call.clone());
                    executable.push(call);
                }
            }
            state.running_async.len() + state.running_sync.len() > 0
        };

        for call in executable {
            tracing::trace!(target: "hopwire::dispatcher", id = call.call.id(), "promoting call");
            match Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(call.run(self.clone()));
                }
                Err(_) => {
                    tracing::warn!(target: "hopwire::dispatcher", id = call.call.id(), "no tokio runtime, failing enqueued call");
                    let _ = call
                        .responder
                        .send(Err(error::builder("enqueue requires a tokio runtime")));
                    self.finished_async(&call.call);
                }
            }
        }
        running
    }

    /// Cancels queued and running calls alike.
    pub fn cancel_all(&self) {
        let calls: Vec<Call> = {
            let state = self.lock();
            state
                .ready
                .iter()
                .map(|async_call| async_call.call.clone())
                .chain(state.running_async.iter().cloned())
                .chain(state.running_sync.iter().cloned())
                .collect()
        };
        for call in calls {
            call.cancel();
        }
    }

    #[must_use]
    pub fn queued_calls(&self) -> Vec<Call> {
        self.lock()
            .ready
            .iter()
            .map(|async_call| async_call.call.clone())
            .collect()
    }

    #[must_use]
    pub fn running_calls(&self) -> Vec<Call> {
        let state = self.lock();
        state
            .running_async
            .iter()
            .chain(state.running_sync.iter())
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn queued_calls_count(&self) -> usize {
        self.lock().ready.len()
    }

    #[must_use]
    pub fn running_calls_count(&self) -> usize {
        let state = self.lock();
        state.running_async.len() + state.running_sync.len()
    }

    pub(crate) fn executed(&self, call: &Call) {
        self.lock().running_sync.push(call.clone());
    }

    pub(crate) fn finished_sync(&self, call: &Call) {
        self.finished(call, |state| &mut state.running_sync);
    }

    fn finished_async(&self, call: &Call) {
        self.finished(call, |state| &mut state.running_async);
    }

    fn finished(&self, call: &Call, running: impl FnOnce(&mut DispatcherState) -> &mut Vec<Call>) {
        let idle_callback = {
            let mut state = self.lock();
            running(&mut *state).retain(|running| !running.same_call(call));
            state.idle_callback.clone()
        };

        let is_running = self.promote_and_execute();
        if !is_running && let Some(callback) = idle_callback {
            callback();
        }
    }

    fn lock(&self) -> MutexGuard<'_, DispatcherState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DispatcherState {
    fn running_for_host(&self, host: &str) -> usize {
        self.running_async
            .iter()
            .filter(|call| call.host() == host)
            .count()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("Dispatcher")
            .field("max_requests", &state.max_requests)
            .field("max_requests_per_host", &state.max_requests_per_host)
            .field("queued", &state.ready.len())
            .field("running", &(state.running_async.len() + state.running_sync.len()))
            .finish()
    }
}
