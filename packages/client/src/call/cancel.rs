use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// Cancellation flag shared between a call and the work it started.
///
/// Clones observe the same flag. Once canceled it stays canceled.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    inner: Arc<Shared>,
}

#[derive(Debug, Default)]
struct Shared {
    canceled: AtomicBool,
    notify: Notify,
}

impl CancelSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels and wakes every waiter. Returns false if already canceled.
    pub fn cancel(&self) -> bool {
        let first = !self.inner.canceled.swap(true, Ordering::AcqRel);
        if first {
            self.inner.notify.notify_waiters();
        }
        first
    }

    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.inner.canceled.load(Ordering::Acquire)
    }

    /// Resolves once the signal is canceled.
    pub async fn canceled(&self) {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        loop {
            // Register before checking so a concurrent cancel is not missed.
            notified.as_mut().enable();
            if self.is_canceled() {
                return;
            }
            notified.as_mut().await;
            notified.set(self.inner.notify.notified());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn wakes_waiters() {
        let signal = CancelSignal::new();
        let waiter = tokio::spawn({
            let signal = signal.clone();
            async move { signal.canceled().await }
        });
        tokio::task::yield_now().await;

        assert!(signal.cancel());
        assert!(!signal.cancel());
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn already_canceled_resolves_immediately() {
        let signal = CancelSignal::new();
        signal.cancel();
        assert!(signal.is_canceled());
        signal.canceled().await;
    }
}
