//! Trailing-edge debounce for search boxes.

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Delay applied to search input.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Runs only the last action submitted within the delay window.
///
/// Every [`Debouncer::call`] cancels the action still waiting before it.
/// [`Debouncer::dispose`] (or dropping the debouncer) cancels everything
/// pending and turns later calls into no-ops.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    lifetime: CancellationToken,
    pending: Mutex<Option<CancellationToken>>,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            lifetime: CancellationToken::new(),
            pending: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `action` after the delay. The handle resolves to `true` if
    /// the action ran, `false` if it was superseded or cancelled.
    pub fn call<F, Fut>(&self, action: F) -> JoinHandle<bool>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = self.lifetime.child_token();
        if let Some(previous) = self.pending.lock().replace(token.clone()) {
            previous.cancel();
        }

        let delay = self.delay;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => false,
                _ = tokio::time::sleep(delay) => {
                    action().await;
                    true
                }
            }
        })
    }

    /// Drop the pending action, if any.
    pub fn cancel(&self) {
        if let Some(pending) = self.pending.lock().take() {
            pending.cancel();
        }
    }

    pub fn dispose(&self) {
        self.lifetime.cancel();
        self.pending.lock().take();
    }

    pub fn is_disposed(&self) -> bool {
        self.lifetime.is_cancelled()
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.lifetime.cancel();
    }
}
