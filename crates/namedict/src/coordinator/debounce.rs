use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Runs the most recently scheduled action once `delay` passes without a
/// newer one. An action that has started is not interrupted, and actions
/// run one at a time in the order they were scheduled.
pub(crate) struct Debouncer {
    runtime: Handle,
    tracker: Option<TaskTracker>,
    pending: Mutex<Option<CancellationToken>>,
    running: Arc<tokio::sync::Mutex<()>>,
}

impl Debouncer {
    pub(crate) fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            tracker: None,
            pending: Mutex::new(None),
            running: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Spawns actions on `tracker` so they can be awaited on shutdown.
    pub(crate) fn tracked_by(mut self, tracker: TaskTracker) -> Self {
        self.tracker = Some(tracker);
        self
    }

    pub(crate) fn schedule<F>(&self, delay: Duration, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        if let Some(previous) = self.pending.lock().replace(token.clone()) {
            previous.cancel();
        }
        let running = self.running.clone();
        let task = async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    let _running = running.lock().await;
                    // Superseded while an older action was still running.
                    if !token.is_cancelled() {
                        action.await;
                    }
                }
            }
        };
        let _ = match &self.tracker {
            Some(tracker) => tracker.spawn_on(task, &self.runtime),
            None => self.runtime.spawn(task),
        };
    }

    /// Drops the pending action, if it has not started yet.
    pub(crate) fn cancel(&self) {
        if let Some(pending) = self.pending.lock().take() {
            pending.cancel();
        }
    }
}
