use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

/// A one-shot delayed action. Dropping the timer cancels it.
///
/// Cancellation only stops the sleep. An action that has already woken up
/// still runs, so the callback must re-check that its timer `id` is the one
/// still armed before doing anything destructive.
pub struct IdleTimer {
    id: u64,
    cancel: Arc<Notify>,
}

impl IdleTimer {
    pub fn spawn<F, Fut>(id: u64, timeout: Duration, on_expire: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = Arc::new(Notify::new());
        let cancel_clone = cancel.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(timeout) => on_expire().await,
                _ = cancel_clone.notified() => {}
            }
        });

        Self { id, cancel }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for IdleTimer {
    fn drop(&mut self) {
        // notify_one stores a permit, so this also cancels a task that has
        // not started waiting yet.
        self.cancel.notify_one();
    }
}
