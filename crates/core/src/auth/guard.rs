//! Single-flight guard
//!
//! At most one instance of an operation runs at a time. A caller arriving
//! while one is outstanding does not start a second one; it awaits the same
//! outcome. The slot is released when the leading caller finishes, on success
//! and on failure alike, and also if the leading caller is dropped.

use std::future::Future;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;

type Slot<T> = Mutex<Option<Shared<BoxFuture<'static, T>>>>;

/// Collapses concurrent invocations of one operation into a single run
pub struct SingleFlight<T: Clone> {
    inflight: Slot<T>,
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    #[must_use]
    pub const fn new() -> Self {
        Self { inflight: parking_lot::const_mutex(None) }
    }

    /// Whether an invocation is currently outstanding.
    pub fn is_running(&self) -> bool {
        self.inflight.lock().is_some()
    }

    /// Run the operation built by `make`, or join the one already running.
    ///
    /// `make` is only called when nothing is in flight. The returned flag is
    /// `true` when this caller joined an existing run.
    pub async fn run<F, Fut>(&self, make: F) -> (T, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let (operation, joined) = {
            let mut slot = self.inflight.lock();
            if let Some(existing) = slot.as_ref() {
                (existing.clone(), true)
            } else {
                let operation = make().boxed().shared();
                *slot = Some(operation.clone());
                (operation, false)
            }
        };

        let _release = (!joined).then(|| Release { slot: &self.inflight });
        (operation.await, joined)
    }
}

impl<T> Default for SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> std::fmt::Debug for SingleFlight<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleFlight").field("running", &self.inflight.lock().is_some()).finish()
    }
}

struct Release<'a, T: Clone> {
    slot: &'a Slot<T>,
}

impl<T: Clone> Drop for Release<'_, T> {
    fn drop(&mut self) {
        self.slot.lock().take();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    fn counted(
        calls: &Arc<AtomicUsize>,
        outcome: Result<u32, String>,
    ) -> impl Future<Output = Result<u32, String>> + Send + 'static {
        let calls = Arc::clone(calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            outcome
        }
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_run() {
        let flight = SingleFlight::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let (first, second) = tokio::join!(
            flight.run(|| counted(&calls, Ok(7))),
            flight.run(|| counted(&calls, Ok(99))),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first, (Ok(7), false));
        assert_eq!(second, (Ok(7), true));
        assert!(!flight.is_running());
    }

    #[tokio::test]
    async fn slot_is_released_after_failure() {
        let flight = SingleFlight::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let (failed, _) = flight.run(|| counted(&calls, Err("boom".to_string()))).await;
        assert_eq!(failed, Err("boom".to_string()));
        assert!(!flight.is_running());

        let (retried, joined) = flight.run(|| counted(&calls, Ok(1))).await;
        assert_eq!(retried, Ok(1));
        assert!(!joined);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn reports_running_while_outstanding() {
        let flight = Arc::new(SingleFlight::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let leader = {
            let flight = Arc::clone(&flight);
            let calls = Arc::clone(&calls);
            tokio::spawn(async move { flight.run(|| counted(&calls, Ok(3))).await })
        };

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(flight.is_running());

        let (value, joined) = leader.await.unwrap();
        assert_eq!(value, Ok(3));
        assert!(!joined);
        assert!(!flight.is_running());
    }
}
