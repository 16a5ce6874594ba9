//! Detached task scheduler with in-flight tracking.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::WorkflowError;

#[derive(Debug, Default)]
struct Inner {
    in_flight: AtomicUsize,
    closed: AtomicBool,
}

/// Runs units of work after the triggering request has returned.
///
/// Tasks have no return channel. A panic stays inside its task. Once closed,
/// the scheduler refuses new work; tasks already running are left alone.
#[derive(Debug, Clone, Default)]
pub struct DeferredTasks {
    inner: Arc<Inner>,
}

impl DeferredTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `task` on the runtime.
    pub fn spawn<F>(&self, name: &'static str, task: F) -> Result<(), WorkflowError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.is_closed() {
            return Err(WorkflowError::SchedulerClosed);
        }

        let guard = InFlightGuard::new(Arc::clone(&self.inner));
        tokio::spawn(async move {
            let _guard = guard;
            tracing::debug!(task = name, "Deferred task started");
            task.await;
            tracing::debug!(task = name, "Deferred task finished");
        });
        Ok(())
    }

    /// Number of tasks spawned and not yet finished.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Stop accepting work. Returns the number of tasks still running, which
    /// are abandoned to finish (or not) on their own.
    pub fn close(&self) -> usize {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.in_flight()
    }

    /// Wait until no task is running, up to `timeout`.
    ///
    /// Returns false if tasks were still running when the timeout expired.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if self.in_flight() == 0 {
                return true;
            }

            if tokio::time::Instant::now() >= deadline {
                return false;
            }

            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

/// Decrements the in-flight counter on drop, including during unwinding.
#[derive(Debug)]
struct InFlightGuard {
    inner: Arc<Inner>,
}

impl InFlightGuard {
    fn new(inner: Arc<Inner>) -> Self {
        inner.in_flight.fetch_add(1, Ordering::SeqCst);
        Self { inner }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_spawned_task_runs_detached() {
        let tasks = DeferredTasks::new();
        let (tx, rx) = oneshot::channel();

        tasks
            .spawn("send", async move {
                let _ = tx.send(42);
            })
            .unwrap();

        assert_eq!(rx.await.unwrap(), 42);
        assert!(tasks.wait_idle(Duration::from_secs(1)).await);
        assert_eq!(tasks.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_in_flight_count_tracks_running_tasks() {
        let tasks = DeferredTasks::new();
        let (release_tx, release_rx) = oneshot::channel::<()>();

        tasks
            .spawn("blocked", async move {
                let _ = release_rx.await;
            })
            .unwrap();
        assert_eq!(tasks.in_flight(), 1);
        assert!(!tasks.wait_idle(Duration::from_millis(30)).await);

        release_tx.send(()).unwrap();
        assert!(tasks.wait_idle(Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn test_panicking_task_is_contained() {
        let tasks = DeferredTasks::new();
        tasks
            .spawn("panics", async {
                panic!("boom");
            })
            .unwrap();

        assert!(tasks.wait_idle(Duration::from_secs(1)).await);

        let (tx, rx) = oneshot::channel();
        tasks
            .spawn("after", async move {
                let _ = tx.send(());
            })
            .unwrap();
        assert!(rx.await.is_ok());
    }

    #[tokio::test]
    async fn test_closed_scheduler_refuses_work_and_abandons_running() {
        let tasks = DeferredTasks::new();
        tasks
            .spawn("slow", tokio::time::sleep(Duration::from_secs(60)))
            .unwrap();

        assert_eq!(tasks.close(), 1);
        assert!(tasks.is_closed());
        let result = tasks.spawn("late", async {});
        assert!(matches!(result, Err(WorkflowError::SchedulerClosed)));
    }
}
