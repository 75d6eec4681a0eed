//! Deferred callbacks with cancellation.
//!
//! The tracker never sleeps or awaits. It hands one-shot closures to a
//! [`Scheduler`] and keeps the returned [`TimerId`] when it may need to cancel.
//! A zero delay means "after the current task", never "right now".
//!
//! [`TokioScheduler`] keeps that promise only on a current-thread runtime whose
//! thread also dispatches host events, so it refuses any other flavor.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use parking_lot::Mutex;
use tokio::{
    runtime::{Handle, RuntimeFlavor},
    time,
};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::error::{Error, Result};

/// Identifier of a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

/// One-shot deferred work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs one-shot tasks after a delay.
pub trait Scheduler: Send + Sync + 'static {
    /// Run `task` once after `delay`. Must not run `task` before returning.
    fn schedule(&self, delay: Duration, task: Task) -> TimerId;

    /// Cancel a pending task. Ids that already ran or were cancelled are ignored.
    fn cancel(&self, id: TimerId);
}

/// [`Scheduler`] backed by tokio timers.
///
/// Each task is spawned on the runtime and races its delay against a
/// cancellation token; cancellation wins when both are ready.
///
/// The runtime must be current-thread, and the host must dispatch signals and
/// focus events on that runtime's thread. A task, even with zero delay, then
/// cannot run until the dispatching code yields.
#[derive(Clone, Debug)]
pub struct TokioScheduler {
    /// Runtime that owns the timer tasks.
    handle: Handle,
    /// Cancellation tokens of tasks that have not fired yet.
    pending: Arc<Mutex<HashMap<TimerId, CancellationToken>>>,
    /// Source of timer ids.
    next_id: Arc<AtomicU64>,
}

impl TokioScheduler {
    /// Create a scheduler on the current runtime.
    ///
    /// Fails outside a tokio runtime or on a multi-thread one.
    pub fn new() -> Result<Self> {
        let handle = Handle::try_current().map_err(|e| Error::Runtime {
            message: e.to_string(),
        })?;
        Self::with_handle(handle)
    }

    /// Create a scheduler that spawns onto `handle`.
    ///
    /// Fails unless `handle` belongs to a current-thread runtime.
    pub fn with_handle(handle: Handle) -> Result<Self> {
        let flavor = handle.runtime_flavor();
        if flavor != RuntimeFlavor::CurrentThread {
            return Err(Error::Runtime {
                message: format!("timers need a current-thread runtime, found {flavor:?}"),
            });
        }
        Ok(Self {
            handle,
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    /// Check whether a task is still waiting to fire.
    pub fn is_pending(&self, id: TimerId) -> bool {
        self.pending.lock().contains_key(&id)
    }

    /// Number of tasks still waiting to fire.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> TimerId {
        let id = TimerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let token = CancellationToken::new();
        let cancel = token.clone();
        let pending = self.pending.clone();
        let deadline = time::Instant::now() + delay;
        self.pending.lock().insert(id, token);

        self.handle.spawn(async move {
            trace!(timer = id.0, delay_ms = delay.as_millis(), "timer_start");
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    trace!(timer = id.0, "timer_cancelled");
                }
                _ = time::sleep_until(deadline) => {
                    if pending.lock().remove(&id).is_some() {
                        task();
                    }
                }
            }
        });
        id
    }

    fn cancel(&self, id: TimerId) {
        if let Some(token) = self.pending.lock().remove(&id) {
            token.cancel();
            trace!(timer = id.0, "timer_cancel");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    /// Let spawned timer tasks observe the advanced clock.
    async fn settle() {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fires_after_delay() {
        let sched = TokioScheduler::new().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let id = sched.schedule(
            Duration::from_millis(650),
            Box::new(move || {
                h.fetch_add(1, Ordering::SeqCst);
            }),
        );
        settle().await;
        assert!(sched.is_pending(id));

        time::advance(Duration::from_millis(649)).await;
        settle().await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        time::advance(Duration::from_millis(1)).await;
        settle().await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(!sched.is_pending(id));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_task_never_runs() {
        let sched = TokioScheduler::new().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let id = sched.schedule(
            Duration::from_millis(10),
            Box::new(move || {
                h.fetch_add(1, Ordering::SeqCst);
            }),
        );
        sched.cancel(id);
        sched.cancel(id);
        time::advance(Duration::from_millis(50)).await;
        settle().await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(sched.pending_count(), 0);
    }

    #[test]
    fn requires_a_runtime() {
        assert!(matches!(TokioScheduler::new(), Err(Error::Runtime { .. })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn rejects_multi_thread_runtime() {
        let err = TokioScheduler::new().unwrap_err();
        assert!(err.pretty().contains("current-thread"));
        assert!(matches!(
            TokioScheduler::with_handle(Handle::current()),
            Err(Error::Runtime { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_delay_runs_after_current_task() {
        let sched = TokioScheduler::new().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        sched.schedule(
            Duration::ZERO,
            Box::new(move || {
                h.fetch_add(1, Ordering::SeqCst);
            }),
        );
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        settle().await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
